//! The behavior that turns a typed-factory call into a container resolve.

use std::fmt;

use autofactory_container::{AutoFactoryError, Container, DependencyKey, Result, WeakContainer};
use tracing::{instrument, trace};

use crate::interception::{
    InterceptionBehavior, MethodInvocation, MethodReturn, Next, ReturnType,
};

/// Which factory service a [`FactoryBehavior`] serves, which concrete type
/// it builds, and the container it builds it from.
#[derive(Clone)]
pub struct InterceptionBinding {
    factory: DependencyKey,
    concrete: DependencyKey,
    container: WeakContainer,
}

impl InterceptionBinding {
    pub fn new(factory: DependencyKey, concrete: DependencyKey, container: WeakContainer) -> Self {
        Self {
            factory,
            concrete,
            container,
        }
    }

    pub fn factory_interface(&self) -> DependencyKey {
        self.factory
    }

    pub fn concrete_type(&self) -> DependencyKey {
        self.concrete
    }

    /// # Errors
    /// [`AutoFactoryError::ContainerDropped`] once the container is gone.
    pub fn container(&self) -> Result<Container> {
        self.container.upgrade()
    }
}

impl fmt::Debug for InterceptionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionBinding")
            .field("factory", &self.factory)
            .field("concrete", &self.concrete)
            .finish_non_exhaustive()
    }
}

/// Answers interface-returning factory calls by resolving the bound
/// concrete type, with each call argument as a parameter override.
///
/// Calls whose return type is not an interface are forwarded untouched.
#[derive(Debug, Clone)]
pub struct FactoryBehavior {
    binding: InterceptionBinding,
}

impl FactoryBehavior {
    pub fn new(binding: InterceptionBinding) -> Self {
        Self { binding }
    }

    pub fn binding(&self) -> &InterceptionBinding {
        &self.binding
    }
}

impl InterceptionBehavior for FactoryBehavior {
    #[instrument(
        skip_all,
        fields(method = input.method(), concrete = %self.binding.concrete_type())
    )]
    fn invoke(&self, input: MethodInvocation, next: Next<'_>) -> Result<MethodReturn> {
        let expected = match input.return_type() {
            ReturnType::Interface(key) => key,
            ReturnType::Value(_) => {
                trace!("Return type is not an interface, passing on");
                return next.invoke(input);
            }
        };

        let container = self.binding.container()?;
        let concrete = self.binding.concrete_type();
        if !container.has_conversion(&concrete, &expected) {
            return Err(AutoFactoryError::type_mismatch(concrete, expected));
        }

        let instance = if input.arguments().is_empty() {
            container.resolve_key(&concrete, None)?
        } else {
            let overrides = input.to_overrides();
            container.resolve_key(&concrete, Some(&overrides))?
        };
        let value = container.convert(instance, concrete, expected)?;

        Ok(MethodReturn::new(value, input.into_arguments()))
    }

    fn required_interfaces(&self) -> Vec<DependencyKey> {
        vec![self.binding.factory_interface()]
    }
}
