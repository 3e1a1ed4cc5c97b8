//! Typed factories.
//!
//! A typed factory is a user-declared trait whose methods each build an
//! object. Its implementation (usually generated by
//! [`#[typed_factory]`](macro@crate::typed_factory)) forwards every call to an
//! [`Interceptor`]; the [`FactoryBehavior`] attached here answers it by
//! resolving one concrete type with the call arguments as overrides.
//!
//! ```
//! use autofactory::prelude::*;
//! use std::sync::Arc;
//!
//! trait Token: Send + Sync {
//!     fn value(&self) -> &str;
//! }
//!
//! struct Bearer(String);
//!
//! impl Token for Bearer {
//!     fn value(&self) -> &str { &self.0 }
//! }
//!
//! impl Injectable for Bearer {
//!     fn construct(r: &dyn Resolver) -> Result<Self> {
//!         Ok(Bearer(resolve(r)?))
//!     }
//! }
//!
//! impl_service!(Bearer => dyn Token);
//!
//! #[typed_factory]
//! trait TokenFactory: Send + Sync {
//!     fn issue(&self, raw: String) -> Result<Arc<dyn Token>>;
//! }
//!
//! let container = Container::new();
//! container.register_conversion::<Bearer, Arc<dyn Token>>();
//! container
//!     .register_auto_factory::<dyn TokenFactory, TokenFactoryImpl>()
//!     .using_concrete_type::<Bearer>()
//!     .unwrap();
//!
//! let factory: Arc<dyn TokenFactory> = container.resolve().unwrap();
//! assert_eq!(factory.issue("abc".into()).unwrap().value(), "abc");
//! ```

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use autofactory_container::error::AlreadyRegisteredError;
use autofactory_container::{
    AutoFactoryError, Container, DependencyKey, Injectable, Lifetime, Result,
};
use tracing::{debug, instrument};

use crate::behavior::{FactoryBehavior, InterceptionBinding};
use crate::interception::{InterceptedFactory, Interception, Interceptor};

/// Fluent handle returned by
/// [`register_auto_factory`](crate::extensions::AutoFactoryExt::register_auto_factory).
///
/// `F` is the factory trait (`dyn MyFactory`), `I` the implementation that
/// the container hands out as `Arc<F>`.
#[must_use = "a typed factory is only registered once using_concrete_type is called"]
pub struct TypedFactoryRegistration<F: ?Sized, I> {
    container: Container,
    factory_lifetime: Lifetime,
    _marker: PhantomData<(fn() -> Arc<F>, fn() -> I)>,
}

impl<F, I> TypedFactoryRegistration<F, I>
where
    F: ?Sized + Send + Sync + 'static,
    I: InterceptedFactory + Into<Arc<F>>,
{
    pub(crate) fn new(container: Container, factory_lifetime: Lifetime) -> Self {
        Self {
            container,
            factory_lifetime,
            _marker: PhantomData,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn factory_lifetime(&self) -> Lifetime {
        self.factory_lifetime
    }

    /// Binds every interface-returning method of the factory to `C`.
    ///
    /// Enables the [`Interception`] extension, registers `C` as itself
    /// (transient) unless it is already registered, registers `Arc<F>` and
    /// attaches a [`FactoryBehavior`] to it. Re-registering the same factory
    /// (with `allow_override`) replaces the earlier behavior.
    ///
    /// Whether `C` satisfies a method's return type is checked on each call,
    /// against the conversions known to the container at that time.
    #[instrument(
        skip(self),
        fields(
            factory = type_name::<F>(),
            concrete = type_name::<C>(),
            lifetime = %self.factory_lifetime
        )
    )]
    pub fn using_concrete_type<C: Injectable>(self) -> Result<Container> {
        let factory_key = DependencyKey::of::<Arc<F>>();
        let concrete_key = DependencyKey::of::<C>();

        if !self.container.settings().allow_override && self.container.contains(&factory_key) {
            return Err(AutoFactoryError::AlreadyRegistered(AlreadyRegisteredError {
                key: factory_key,
            }));
        }

        let interception = self.container.extension::<Interception>();

        if !self.container.contains(&concrete_key) {
            self.container.register_transient::<C>()?;
        }

        let chains = interception.clone();
        self.container
            .register_factory::<Arc<F>>(self.factory_lifetime, move |_| {
                let interceptor = Interceptor::new(factory_key, chains.clone());
                Ok(I::from_interceptor(interceptor).into())
            })?;

        let binding = InterceptionBinding::new(factory_key, concrete_key, self.container.downgrade());
        interception.set_factory_behavior(factory_key, Arc::new(FactoryBehavior::new(binding)));

        debug!(factory = %factory_key, concrete = %concrete_key, "Registered typed factory");
        Ok(self.container)
    }
}

impl<F: ?Sized, I> fmt::Debug for TypedFactoryRegistration<F, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedFactoryRegistration")
            .field("factory", &type_name::<F>())
            .field("implementation", &type_name::<I>())
            .field("factory_lifetime", &self.factory_lifetime)
            .finish()
    }
}
