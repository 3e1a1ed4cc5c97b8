//! Auto factories.
//!
//! An auto factory is a small object with a `create` method that asks the
//! container to resolve one service, passing the `create` arguments down as
//! constructor-parameter overrides.
//!
//! # How a registration is laid out
//! ```text
//! register_auto_factory_for::<S, T>()        S → T              (Transient)
//!     .with_param::<P>()                     FactoryCallback<(P,), S>   (instance)
//!                                            Arc<dyn Factory1<P, S>>    → DelegateFactory<(P,), S>
//! ```
//! The callback holds only a [`WeakContainer`](autofactory_container::WeakContainer),
//! so the container never keeps itself alive through its own factories.
//!
//! # Example
//! ```
//! use autofactory::prelude::*;
//! use std::sync::Arc;
//!
//! trait Greeting: Send + Sync {
//!     fn text(&self) -> &str;
//! }
//!
//! struct Hello(String);
//!
//! impl Greeting for Hello {
//!     fn text(&self) -> &str { &self.0 }
//! }
//!
//! impl Injectable for Hello {
//!     fn construct(r: &dyn Resolver) -> Result<Self> {
//!         Ok(Hello(resolve(r)?))
//!     }
//! }
//!
//! impl_service!(Hello => dyn Greeting);
//!
//! let container = Container::new();
//! container
//!     .register_auto_factory_for::<Arc<dyn Greeting>, Hello>()
//!     .unwrap()
//!     .with_param::<String>()
//!     .unwrap();
//!
//! let factory: Arc<dyn Factory1<String, Arc<dyn Greeting>>> = container.resolve().unwrap();
//! assert_eq!(factory.create("hi".into()).unwrap().text(), "hi");
//! ```

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use autofactory_container::error::AlreadyRegisteredError;
use autofactory_container::{
    AutoFactoryError, Container, DependencyKey, Injectable, Lifetime, Resolver, Result,
    WeakContainer, resolve,
};
use tracing::{debug, instrument, trace};

use crate::descriptor::{AutoFactories, FactoryDescriptor, ParameterList};

/// Factory taking no arguments.
pub trait Factory<T>: Send + Sync {
    fn create(&self) -> Result<T>;
}

/// Factory taking one argument.
pub trait Factory1<P, T>: Send + Sync {
    fn create(&self, parameter: P) -> Result<T>;
}

/// Factory taking two arguments, overridden in declaration order.
pub trait Factory2<P1, P2, T>: Send + Sync {
    fn create(&self, first: P1, second: P2) -> Result<T>;
}

/// Factory taking a tuple of arguments.
pub trait FactoryN<Args: ParameterList, T>: Send + Sync {
    fn create(&self, arguments: Args) -> Result<T>;
}

/// The resolution closure behind an auto factory.
///
/// Registered in the container as an instance, keyed by its full type, so
/// each `(Args, T)` signature has exactly one callback.
pub struct FactoryCallback<Args, T> {
    call: Arc<dyn Fn(Args) -> Result<T> + Send + Sync>,
}

impl<Args, T> FactoryCallback<Args, T> {
    pub fn new(call: impl Fn(Args) -> Result<T> + Send + Sync + 'static) -> Self {
        Self { call: Arc::new(call) }
    }

    pub fn call(&self, arguments: Args) -> Result<T> {
        (self.call)(arguments)
    }
}

impl<Args, T> Clone for FactoryCallback<Args, T> {
    fn clone(&self) -> Self {
        Self {
            call: Arc::clone(&self.call),
        }
    }
}

impl<Args, T> fmt::Debug for FactoryCallback<Args, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryCallback")
            .field("arguments", &type_name::<Args>())
            .field("produces", &type_name::<T>())
            .finish()
    }
}

/// Resolves `S` through `container`, overriding with `arguments`.
///
/// An empty argument list resolves without any override set.
fn resolve_target<Args, S>(container: &WeakContainer, arguments: Args) -> Result<S>
where
    Args: ParameterList,
    S: Send + Sync + 'static,
{
    let container = container.upgrade()?;
    trace!(target_type = type_name::<S>(), arity = Args::ARITY, "Auto factory create");
    if Args::ARITY == 0 {
        container.resolve::<S>()
    } else {
        container.resolve_with::<S>(arguments.into_overrides())
    }
}

/// The object handed out for every auto-factory service.
///
/// Constructed by the container from the registered [`FactoryCallback`].
pub struct DelegateFactory<Args, T> {
    callback: FactoryCallback<Args, T>,
}

impl<Args, T> DelegateFactory<Args, T> {
    pub fn new(callback: FactoryCallback<Args, T>) -> Self {
        Self { callback }
    }
}

impl<Args, T> Injectable for DelegateFactory<Args, T>
where
    Args: ParameterList,
    T: Send + Sync + 'static,
{
    fn construct(resolver: &dyn Resolver) -> Result<Self> {
        Ok(Self::new(resolve(resolver)?))
    }
}

impl<T: Send + Sync + 'static> Factory<T> for DelegateFactory<(), T> {
    fn create(&self) -> Result<T> {
        self.callback.call(())
    }
}

impl<P, T> Factory1<P, T> for DelegateFactory<(P,), T>
where
    P: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn create(&self, parameter: P) -> Result<T> {
        self.callback.call((parameter,))
    }
}

impl<P1, P2, T> Factory2<P1, P2, T> for DelegateFactory<(P1, P2), T>
where
    P1: Clone + Send + Sync + 'static,
    P2: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn create(&self, first: P1, second: P2) -> Result<T> {
        self.callback.call((first, second))
    }
}

impl<Args, T> FactoryN<Args, T> for DelegateFactory<Args, T>
where
    Args: ParameterList,
    T: Send + Sync + 'static,
{
    fn create(&self, arguments: Args) -> Result<T> {
        self.callback.call(arguments)
    }
}

impl<T: Send + Sync + 'static> From<DelegateFactory<(), T>> for Arc<dyn Factory<T>> {
    fn from(factory: DelegateFactory<(), T>) -> Self {
        Arc::new(factory)
    }
}

impl<P, T> From<DelegateFactory<(P,), T>> for Arc<dyn Factory1<P, T>>
where
    P: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn from(factory: DelegateFactory<(P,), T>) -> Self {
        Arc::new(factory)
    }
}

impl<P1, P2, T> From<DelegateFactory<(P1, P2), T>> for Arc<dyn Factory2<P1, P2, T>>
where
    P1: Clone + Send + Sync + 'static,
    P2: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn from(factory: DelegateFactory<(P1, P2), T>) -> Self {
        Arc::new(factory)
    }
}

impl<Args, T> From<DelegateFactory<Args, T>> for Arc<dyn FactoryN<Args, T>>
where
    Args: ParameterList,
    T: Send + Sync + 'static,
{
    fn from(factory: DelegateFactory<Args, T>) -> Self {
        Arc::new(factory)
    }
}

/// Fluent handle returned by
/// [`register_auto_factory_for`](crate::extensions::AutoFactoryExt::register_auto_factory_for).
///
/// The source-to-target mapping is already registered; one of the terminal
/// methods then registers the factory service itself.
#[must_use = "an auto factory is only registered once a terminal method is called"]
pub struct AutoFactoryRegistration<S> {
    container: Container,
    factory_lifetime: Lifetime,
    _service: PhantomData<fn() -> S>,
}

impl<S> AutoFactoryRegistration<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn new(container: Container, factory_lifetime: Lifetime) -> Self {
        Self {
            container,
            factory_lifetime,
            _service: PhantomData,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Lifetime the factory object will be registered under.
    pub fn factory_lifetime(&self) -> Lifetime {
        self.factory_lifetime
    }

    /// Registers `Arc<dyn Factory<S>>`; `create()` resolves `S` with no
    /// overrides at all.
    pub fn without_parameters(self) -> Result<Container> {
        self.register::<(), Arc<dyn Factory<S>>>()
    }

    /// Registers `Arc<dyn Factory1<P, S>>`; `create(p)` overrides the `P`
    /// constructor parameter with `p`.
    pub fn with_param<P>(self) -> Result<Container>
    where
        P: Clone + Send + Sync + 'static,
    {
        self.register::<(P,), Arc<dyn Factory1<P, S>>>()
    }

    /// Registers `Arc<dyn Factory2<P1, P2, S>>`.
    pub fn with_params<P1, P2>(self) -> Result<Container>
    where
        P1: Clone + Send + Sync + 'static,
        P2: Clone + Send + Sync + 'static,
    {
        self.register::<(P1, P2), Arc<dyn Factory2<P1, P2, S>>>()
    }

    /// Registers `Arc<dyn FactoryN<Args, S>>` for any tuple of up to eight
    /// parameter types.
    pub fn with_parameter_list<Args: ParameterList>(self) -> Result<Container> {
        self.register::<Args, Arc<dyn FactoryN<Args, S>>>()
    }

    #[instrument(
        skip(self),
        fields(service = type_name::<S>(), lifetime = %self.factory_lifetime)
    )]
    fn register<Args, F>(self) -> Result<Container>
    where
        Args: ParameterList,
        F: Clone + Send + Sync + 'static,
        DelegateFactory<Args, S>: Into<F>,
    {
        let factory_key = DependencyKey::of::<F>();
        if !self.container.settings().allow_override && self.container.contains(&factory_key) {
            return Err(AutoFactoryError::AlreadyRegistered(AlreadyRegisteredError {
                key: factory_key,
            }));
        }

        let weak = self.container.downgrade();
        let callback =
            FactoryCallback::<Args, S>::new(move |arguments| resolve_target::<Args, S>(&weak, arguments));
        self.container.register_instance(callback)?;
        self.container
            .register_type::<F, DelegateFactory<Args, S>>(self.factory_lifetime)?;

        let descriptor = FactoryDescriptor::of::<S, Args>();
        debug!(factory = %factory_key, signature = %descriptor, "Registered auto factory");
        self.container.extension::<AutoFactories>().record(descriptor);

        Ok(self.container)
    }
}

impl<S> fmt::Debug for AutoFactoryRegistration<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoFactoryRegistration")
            .field("service", &type_name::<S>())
            .field("factory_lifetime", &self.factory_lifetime)
            .finish()
    }
}
