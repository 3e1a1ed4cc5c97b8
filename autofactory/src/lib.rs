//! # autofactory: auto factories and typed factories for a DI container
//!
//! Two ways of asking a [`Container`] for objects whose constructors take
//! values only known at call time:
//!
//! - **Auto factories**: `register_auto_factory_for::<S, T>().with_param::<P>()`
//!   registers an `Arc<dyn Factory1<P, S>>` whose `create(p)` resolves `S`
//!   with the `P` constructor parameter overridden by `p`. Everything else
//!   the constructor needs still comes from the container.
//! - **Typed factories**: declare a factory trait, let
//!   [`#[typed_factory]`](macro@typed_factory) generate its implementation, and bind
//!   it to a concrete type with
//!   `register_auto_factory::<dyn MyFactory, MyFactoryImpl>().using_concrete_type::<C>()`.
//!   Each method call resolves `C`, passing the call arguments as overrides.
//!
//! ```
//! use autofactory::prelude::*;
//! use std::sync::Arc;
//!
//! trait Report: Send + Sync {
//!     fn title(&self) -> String;
//! }
//!
//! struct Monthly {
//!     title: String,
//!     month: u8,
//! }
//!
//! impl Report for Monthly {
//!     fn title(&self) -> String { format!("{} ({})", self.title, self.month) }
//! }
//!
//! impl Injectable for Monthly {
//!     fn construct(r: &dyn Resolver) -> Result<Self> {
//!         Ok(Monthly { title: resolve(r)?, month: resolve(r)? })
//!     }
//! }
//!
//! impl_service!(Monthly => dyn Report);
//!
//! let container = Container::new();
//! container.register_instance(String::from("Sales")).unwrap();
//! container
//!     .register_auto_factory_for::<Arc<dyn Report>, Monthly>()
//!     .unwrap()
//!     .with_param::<u8>()
//!     .unwrap();
//!
//! let reports: Arc<dyn Factory1<u8, Arc<dyn Report>>> = container.resolve().unwrap();
//! assert_eq!(reports.create(3).unwrap().title(), "Sales (3)");
//! ```

extern crate self as autofactory;

pub mod auto_factory;
pub mod behavior;
pub mod descriptor;
pub mod extensions;
pub mod interception;
pub mod typed_factory;

pub use autofactory_container::{
    AutoFactoryError, Container, ContainerBuilder, ContainerSettings, DependencyKey,
    DependencyOverride, ErrorKind, FactoryFn, Injectable, Lifetime, OverrideSet,
    RegistrationInfo, Resolver, Result, WeakContainer, container, downcast, error, impl_service,
    key, lifetime, overrides, registry, resolve, resolver, settings,
};
pub use autofactory_macros::typed_factory;
pub use autofactory_support::rendering;

pub use auto_factory::{
    AutoFactoryRegistration, DelegateFactory, Factory, Factory1, Factory2, FactoryCallback,
    FactoryN,
};
pub use behavior::{FactoryBehavior, InterceptionBinding};
pub use descriptor::{AutoFactories, FactoryArity, FactoryDescriptor, ParameterList};
pub use extensions::AutoFactoryExt;
pub use interception::{
    Argument, InterceptedFactory, Interception, InterceptionBehavior, InterceptionPipeline,
    Interceptor, MethodInvocation, MethodReturn, Next, ReturnType,
};
pub use typed_factory::TypedFactoryRegistration;

pub mod prelude {
    pub use autofactory_container::prelude::*;

    pub use crate::auto_factory::{Factory, Factory1, Factory2, FactoryN};
    pub use crate::descriptor::{FactoryArity, FactoryDescriptor};
    pub use crate::extensions::AutoFactoryExt;
    pub use crate::interception::{InterceptedFactory, Interceptor};
    pub use autofactory_macros::typed_factory;
}
