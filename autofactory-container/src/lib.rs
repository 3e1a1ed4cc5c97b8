//! Container adapter for autofactory.
//!
//! Registration, lifetimes, parameter overrides and resolution. The factory
//! layer in the `autofactory` crate is built entirely on the public surface
//! of this crate.

pub mod container;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod overrides;
pub mod registry;
pub mod resolver;
pub mod settings;

pub use container::{Container, ContainerBuilder, WeakContainer, prelude};
pub use error::{AutoFactoryError, ErrorKind, Result};
pub use key::DependencyKey;
pub use lifetime::Lifetime;
pub use overrides::{DependencyOverride, OverrideSet};
pub use registry::{FactoryFn, RegistrationInfo};
pub use resolver::{Injectable, Resolver, downcast, resolve};
pub use settings::ContainerSettings;
