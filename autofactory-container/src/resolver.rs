//! What constructors see of the container.
//!
//! Concrete types describe their constructor by implementing [`Injectable`]:
//! each parameter is requested from the [`Resolver`] by type. Whether the
//! value comes from a registration or from a caller-supplied override is
//! invisible to the constructor.
//!
//! ```rust
//! use autofactory_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Polite {
//!     name: String,
//! }
//!
//! impl Greeter for Polite {
//!     fn greet(&self) -> String { format!("Good day, {}", self.name) }
//! }
//!
//! impl Injectable for Polite {
//!     fn construct(r: &dyn Resolver) -> Result<Self> {
//!         Ok(Self { name: resolve(r)? })
//!     }
//! }
//!
//! impl_service!(Polite => dyn Greeter);
//!
//! let container = Container::new();
//! container.register_type::<Arc<dyn Greeter>, Polite>(Lifetime::Transient).unwrap();
//!
//! let greeter: Arc<dyn Greeter> = container
//!     .resolve_with(OverrideSet::new().with(String::from("Ada")))
//!     .unwrap();
//! assert_eq!(greeter.greet(), "Good day, Ada");
//! ```

use std::any::{Any, type_name};

use crate::error::{AutoFactoryError, Result};
use crate::key::DependencyKey;
use crate::overrides::OverrideSet;

/// Resolves services by key during a single resolve call.
///
/// Separated from `Container` so constructors never hold the container
/// itself.
pub trait Resolver: Send + Sync {
    /// Resolves `key`, honouring any active overrides.
    fn resolve_key(&self, key: &DependencyKey) -> Result<Box<dyn Any + Send + Sync>>;

    /// The overrides active for this resolve call, if any were supplied.
    ///
    /// `None` means the call was made without an override set at all, which
    /// is different from an empty set.
    fn overrides(&self) -> Option<&OverrideSet> {
        None
    }
}

/// A concrete type the container knows how to construct.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Builds `Self`, pulling each constructor parameter from `resolver`.
    fn construct(resolver: &dyn Resolver) -> Result<Self>;
}

/// Resolve a typed parameter from a [`Resolver`].
///
/// Use this inside [`Injectable::construct`] and factory closures.
pub fn resolve<T: Send + Sync + 'static>(resolver: &dyn Resolver) -> Result<T> {
    let key = DependencyKey::of::<T>();
    downcast(key, resolver.resolve_key(&key)?)
}

/// Recovers a `T` from a type-erased resolve result.
pub fn downcast<T: 'static>(key: DependencyKey, boxed: Box<dyn Any + Send + Sync>) -> Result<T> {
    boxed
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| AutoFactoryError::ConstructionFailed {
            key,
            source: format!("Type mismatch: expected {}", type_name::<T>()).into(),
        })
}

/// Declares that a concrete type can be served as `Arc<dyn Trait>`.
///
/// Expands to `From<Concrete> for Arc<dyn Trait>` for every listed trait,
/// which is what [`Container::register_type`](crate::container::Container::register_type)
/// and [`Container::register_conversion`](crate::container::Container::register_conversion)
/// require.
///
/// ```rust
/// use autofactory_container::impl_service;
/// use std::sync::Arc;
///
/// trait Shape: Send + Sync {}
/// trait Named: Send + Sync {}
/// struct Square;
/// impl Shape for Square {}
/// impl Named for Square {}
///
/// impl_service!(Square => dyn Shape, dyn Named);
///
/// let shape: Arc<dyn Shape> = Square.into();
/// # let _ = shape;
/// ```
#[macro_export]
macro_rules! impl_service {
    ($concrete:ty => $($service:ty),+ $(,)?) => {
        $(
            impl ::core::convert::From<$concrete> for ::std::sync::Arc<$service> {
                fn from(value: $concrete) -> Self {
                    ::std::sync::Arc::new(value)
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Box<dyn Any + Send + Sync>);

    impl Resolver for Fixed {
        fn resolve_key(&self, _key: &DependencyKey) -> Result<Box<dyn Any + Send + Sync>> {
            Ok(Box::new(self.0.downcast_ref::<u32>().copied().unwrap_or_default()))
        }
    }

    #[test]
    fn resolve_downcasts_to_requested_type() {
        let r = Fixed(Box::new(7u32));
        let v: u32 = resolve(&r).unwrap();
        assert_eq!(v, 7);
        assert!(r.overrides().is_none());
    }

    #[test]
    fn resolve_reports_wrong_type() {
        let r = Fixed(Box::new(7u32));
        match resolve::<String>(&r) {
            Err(AutoFactoryError::ConstructionFailed { key, .. }) => {
                assert!(key.is::<String>());
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
    }
}
