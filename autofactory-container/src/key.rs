//! Service identification keys.
//!
//! [`DependencyKey`] is the runtime stand-in for a type: registrations,
//! overrides, conversions and factory descriptors are all keyed by it.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use autofactory_support::rendering::shorten_type_name;

/// Uniquely identifies a service type in the container.
///
/// Equality and hashing use only the [`TypeId`]; the type name is carried
/// along for diagnostics.
///
/// # Examples
/// ```
/// use autofactory_container::key::DependencyKey;
///
/// let key = DependencyKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
/// assert!(key.is::<String>());
/// assert_ne!(key, DependencyKey::of::<Option<String>>());
/// ```
#[derive(Clone, Copy)]
pub struct DependencyKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl DependencyKey {
    /// Creates a key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of this service.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without module paths, for messages.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }

    /// Returns `true` if this key identifies `T`.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for DependencyKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DependencyKey({})", self.type_name)
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Widget;
    trait Part {}

    #[test]
    fn key_of_type() {
        let key = DependencyKey::of::<Widget>();
        assert!(key.type_name().contains("Widget"));
        assert!(key.is::<Widget>());
        assert!(!key.is::<String>());
    }

    #[test]
    fn option_and_inner_are_distinct() {
        assert_ne!(
            DependencyKey::of::<Arc<dyn Part>>(),
            DependencyKey::of::<Option<Arc<dyn Part>>>()
        );
    }

    #[test]
    fn display_uses_short_name() {
        let key = DependencyKey::of::<Arc<dyn Part>>();
        assert_eq!(key.to_string(), "Arc<dyn Part>");
    }

    #[test]
    fn key_in_hashmap() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(DependencyKey::of::<String>(), "string");
        map.insert(DependencyKey::of::<i32>(), "i32");
        assert_eq!(map.get(&DependencyKey::of::<String>()), Some(&"string"));
        assert_eq!(map.get(&DependencyKey::of::<bool>()), None);
    }
}
