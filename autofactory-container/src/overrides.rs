//! Dependency overrides.
//!
//! An [`OverrideSet`] forces specific parameter types to receive explicit
//! values during a single resolve call, bypassing the container's normal
//! resolution for those types. Overrides are matched by declared parameter
//! type, never by name, and apply to the whole object graph built by that
//! call.
//!
//! # Duplicate parameter types
//! When several overrides share a type they are handed out in declaration
//! order to successive requests for that type; once exhausted, the last one
//! is reused. A constructor asking for two `String`s therefore receives the
//! first and second `String` arguments respectively.
//!
//! # Examples
//! ```
//! use autofactory_container::overrides::{DependencyOverride, OverrideSet};
//! use autofactory_container::key::DependencyKey;
//!
//! let overrides: OverrideSet = [
//!     DependencyOverride::new(String::from("first")),
//!     DependencyOverride::new(None::<u32>),
//! ]
//! .into_iter()
//! .collect();
//!
//! assert_eq!(overrides.len(), 2);
//! assert!(overrides.contains(&DependencyKey::of::<Option<u32>>()));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::DependencyKey;

/// Type-erased value that can hand out owned copies of itself.
trait ErasedValue: Send + Sync {
    fn clone_boxed(&self) -> Box<dyn Any + Send + Sync>;
    fn as_any(&self) -> &(dyn Any + Send + Sync);
}

impl<T: Clone + Send + Sync + 'static> ErasedValue for T {
    fn clone_boxed(&self) -> Box<dyn Any + Send + Sync> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

/// A single `(parameter type, value)` pair.
///
/// Cheap to clone: the value itself is shared and only copied when the
/// container hands it to a constructor.
#[derive(Clone)]
pub struct DependencyOverride {
    key: DependencyKey,
    value: Arc<dyn ErasedValue>,
}

impl DependencyOverride {
    /// Overrides parameters of type `P` with `value`.
    pub fn new<P: Clone + Send + Sync + 'static>(value: P) -> Self {
        Self {
            key: DependencyKey::of::<P>(),
            value: Arc::new(value),
        }
    }

    /// The parameter type this override applies to.
    #[inline]
    pub fn key(&self) -> DependencyKey {
        self.key
    }

    /// Returns a fresh owned copy of the value, type-erased.
    pub fn instantiate(&self) -> Box<dyn Any + Send + Sync> {
        // Deref first: the Arc itself also satisfies `ErasedValue`.
        (*self.value).clone_boxed()
    }

    /// Borrows the value if it is a `P`.
    pub fn downcast_ref<P: 'static>(&self) -> Option<&P> {
        (*self.value).as_any().downcast_ref::<P>()
    }
}

impl fmt::Debug for DependencyOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyOverride")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of overrides for one resolve call.
#[derive(Clone, Default, Debug)]
pub struct OverrideSet {
    entries: Vec<DependencyOverride>,
}

impl OverrideSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for `capacity` overrides.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends an override, keeping declaration order.
    pub fn push(&mut self, entry: DependencyOverride) {
        self.entries.push(entry);
    }

    /// Builder-style [`push`](Self::push) of a typed value.
    pub fn with<P: Clone + Send + Sync + 'static>(mut self, value: P) -> Self {
        self.push(DependencyOverride::new(value));
        self
    }

    /// Returns `true` if any override targets `key`.
    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.entries.iter().any(|e| e.key == *key)
    }

    /// Number of overrides sharing `key`.
    pub fn count(&self, key: &DependencyKey) -> usize {
        self.entries.iter().filter(|e| e.key == *key).count()
    }

    /// Returns the override to use for the `occurrence`-th request of `key`.
    ///
    /// Requests beyond the number of matching overrides get the last one.
    pub fn select(&self, key: &DependencyKey, occurrence: usize) -> Option<&DependencyOverride> {
        let mut matching = self.entries.iter().filter(|e| e.key == *key);
        let mut selected = matching.next()?;
        for entry in matching.take(occurrence) {
            selected = entry;
        }
        Some(selected)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyOverride> {
        self.entries.iter()
    }
}

impl FromIterator<DependencyOverride> for OverrideSet {
    fn from_iter<I: IntoIterator<Item = DependencyOverride>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<DependencyOverride> for OverrideSet {
    fn extend<I: IntoIterator<Item = DependencyOverride>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}
