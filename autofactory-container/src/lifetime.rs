//! Lifetime policies for registrations.
//!
//! - [`Lifetime::ContainerControlled`]: one instance per container
//! - [`Lifetime::Transient`]: a new instance on every resolve
//!
//! Auto factories themselves default to `ContainerControlled`; the types
//! they produce are registered `Transient` so every `create` call builds a
//! fresh object.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Controls whether a resolve returns a new instance or a cached one.
///
/// # Examples
/// ```
/// use autofactory_container::lifetime::Lifetime;
///
/// assert!(Lifetime::ContainerControlled.is_cached());
/// assert!(!Lifetime::Transient.is_cached());
/// assert_eq!(Lifetime::default(), Lifetime::ContainerControlled);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// Built on first resolve and shared until the container is dropped.
    ///
    /// The first resolve wins: overrides active during that resolve are
    /// baked into the cached value.
    #[default]
    ContainerControlled,

    /// Built on every resolve. Never cached.
    Transient,
}

impl Lifetime {
    /// Returns `true` if resolved values are cached.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::ContainerControlled)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::ContainerControlled => write!(f, "ContainerControlled"),
            Lifetime::Transient => write!(f, "Transient"),
        }
    }
}
