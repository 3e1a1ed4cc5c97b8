//! Container configuration.
//!
//! [`ContainerSettings`] can be built in code through
//! [`ContainerBuilder`](crate::container::ContainerBuilder) or deserialized
//! from any serde format; missing fields take their defaults.
//!
//! ```
//! use autofactory_container::settings::ContainerSettings;
//! use autofactory_container::lifetime::Lifetime;
//!
//! let settings = ContainerSettings::default();
//! assert!(!settings.allow_override);
//! assert_eq!(settings.default_factory_lifetime, Lifetime::ContainerControlled);
//! ```

use serde::{Deserialize, Serialize};

use crate::lifetime::Lifetime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Replace existing registrations instead of failing with
    /// `AlreadyRegistered`.
    pub allow_override: bool,

    /// Lifetime given to factory objects when the caller does not pick one.
    pub default_factory_lifetime: Lifetime,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            allow_override: false,
            default_factory_lifetime: Lifetime::ContainerControlled,
        }
    }
}
