//! Registration table.
//!
//! Maps a [`DependencyKey`] to the factory that builds it and the
//! [`Lifetime`] it was registered under. Aliases map one key onto another
//! registered key.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{AlreadyRegisteredError, AutoFactoryError};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::resolver::Resolver;

/// Type-erased construction function.
///
/// `Arc` rather than `Box`: the resolve path clones the factory out of the
/// table so no lock is held while user constructors run.
pub type FactoryFn =
    Arc<dyn Fn(&dyn Resolver) -> Result<Box<dyn Any + Send + Sync>, AutoFactoryError> + Send + Sync>;

/// Registration entry for a single service.
#[derive(Clone)]
pub(crate) struct Registration {
    pub key: DependencyKey,
    pub factory: FactoryFn,
    pub lifetime: Lifetime,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Serializable snapshot of one registration, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationInfo {
    pub service: String,
    pub lifetime: Option<Lifetime>,
    pub alias_of: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    registrations: HashMap<DependencyKey, Registration>,
    aliases: HashMap<DependencyKey, DependencyKey>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for a key.
    ///
    /// # Errors
    /// Returns [`AutoFactoryError::AlreadyRegistered`] if the key is
    /// already taken and `allow_override` is false.
    pub fn register(
        &mut self,
        registration: Registration,
        allow_override: bool,
    ) -> Result<(), AutoFactoryError> {
        let key = registration.key;

        if !allow_override && self.contains(&key) {
            return Err(AutoFactoryError::AlreadyRegistered(AlreadyRegisteredError { key }));
        }

        debug!(key = %key, lifetime = %registration.lifetime, "Registered service");
        self.aliases.remove(&key);
        self.registrations.insert(key, registration);
        Ok(())
    }

    /// Registers an alias: resolving `from` resolves `to` instead.
    pub fn register_alias(
        &mut self,
        from: DependencyKey,
        to: DependencyKey,
        allow_override: bool,
    ) -> Result<(), AutoFactoryError> {
        if !allow_override && self.contains(&from) {
            return Err(AutoFactoryError::AlreadyRegistered(AlreadyRegisteredError { key: from }));
        }

        debug!(from = %from, to = %to, "Registered alias");
        self.registrations.remove(&from);
        self.aliases.insert(from, to);
        Ok(())
    }

    /// Looks up a direct registration. Aliases are not followed; see
    /// [`alias_target`](Self::alias_target).
    pub fn get(&self, key: &DependencyKey) -> Option<&Registration> {
        self.registrations.get(key)
    }

    /// Returns the alias target of `key`, if it is an alias.
    pub fn alias_target(&self, key: &DependencyKey) -> Option<DependencyKey> {
        let target = self.aliases.get(key).copied();
        if let Some(target) = target {
            trace!(from = %key, to = %target, "Following alias");
        }
        target
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.registrations.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Number of registered services, aliases included.
    pub fn len(&self) -> usize {
        self.registrations.len() + self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fully qualified names of every registered key.
    pub fn registered_names(&self) -> Vec<&'static str> {
        self.registrations
            .keys()
            .chain(self.aliases.keys())
            .map(|k| k.type_name())
            .collect()
    }

    /// Snapshot of all registrations, sorted by service name.
    pub fn snapshot(&self) -> Vec<RegistrationInfo> {
        let mut infos: Vec<RegistrationInfo> = self
            .registrations
            .values()
            .map(|r| RegistrationInfo {
                service: r.key.type_name().to_string(),
                lifetime: Some(r.lifetime),
                alias_of: None,
            })
            .chain(self.aliases.iter().map(|(from, to)| RegistrationInfo {
                service: from.type_name().to_string(),
                lifetime: None,
                alias_of: Some(to.type_name().to_string()),
            }))
            .collect();
        infos.sort_by(|a, b| a.service.cmp(&b.service));
        infos
    }
}
