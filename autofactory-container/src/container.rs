//! # The Container
//!
//! The registration table and resolution engine the factory layer sits on.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container ──downgrade()──> WeakContainer
//!                                   │
//!                      resolve_key(key, overrides)
//!                                   │
//!                                   ▼
//!                           ContainerResolver   (one per resolve call:
//!                                                overrides, cycle path)
//! ```
//!
//! Unlike a build-once container, registrations may be added at any time
//! through a shared `&Container`; factories registered by the factory layer
//! keep a [`WeakContainer`] so they never keep their own container alive.
//! Registration is expected to finish before concurrent resolution starts.
//!
//! # Examples
//! ```rust
//! use autofactory_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Mailer: Send + Sync {
//!     fn sender(&self) -> &str;
//! }
//!
//! struct Smtp {
//!     sender: String,
//! }
//!
//! impl Mailer for Smtp {
//!     fn sender(&self) -> &str { &self.sender }
//! }
//!
//! impl Injectable for Smtp {
//!     fn construct(r: &dyn Resolver) -> Result<Self> {
//!         Ok(Smtp { sender: resolve(r)? })
//!     }
//! }
//!
//! impl_service!(Smtp => dyn Mailer);
//!
//! let container = Container::new();
//! container.register_instance(String::from("noreply@example.com")).unwrap();
//! container.register_type::<Arc<dyn Mailer>, Smtp>(Lifetime::Transient).unwrap();
//!
//! let mailer: Arc<dyn Mailer> = container.resolve().unwrap();
//! assert_eq!(mailer.sender(), "noreply@example.com");
//!
//! let mailer: Arc<dyn Mailer> = container
//!     .resolve_with(OverrideSet::new().with(String::from("alerts@example.com")))
//!     .unwrap();
//! assert_eq!(mailer.sender(), "alerts@example.com");
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use autofactory_support::rendering::suggest_similar;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{
    AutoFactoryError, CircularDependencyError, NotAssignableError, NotRegisteredError, Result,
};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::overrides::OverrideSet;
use crate::registry::{FactoryFn, Registration, RegistrationInfo, Registry};
use crate::resolver::{Injectable, Resolver, downcast};
use crate::settings::ContainerSettings;

/// Converts an erased `T` into an erased `S`; `None` if the value is not a `T`.
type CastFn = fn(Box<dyn Any + Send + Sync>) -> Option<Box<dyn Any + Send + Sync>>;

fn cast_value<T, S>(value: Box<dyn Any + Send + Sync>) -> Option<Box<dyn Any + Send + Sync>>
where
    T: Into<S> + 'static,
    S: Send + Sync + 'static,
{
    let concrete = value.downcast::<T>().ok()?;
    let service: S = (*concrete).into();
    Some(Box::new(service))
}

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`] with non-default [`ContainerSettings`].
///
/// ```rust
/// use autofactory_container::prelude::*;
///
/// let container = Container::builder()
///     .allow_override(true)
///     .default_factory_lifetime(Lifetime::Transient)
///     .build();
/// assert!(container.settings().allow_override);
/// ```
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    settings: ContainerSettings,
}

impl ContainerBuilder {
    /// Allow replacing previously registered services.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.settings.allow_override = allow;
        self
    }

    /// Lifetime given to factory objects when none is requested explicitly.
    pub fn default_factory_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.settings.default_factory_lifetime = lifetime;
        self
    }

    /// Replace all settings at once (e.g. deserialized from a config file).
    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Container {
        Container::with_settings(self.settings)
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

struct Inner {
    registry: RwLock<Registry>,
    conversions: DashMap<(TypeId, TypeId), CastFn>,
    extensions: RwLock<anymap2::Map<dyn anymap2::any::Any + Send + Sync>>,
    settings: ContainerSettings,
}

/// Thread-safe dependency injection container.
///
/// `Container` is a cheap handle: clones share the same registrations.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty container with default settings.
    pub fn new() -> Self {
        Self::with_settings(ContainerSettings::default())
    }

    /// Creates an empty container with the given settings.
    pub fn with_settings(settings: ContainerSettings) -> Self {
        debug!(?settings, "Creating container");
        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(Registry::new()),
                conversions: DashMap::new(),
                extensions: RwLock::new(anymap2::Map::new()),
                settings,
            }),
        }
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.inner.settings
    }

    // ── Registration ──

    /// Registers service `S`, built by constructing `T` and converting it.
    ///
    /// `T: Into<S>` is the compile-time proof that the target satisfies the
    /// source. The conversion is also recorded so it can be looked up at
    /// runtime (see [`register_conversion`](Self::register_conversion)).
    pub fn register_type<S, T>(&self, lifetime: Lifetime) -> Result<()>
    where
        S: Clone + Send + Sync + 'static,
        T: Injectable + Into<S>,
    {
        self.register_conversion::<T, S>();
        self.register_factory::<S>(lifetime, |resolver| Ok(T::construct(resolver)?.into()))
    }

    /// Registers `T` as itself, constructed fresh on every resolve.
    ///
    /// Unlike [`register_type`](Self::register_type) this needs no `Clone`.
    pub fn register_transient<T: Injectable>(&self) -> Result<()> {
        self.register_internal(
            DependencyKey::of::<T>(),
            Lifetime::Transient,
            Arc::new(|resolver: &dyn Resolver| -> Result<Box<dyn Any + Send + Sync>> {
                Ok(Box::new(T::construct(resolver)?))
            }),
        )
    }

    /// Registers a pre-built value. Cloned on every resolve (use `Arc<T>`
    /// for cheap sharing).
    pub fn register_instance<S: Clone + Send + Sync + 'static>(&self, value: S) -> Result<()> {
        self.register_internal(
            DependencyKey::of::<S>(),
            Lifetime::ContainerControlled,
            Arc::new(move |_: &dyn Resolver| -> Result<Box<dyn Any + Send + Sync>> {
                Ok(Box::new(value.clone()))
            }),
        )
    }

    /// Registers a construction closure for `S`.
    ///
    /// Under [`Lifetime::ContainerControlled`] the closure runs once (via
    /// `OnceCell`) and the result is cloned on later resolves.
    pub fn register_factory<S: Clone + Send + Sync + 'static>(
        &self,
        lifetime: Lifetime,
        factory: impl Fn(&dyn Resolver) -> Result<S> + Send + Sync + 'static,
    ) -> Result<()> {
        let factory: FactoryFn = match lifetime {
            Lifetime::ContainerControlled => {
                let cell: OnceCell<S> = OnceCell::new();
                Arc::new(move |resolver: &dyn Resolver| -> Result<Box<dyn Any + Send + Sync>> {
                    let value = cell.get_or_try_init(|| factory(resolver))?;
                    Ok(Box::new(value.clone()))
                })
            }
            Lifetime::Transient => {
                Arc::new(move |resolver: &dyn Resolver| -> Result<Box<dyn Any + Send + Sync>> {
                    Ok(Box::new(factory(resolver)?))
                })
            }
        };

        self.register_internal(DependencyKey::of::<S>(), lifetime, factory)
    }

    /// Declares that a `T` can stand in wherever an `S` is expected.
    ///
    /// Idempotent. Conversions are what [`register_alias`](Self::register_alias)
    /// and typed factories check at runtime.
    pub fn register_conversion<T, S>(&self)
    where
        T: Into<S> + Send + Sync + 'static,
        S: Send + Sync + 'static,
    {
        trace!(from = type_name::<T>(), to = type_name::<S>(), "Registered conversion");
        self.inner
            .conversions
            .insert((TypeId::of::<T>(), TypeId::of::<S>()), cast_value::<T, S>);
    }

    /// Maps service `from` onto the registration of `to`.
    ///
    /// Fails fast, before anything is resolved, if `to` is not registered
    /// or no conversion from `to` into `from` is known.
    pub fn register_alias(&self, from: DependencyKey, to: DependencyKey) -> Result<()> {
        if !self.contains(&to) {
            return Err(AutoFactoryError::NotRegistered(NotRegisteredError {
                requested: to,
                required_by: Some(from),
                suggestions: self.suggestions(&to),
            }));
        }

        if !self.has_conversion(&to, &from) {
            warn!(source = %from, target = %to, "Rejected alias: target does not satisfy source");
            return Err(AutoFactoryError::NotAssignable(NotAssignableError {
                source: from,
                target: to,
            }));
        }

        self.inner
            .registry
            .write()
            .register_alias(from, to, self.inner.settings.allow_override)
    }

    fn register_internal(
        &self,
        key: DependencyKey,
        lifetime: Lifetime,
        factory: FactoryFn,
    ) -> Result<()> {
        let registration = Registration { key, factory, lifetime };
        self.inner
            .registry
            .write()
            .register(registration, self.inner.settings.allow_override)
    }

    // ── Conversions ──

    /// Returns `true` if a `from` value can be converted into `to`.
    pub fn has_conversion(&self, from: &DependencyKey, to: &DependencyKey) -> bool {
        from == to || self.inner.conversions.contains_key(&(from.type_id(), to.type_id()))
    }

    /// Converts an erased `from` value into an erased `to` value.
    ///
    /// # Errors
    /// [`AutoFactoryError::TypeMismatch`] if no conversion is registered.
    pub fn convert(
        &self,
        value: Box<dyn Any + Send + Sync>,
        from: DependencyKey,
        to: DependencyKey,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        if from == to {
            return Ok(value);
        }

        let cast = self
            .inner
            .conversions
            .get(&(from.type_id(), to.type_id()))
            .map(|entry| *entry.value())
            .ok_or_else(|| AutoFactoryError::type_mismatch(from, to))?;

        cast(value).ok_or_else(|| AutoFactoryError::ConstructionFailed {
            key: to,
            source: format!("Value handed to conversion was not a {}", from.type_name()).into(),
        })
    }

    // ── Resolution ──

    /// Resolves `T` with no overrides.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<T> {
        let key = DependencyKey::of::<T>();
        downcast(key, self.resolve_key(&key, None)?)
    }

    /// Resolves `T`, applying `overrides` to every parameter request made
    /// while building it.
    pub fn resolve_with<T: Send + Sync + 'static>(&self, overrides: OverrideSet) -> Result<T> {
        let key = DependencyKey::of::<T>();
        downcast(key, self.resolve_key(&key, Some(&overrides))?)
    }

    /// Resolves a key, returning the type-erased value.
    ///
    /// `None` for `overrides` skips override matching entirely.
    pub fn resolve_key(
        &self,
        key: &DependencyKey,
        overrides: Option<&OverrideSet>,
    ) -> Result<Box<dyn Any + Send + Sync>> {
        trace!(key = %key, overrides = overrides.map_or(0, OverrideSet::len), "Resolving");
        ContainerResolver::new(self, overrides).resolve_key(key)
    }

    // ── Introspection ──

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.contains(&DependencyKey::of::<T>())
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.inner.registry.read().contains(key)
    }

    /// Number of registered services, aliases included.
    pub fn len(&self) -> usize {
        self.inner.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.read().is_empty()
    }

    /// Snapshot of all registrations, sorted by service name.
    pub fn registrations(&self) -> Vec<RegistrationInfo> {
        self.inner.registry.read().snapshot()
    }

    fn suggestions(&self, key: &DependencyKey) -> Vec<String> {
        let registry = self.inner.registry.read();
        suggest_similar(key.type_name(), &registry.registered_names(), 3)
    }

    // ── Extensions ──

    /// Returns the extension of type `E`, installing `E::default()` the
    /// first time it is asked for.
    ///
    /// Extensions are shared state handles (clone = same state), so the
    /// returned value stays connected to the container.
    pub fn extension<E>(&self) -> E
    where
        E: Default + Clone + Send + Sync + 'static,
    {
        if let Some(extension) = self.inner.extensions.read().get::<E>() {
            return extension.clone();
        }

        let mut extensions = self.inner.extensions.write();
        if let Some(extension) = extensions.get::<E>() {
            return extension.clone();
        }

        let extension = E::default();
        extensions.insert(extension.clone());
        info!(extension = type_name::<E>(), "Enabled container extension");
        extension
    }

    /// Returns `true` if extension `E` has been installed.
    pub fn has_extension<E: Send + Sync + 'static>(&self) -> bool {
        self.inner.extensions.read().contains::<E>()
    }

    /// Creates a handle that does not keep the container alive.
    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.len())
            .field("conversions", &self.inner.conversions.len())
            .finish()
    }
}

/// Non-owning handle to a [`Container`].
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<Inner>,
}

impl WeakContainer {
    /// # Errors
    /// [`AutoFactoryError::ContainerDropped`] once the container is gone.
    pub fn upgrade(&self) -> Result<Container> {
        self.inner
            .upgrade()
            .map(|inner| Container { inner })
            .ok_or(AutoFactoryError::ContainerDropped)
    }
}

impl fmt::Debug for WeakContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakContainer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ═══════════════════════════════════════════
// ContainerResolver (one per resolve call)
// ═══════════════════════════════════════════

#[derive(Default)]
struct ResolveState {
    /// Keys currently under construction, outermost first.
    path: Vec<DependencyKey>,
    /// How many overrides of each key have been handed out so far.
    handed_out: HashMap<DependencyKey, usize>,
}

enum Target {
    Registered(Registration),
    Alias(DependencyKey),
}

struct ContainerResolver<'a> {
    container: &'a Container,
    overrides: Option<&'a OverrideSet>,
    state: Mutex<ResolveState>,
}

impl<'a> ContainerResolver<'a> {
    fn new(container: &'a Container, overrides: Option<&'a OverrideSet>) -> Self {
        Self {
            container,
            overrides,
            state: Mutex::new(ResolveState::default()),
        }
    }

    fn take_override(&self, key: &DependencyKey) -> Option<Box<dyn Any + Send + Sync>> {
        let overrides = self.overrides?;
        if !overrides.contains(key) {
            return None;
        }

        let mut state = self.state.lock();
        let occurrence = state.handed_out.entry(*key).or_default();
        let selected = overrides.select(key, *occurrence)?;
        trace!(key = %key, occurrence = *occurrence, "Applying override");
        *occurrence += 1;
        Some(selected.instantiate())
    }

    fn lookup(&self, key: &DependencyKey) -> Result<Target> {
        let registry = self.container.inner.registry.read();
        if let Some(target) = registry.alias_target(key) {
            return Ok(Target::Alias(target));
        }
        if let Some(registration) = registry.get(key) {
            return Ok(Target::Registered(registration.clone()));
        }
        drop(registry);

        Err(AutoFactoryError::NotRegistered(NotRegisteredError {
            requested: *key,
            required_by: self.state.lock().path.last().copied(),
            suggestions: self.container.suggestions(key),
        }))
    }

    fn enter(&self, key: &DependencyKey) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(start) = state.path.iter().position(|k| k == key) {
            let mut chain = state.path[start..].to_vec();
            chain.push(*key);
            warn!(cycle = ?chain, "Circular dependency detected");
            return Err(AutoFactoryError::CircularDependency(CircularDependencyError { chain }));
        }
        state.path.push(*key);
        Ok(())
    }

    fn leave(&self) {
        self.state.lock().path.pop();
    }
}

impl Resolver for ContainerResolver<'_> {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Box<dyn Any + Send + Sync>> {
        if let Some(value) = self.take_override(key) {
            return Ok(value);
        }

        let target = self.lookup(key)?;
        self.enter(key)?;
        let result = match target {
            Target::Registered(registration) => (registration.factory)(self),
            Target::Alias(to) => self
                .resolve_key(&to)
                .and_then(|value| self.container.convert(value, to, *key)),
        };
        self.leave();
        result
    }

    fn overrides(&self) -> Option<&OverrideSet> {
        self.overrides
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, WeakContainer};
    pub use crate::error::{AutoFactoryError, ErrorKind, Result};
    pub use crate::impl_service;
    pub use crate::key::DependencyKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::overrides::{DependencyOverride, OverrideSet};
    pub use crate::resolver::{Injectable, Resolver, resolve};
    pub use crate::settings::ContainerSettings;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
