//! Factory registration on [`Container`].

use std::any::type_name;
use std::sync::Arc;

use autofactory_container::{Container, DependencyKey, Injectable, Lifetime, Result};
use tracing::debug;

use crate::auto_factory::AutoFactoryRegistration;
use crate::descriptor::{AutoFactories, FactoryDescriptor};
use crate::interception::InterceptedFactory;
use crate::typed_factory::TypedFactoryRegistration;

/// Adds the auto-factory and typed-factory registrars to [`Container`].
pub trait AutoFactoryExt {
    /// Registers `S → T` (transient) and starts an auto-factory
    /// registration. The factory itself gets the container's default
    /// factory lifetime.
    ///
    /// A source already mapped to the same target by an earlier auto
    /// factory is left as is, so one source can have several factory
    /// signatures.
    ///
    /// `T: Into<S>` is the proof that the target satisfies the source, so a
    /// mismatched pair does not compile.
    fn register_auto_factory_for<S, T>(&self) -> Result<AutoFactoryRegistration<S>>
    where
        S: Clone + Send + Sync + 'static,
        T: Injectable + Into<S>;

    /// Like [`register_auto_factory_for`](Self::register_auto_factory_for)
    /// with an explicit factory lifetime.
    fn register_auto_factory_for_with_lifetime<S, T>(
        &self,
        factory_lifetime: Lifetime,
    ) -> Result<AutoFactoryRegistration<S>>
    where
        S: Clone + Send + Sync + 'static,
        T: Injectable + Into<S>;

    /// Starts a typed-factory registration of factory trait `F` implemented
    /// by `I`.
    fn register_auto_factory<F, I>(&self) -> TypedFactoryRegistration<F, I>
    where
        F: ?Sized + Send + Sync + 'static,
        I: InterceptedFactory + Into<Arc<F>>;

    fn register_auto_factory_with_lifetime<F, I>(
        &self,
        factory_lifetime: Lifetime,
    ) -> TypedFactoryRegistration<F, I>
    where
        F: ?Sized + Send + Sync + 'static,
        I: InterceptedFactory + Into<Arc<F>>;

    /// Every auto factory registered so far, in registration order.
    fn factory_descriptors(&self) -> Vec<FactoryDescriptor>;
}

impl AutoFactoryExt for Container {
    fn register_auto_factory_for<S, T>(&self) -> Result<AutoFactoryRegistration<S>>
    where
        S: Clone + Send + Sync + 'static,
        T: Injectable + Into<S>,
    {
        self.register_auto_factory_for_with_lifetime::<S, T>(self.settings().default_factory_lifetime)
    }

    fn register_auto_factory_for_with_lifetime<S, T>(
        &self,
        factory_lifetime: Lifetime,
    ) -> Result<AutoFactoryRegistration<S>>
    where
        S: Clone + Send + Sync + 'static,
        T: Injectable + Into<S>,
    {
        let source = DependencyKey::of::<S>();
        let target = DependencyKey::of::<T>();
        let factories = self.extension::<AutoFactories>();

        if factories.target_of(&source) == Some(target) {
            debug!(%source, %target, "Auto factory target already registered");
        } else {
            self.register_type::<S, T>(Lifetime::Transient)?;
            factories.record_target(source, target);
            debug!(
                source = type_name::<S>(),
                target = type_name::<T>(),
                "Registered auto factory target"
            );
        }
        Ok(AutoFactoryRegistration::new(self.clone(), factory_lifetime))
    }

    fn register_auto_factory<F, I>(&self) -> TypedFactoryRegistration<F, I>
    where
        F: ?Sized + Send + Sync + 'static,
        I: InterceptedFactory + Into<Arc<F>>,
    {
        self.register_auto_factory_with_lifetime::<F, I>(self.settings().default_factory_lifetime)
    }

    fn register_auto_factory_with_lifetime<F, I>(
        &self,
        factory_lifetime: Lifetime,
    ) -> TypedFactoryRegistration<F, I>
    where
        F: ?Sized + Send + Sync + 'static,
        I: InterceptedFactory + Into<Arc<F>>,
    {
        TypedFactoryRegistration::new(self.clone(), factory_lifetime)
    }

    fn factory_descriptors(&self) -> Vec<FactoryDescriptor> {
        if !self.has_extension::<AutoFactories>() {
            return Vec::new();
        }
        self.extension::<AutoFactories>().descriptors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto_factory::{Factory, Factory1};
    use crate::descriptor::FactoryArity;
    use autofactory_container::{AutoFactoryError, Resolver, resolve};

    #[derive(Clone)]
    struct Ticket(u32);

    impl Injectable for Ticket {
        fn construct(r: &dyn Resolver) -> Result<Self> {
            Ok(Ticket(resolve(r)?))
        }
    }

    #[test]
    fn default_factory_lifetime_comes_from_settings() {
        let container = Container::builder()
            .default_factory_lifetime(Lifetime::Transient)
            .build();
        let registration = container.register_auto_factory_for::<Ticket, Ticket>().unwrap();
        assert_eq!(registration.factory_lifetime(), Lifetime::Transient);

        let other = Container::new();
        let registration = other.register_auto_factory_for::<Ticket, Ticket>().unwrap();
        assert_eq!(registration.factory_lifetime(), Lifetime::ContainerControlled);
    }

    #[test]
    fn source_is_registered_before_any_terminal() {
        let container = Container::new();
        let _registration = container.register_auto_factory_for::<Ticket, Ticket>().unwrap();
        assert!(container.is_registered::<Ticket>());
        assert!(container.factory_descriptors().is_empty());
    }

    #[test]
    fn duplicate_source_fails_at_registration() {
        let container = Container::new();
        container.register_instance(Ticket(1)).unwrap();

        let err = container.register_auto_factory_for::<Ticket, Ticket>().unwrap_err();
        assert!(matches!(err, AutoFactoryError::AlreadyRegistered(_)));
    }

    #[test]
    fn one_source_can_have_several_signatures() {
        let container = Container::new();
        container.register_instance(7u32).unwrap();
        container
            .register_auto_factory_for::<Ticket, Ticket>()
            .unwrap()
            .with_param::<u32>()
            .unwrap();
        container
            .register_auto_factory_for::<Ticket, Ticket>()
            .unwrap()
            .without_parameters()
            .unwrap();

        let numbered: Arc<dyn Factory1<u32, Ticket>> = container.resolve().unwrap();
        let plain: Arc<dyn Factory<Ticket>> = container.resolve().unwrap();
        assert_eq!(numbered.create(3).unwrap().0, 3);
        assert_eq!(plain.create().unwrap().0, 7);
        assert_eq!(container.factory_descriptors().len(), 2);
    }

    #[test]
    fn same_signature_twice_fails_at_the_terminal() {
        let container = Container::new();
        container
            .register_auto_factory_for::<Ticket, Ticket>()
            .unwrap()
            .with_param::<u32>()
            .unwrap();

        let err = container
            .register_auto_factory_for::<Ticket, Ticket>()
            .unwrap()
            .with_param::<u32>()
            .unwrap_err();
        assert!(matches!(err, AutoFactoryError::AlreadyRegistered(_)));
        assert_eq!(container.factory_descriptors().len(), 1);
    }

    #[test]
    fn descriptors_list_every_terminal() {
        let container = Container::new();
        container
            .register_auto_factory_for::<Ticket, Ticket>()
            .unwrap()
            .with_param::<u32>()
            .unwrap();
        container
            .register_auto_factory_for_with_lifetime::<Option<Ticket>, Ticket>(Lifetime::Transient)
            .unwrap()
            .without_parameters()
            .unwrap();

        let descriptors = container.factory_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].arity(), FactoryArity::Unary);
        assert!(descriptors[0].produced().is::<Ticket>());
        assert_eq!(descriptors[1].arity(), FactoryArity::Nullary);
    }
}
