//! Factory signatures.
//!
//! A [`FactoryDescriptor`] records what an auto factory produces and which
//! parameter types its `create` accepts, in declaration order. Parameter
//! lists are plain tuples; [`ParameterList`] turns a tuple of arguments into
//! the [`OverrideSet`] handed to the container.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use autofactory_container::{DependencyKey, DependencyOverride, OverrideSet};
use autofactory_support::rendering::render_signature;
use parking_lot::RwLock;

/// How many parameters a factory takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryArity {
    Nullary,
    Unary,
    Binary,
    Variadic(usize),
}

impl FactoryArity {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => FactoryArity::Nullary,
            1 => FactoryArity::Unary,
            2 => FactoryArity::Binary,
            n => FactoryArity::Variadic(n),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            FactoryArity::Nullary => 0,
            FactoryArity::Unary => 1,
            FactoryArity::Binary => 2,
            FactoryArity::Variadic(n) => *n,
        }
    }
}

/// Produced type plus ordered parameter types of one auto factory.
///
/// ```
/// use autofactory::descriptor::{FactoryArity, FactoryDescriptor};
///
/// let descriptor = FactoryDescriptor::of::<Vec<u8>, (String, Option<u32>)>();
/// assert_eq!(descriptor.arity(), FactoryArity::Binary);
/// assert_eq!(descriptor.to_string(), "fn(String, Option<u32>) -> Vec<u8>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryDescriptor {
    produced: DependencyKey,
    parameters: Vec<DependencyKey>,
}

impl FactoryDescriptor {
    pub fn new(produced: DependencyKey, parameters: Vec<DependencyKey>) -> Self {
        Self { produced, parameters }
    }

    /// Descriptor for a factory producing `S` from the tuple `Args`.
    pub fn of<S: ?Sized + 'static, Args: ParameterList>() -> Self {
        Self::new(DependencyKey::of::<S>(), Args::parameter_keys())
    }

    pub fn produced(&self) -> DependencyKey {
        self.produced
    }

    /// Parameter types in declaration order.
    pub fn parameters(&self) -> &[DependencyKey] {
        &self.parameters
    }

    pub fn arity(&self) -> FactoryArity {
        FactoryArity::from_count(self.parameters.len())
    }

    /// Short human-readable signature, e.g. `fn(String) -> Arc<dyn Widget>`.
    pub fn signature(&self) -> String {
        let names: Vec<&str> = self.parameters.iter().map(|k| k.type_name()).collect();
        render_signature(&names, self.produced.type_name())
    }
}

impl fmt::Display for FactoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// Container extension listing every auto factory registered so far, and
/// the target type each factory source was mapped to.
#[derive(Clone, Default)]
pub struct AutoFactories {
    descriptors: Arc<RwLock<Vec<FactoryDescriptor>>>,
    targets: Arc<RwLock<HashMap<DependencyKey, DependencyKey>>>,
}

impl AutoFactories {
    pub fn record_target(&self, source: DependencyKey, target: DependencyKey) {
        self.targets.write().insert(source, target);
    }

    /// The target `source` was mapped to by an earlier auto-factory registration.
    pub fn target_of(&self, source: &DependencyKey) -> Option<DependencyKey> {
        self.targets.read().get(source).copied()
    }

    pub fn record(&self, descriptor: FactoryDescriptor) {
        self.descriptors.write().push(descriptor);
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<FactoryDescriptor> {
        self.descriptors.read().clone()
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }
}

/// A tuple of factory arguments, `()` through eight elements.
///
/// Each element becomes one override keyed by its declared type, in tuple
/// order. `Option<_>` elements set to `None` are still overrides.
pub trait ParameterList: Send + Sync + 'static {
    /// Number of parameters.
    const ARITY: usize;

    /// Declared parameter types, in order.
    fn parameter_keys() -> Vec<DependencyKey>;

    /// Consumes the arguments into an override set.
    fn into_overrides(self) -> OverrideSet;
}

macro_rules! impl_parameter_list {
    (@count) => { 0 };
    (@count $head:ident $($tail:ident)*) => { 1 + impl_parameter_list!(@count $($tail)*) };
    ($($param:ident),*) => {
        impl<$($param: Clone + Send + Sync + 'static),*> ParameterList for ($($param,)*) {
            const ARITY: usize = impl_parameter_list!(@count $($param)*);

            fn parameter_keys() -> Vec<DependencyKey> {
                vec![$(DependencyKey::of::<$param>()),*]
            }

            #[allow(non_snake_case, unused_mut)]
            fn into_overrides(self) -> OverrideSet {
                let ($($param,)*) = self;
                let mut overrides = OverrideSet::with_capacity(Self::ARITY);
                $(overrides.push(DependencyOverride::new($param));)*
                overrides
            }
        }
    };
}

impl_parameter_list!();
impl_parameter_list!(P1);
impl_parameter_list!(P1, P2);
impl_parameter_list!(P1, P2, P3);
impl_parameter_list!(P1, P2, P3, P4);
impl_parameter_list!(P1, P2, P3, P4, P5);
impl_parameter_list!(P1, P2, P3, P4, P5, P6);
impl_parameter_list!(P1, P2, P3, P4, P5, P6, P7);
impl_parameter_list!(P1, P2, P3, P4, P5, P6, P7, P8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_follows_tuple_length() {
        assert_eq!(<() as ParameterList>::ARITY, 0);
        assert_eq!(<(String,) as ParameterList>::ARITY, 1);
        assert_eq!(<(u8, u16, u32, u64) as ParameterList>::ARITY, 4);
        assert_eq!(FactoryDescriptor::of::<u8, ()>().arity(), FactoryArity::Nullary);
        assert_eq!(
            FactoryDescriptor::of::<u8, (u8, u8, u8)>().arity(),
            FactoryArity::Variadic(3)
        );
    }

    #[test]
    fn overrides_keep_declaration_order() {
        let overrides = (String::from("a"), None::<u32>, String::from("b")).into_overrides();
        let keys: Vec<_> = overrides.iter().map(|o| o.key()).collect();
        assert_eq!(
            keys,
            vec![
                DependencyKey::of::<String>(),
                DependencyKey::of::<Option<u32>>(),
                DependencyKey::of::<String>(),
            ]
        );
        assert_eq!(
            overrides.iter().nth(2).and_then(|o| o.downcast_ref::<String>()).map(String::as_str),
            Some("b")
        );
    }

    #[test]
    fn empty_list_has_no_overrides() {
        assert!(().into_overrides().is_empty());
        assert!(<() as ParameterList>::parameter_keys().is_empty());
    }

    #[test]
    fn registry_extension_is_shared() {
        let factories = AutoFactories::default();
        let handle = factories.clone();
        handle.record(FactoryDescriptor::of::<String, (u8,)>());

        assert_eq!(factories.len(), 1);
        assert_eq!(factories.descriptors()[0].arity(), FactoryArity::Unary);
    }

    #[test]
    fn targets_are_tracked_per_source() {
        let factories = AutoFactories::default();
        let source = DependencyKey::of::<String>();
        assert_eq!(factories.target_of(&source), None);

        factories.record_target(source, DependencyKey::of::<u8>());
        factories.clone().record_target(source, DependencyKey::of::<u16>());

        assert!(factories.target_of(&source).is_some_and(|k| k.is::<u16>()));
    }

    #[test]
    fn arity_count_round_trips() {
        for n in 0..6 {
            assert_eq!(FactoryArity::from_count(n).count(), n);
        }
    }
}
