//! Method-call interception for typed factories.
//!
//! A typed-factory implementation does no work of its own: every method
//! packs its name, declared return type and arguments into a
//! [`MethodInvocation`] and hands it to its [`Interceptor`]. The interceptor
//! runs the [`InterceptionPipeline`] attached to the factory service, where
//! each [`InterceptionBehavior`] either answers the call or forwards it to
//! [`Next`].
//!
//! ```text
//! factory.create(a, b)
//!     │  MethodInvocation { "create", Interface(Arc<dyn T>), [a, b] }
//!     ▼
//! Interceptor ──► behavior 1 ──next──► behavior 2 ──next──► (end: NotIntercepted)
//!                                          │
//!                                          ▼
//!                                    MethodReturn { value, arguments }
//! ```
//!
//! Behaviors are attached per factory service through the [`Interception`]
//! container extension.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use autofactory_container::{
    AutoFactoryError, DependencyKey, DependencyOverride, OverrideSet, Result, downcast,
};
use parking_lot::RwLock;
use tracing::{debug, trace};

/// Declared return type of an intercepted method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    /// A trait object behind a pointer (`Arc<dyn T>`, `Box<dyn T>`).
    Interface(DependencyKey),
    /// Anything else.
    Value(DependencyKey),
}

impl ReturnType {
    pub fn interface<R: 'static>() -> Self {
        ReturnType::Interface(DependencyKey::of::<R>())
    }

    pub fn value<R: 'static>() -> Self {
        ReturnType::Value(DependencyKey::of::<R>())
    }

    pub fn key(&self) -> DependencyKey {
        match self {
            ReturnType::Interface(key) | ReturnType::Value(key) => *key,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, ReturnType::Interface(_))
    }
}

/// One named argument of an intercepted call.
#[derive(Debug, Clone)]
pub struct Argument {
    name: &'static str,
    value: DependencyOverride,
}

impl Argument {
    pub fn new<P: Clone + Send + Sync + 'static>(name: &'static str, value: P) -> Self {
        Self {
            name,
            value: DependencyOverride::new(value),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type of the parameter.
    pub fn key(&self) -> DependencyKey {
        self.value.key()
    }

    pub fn value(&self) -> &DependencyOverride {
        &self.value
    }

    pub fn downcast_ref<P: 'static>(&self) -> Option<&P> {
        self.value.downcast_ref::<P>()
    }
}

/// A single call to a typed-factory method.
#[derive(Debug, Clone)]
pub struct MethodInvocation {
    method: &'static str,
    return_type: ReturnType,
    arguments: Vec<Argument>,
}

impl MethodInvocation {
    pub fn new(method: &'static str, return_type: ReturnType) -> Self {
        Self {
            method,
            return_type,
            arguments: Vec::new(),
        }
    }

    /// Appends an argument; call order is declaration order.
    pub fn with_argument<P: Clone + Send + Sync + 'static>(
        mut self,
        name: &'static str,
        value: P,
    ) -> Self {
        self.arguments.push(Argument::new(name, value));
        self
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// One override per argument, in argument order.
    pub fn to_overrides(&self) -> OverrideSet {
        self.arguments.iter().map(|a| a.value.clone()).collect()
    }

    pub fn into_arguments(self) -> Vec<Argument> {
        self.arguments
    }
}

/// Result of an intercepted call.
pub struct MethodReturn {
    value: Box<dyn Any + Send + Sync>,
    arguments: Vec<Argument>,
}

impl MethodReturn {
    pub fn new(value: Box<dyn Any + Send + Sync>, arguments: Vec<Argument>) -> Self {
        Self { value, arguments }
    }

    /// Wraps a typed value.
    pub fn of<R: Send + Sync + 'static>(value: R, arguments: Vec<Argument>) -> Self {
        Self::new(Box::new(value), arguments)
    }

    /// The arguments of the call that produced this return.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Recovers the returned value as `R`.
    ///
    /// # Errors
    /// [`AutoFactoryError::ConstructionFailed`] if a behavior returned
    /// something other than `R`.
    pub fn into_value<R: 'static>(self) -> Result<R> {
        downcast(DependencyKey::of::<R>(), self.value)
    }
}

impl fmt::Debug for MethodReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodReturn")
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// A step of the interception chain.
pub trait InterceptionBehavior: Send + Sync {
    /// Handles `input` or passes it on through `next`.
    fn invoke(&self, input: MethodInvocation, next: Next<'_>) -> Result<MethodReturn>;

    /// Behaviors returning `false` are left out of the pipeline.
    fn will_execute(&self) -> bool {
        true
    }

    /// Extra service types the intercepted object must expose.
    fn required_interfaces(&self) -> Vec<DependencyKey> {
        Vec::new()
    }
}

/// The remainder of the chain after the current behavior.
pub struct Next<'a> {
    behaviors: &'a [Arc<dyn InterceptionBehavior>],
}

impl Next<'_> {
    /// Runs the next behavior, or fails with
    /// [`AutoFactoryError::NotIntercepted`] at the end of the chain.
    pub fn invoke(self, input: MethodInvocation) -> Result<MethodReturn> {
        match self.behaviors.split_first() {
            Some((behavior, rest)) => behavior.invoke(input, Next { behaviors: rest }),
            None => {
                trace!(method = input.method(), "Reached end of interception chain");
                Err(AutoFactoryError::NotIntercepted {
                    method: input.method(),
                })
            }
        }
    }

    /// Behaviors still ahead in the chain.
    pub fn remaining(&self) -> usize {
        self.behaviors.len()
    }
}

/// Ordered, immutable list of behaviors for one factory service.
#[derive(Clone, Default)]
pub struct InterceptionPipeline {
    behaviors: Vec<Arc<dyn InterceptionBehavior>>,
}

impl InterceptionPipeline {
    pub fn new(behaviors: impl IntoIterator<Item = Arc<dyn InterceptionBehavior>>) -> Self {
        Self {
            behaviors: behaviors.into_iter().filter(|b| b.will_execute()).collect(),
        }
    }

    pub fn invoke(&self, input: MethodInvocation) -> Result<MethodReturn> {
        Next {
            behaviors: &self.behaviors,
        }
        .invoke(input)
    }

    /// Union of every behavior's required interfaces, first occurrence order.
    pub fn required_interfaces(&self) -> Vec<DependencyKey> {
        let mut keys: Vec<DependencyKey> = Vec::new();
        for key in self.behaviors.iter().flat_map(|b| b.required_interfaces()) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl fmt::Debug for InterceptionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionPipeline")
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}

/// Held by typed-factory implementations; dispatches their calls.
///
/// The chain is looked up on every call, so behaviors attached after the
/// factory object was built still apply.
#[derive(Debug, Clone)]
pub struct Interceptor {
    target: DependencyKey,
    interception: Interception,
}

impl Interceptor {
    pub fn new(target: DependencyKey, interception: Interception) -> Self {
        Self {
            target,
            interception,
        }
    }

    /// The factory service this interceptor serves.
    pub fn target(&self) -> DependencyKey {
        self.target
    }

    /// The chain currently attached to the target.
    pub fn pipeline(&self) -> InterceptionPipeline {
        self.interception.pipeline_for(&self.target)
    }

    pub fn invoke(&self, input: MethodInvocation) -> Result<MethodReturn> {
        trace!(
            factory = %self.target,
            method = input.method(),
            arguments = input.arguments().len(),
            "Intercepted factory call"
        );
        self.pipeline().invoke(input)
    }
}

/// A typed-factory implementation built around an [`Interceptor`].
///
/// Usually generated by [`#[typed_factory]`](macro@crate::typed_factory); may be
/// written by hand.
pub trait InterceptedFactory: Send + Sync + 'static {
    fn from_interceptor(interceptor: Interceptor) -> Self;
}

/// Container extension holding the behaviors attached to each factory
/// service.
///
/// Installed by [`Container::extension`](autofactory_container::Container::extension);
/// clones share state.
#[derive(Clone, Default)]
pub struct Interception {
    chains: Arc<RwLock<HashMap<DependencyKey, Chain>>>,
}

#[derive(Default)]
struct Chain {
    behaviors: Vec<Arc<dyn InterceptionBehavior>>,
    // Position of the behavior installed by the factory registration.
    factory_slot: Option<usize>,
}

impl Interception {
    /// Appends `behavior` to the chain of `target`.
    pub fn add_behavior(&self, target: DependencyKey, behavior: Arc<dyn InterceptionBehavior>) {
        let mut chains = self.chains.write();
        let chain = chains.entry(target).or_default();
        chain.behaviors.push(behavior);
        debug!(factory = %target, behaviors = chain.behaviors.len(), "Attached interception behavior");
    }

    /// Installs the behavior that answers `target`'s factory calls.
    ///
    /// A second call replaces the first one in place; behaviors added with
    /// [`add_behavior`](Self::add_behavior) keep their position.
    pub fn set_factory_behavior(&self, target: DependencyKey, behavior: Arc<dyn InterceptionBehavior>) {
        let mut chains = self.chains.write();
        let chain = chains.entry(target).or_default();
        match chain.factory_slot {
            Some(slot) => {
                chain.behaviors[slot] = behavior;
                debug!(factory = %target, "Replaced factory behavior");
            }
            None => {
                chain.factory_slot = Some(chain.behaviors.len());
                chain.behaviors.push(behavior);
                debug!(factory = %target, behaviors = chain.behaviors.len(), "Attached factory behavior");
            }
        }
    }

    /// Snapshot of the chain currently attached to `target`.
    pub fn pipeline_for(&self, target: &DependencyKey) -> InterceptionPipeline {
        let chains = self.chains.read();
        InterceptionPipeline::new(
            chains
                .get(target)
                .into_iter()
                .flat_map(|chain| chain.behaviors.iter().cloned()),
        )
    }

    pub fn is_intercepted(&self, target: &DependencyKey) -> bool {
        self.chains
            .read()
            .get(target)
            .is_some_and(|chain| !chain.behaviors.is_empty())
    }

    pub fn behavior_count(&self, target: &DependencyKey) -> usize {
        self.chains.read().get(target).map_or(0, |chain| chain.behaviors.len())
    }
}

impl fmt::Debug for Interception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("factories", &self.chains.read().len())
            .finish()
    }
}
