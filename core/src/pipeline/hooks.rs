// stepflow/src/pipeline/hooks.rs

//! Hook entries, the per-type hook registry, and the methods registering
//! `before`, `around` and `after` hooks on a `StepType`.
//!
//! Whatever form a hook is given in (closure, hook object, method of the step
//! type), it is normalized into one callable shape at registration so the
//! composer never has to care.

use tracing::{event, Level};

use crate::core::config::Configuration;
use crate::core::context::Context;
use crate::core::control::{HookPhase, Next, StepResult};
use crate::core::step::Step;
use crate::error::StepflowError;
use crate::pipeline::definition::StepType;
use std::sync::Arc;

type PhaseFn = dyn Fn(&dyn Step, &Context, &Configuration) -> StepResult + Send + Sync;
type AroundFn = dyn for<'n> Fn(&dyn Step, Next<'n>, &Context, &Configuration) -> StepResult + Send + Sync;

/// A reusable `before`/`after` hook.
pub trait HookObject: Send + Sync {
  fn call(&self, ctx: &Context, config: &Configuration) -> StepResult;
}

/// A reusable `around` hook. It decides whether, and when, `next` runs.
pub trait AroundHookObject: Send + Sync {
  fn call(&self, next: Next<'_>, ctx: &Context, config: &Configuration) -> StepResult;
}

/// How a hook was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
  Inline,
  Object,
  Method,
}

fn phase_fn<F>(f: F) -> Arc<PhaseFn>
where
  F: Fn(&dyn Step, &Context, &Configuration) -> StepResult + Send + Sync + 'static,
{
  Arc::new(f)
}

fn around_fn<F>(f: F) -> Arc<AroundFn>
where
  F: for<'n> Fn(&dyn Step, Next<'n>, &Context, &Configuration) -> StepResult + Send + Sync + 'static,
{
  Arc::new(f)
}

fn downcast_step<'s, S: Step>(step: &'s dyn Step, method: &str) -> Result<&'s S, StepflowError> {
  step.as_any().downcast_ref::<S>().ok_or_else(|| {
    event!(Level::ERROR, %method, expected = %std::any::type_name::<S>(), "Method hook invoked on a step of another type.");
    StepflowError::HookTypeMismatch {
      method: method.to_string(),
      expected: std::any::type_name::<S>().to_string(),
    }
  })
}

/// A `before` or `after` hook entry.
#[derive(Clone)]
pub struct PhaseHook {
  kind: HookKind,
  label: String,
  callable: Arc<PhaseFn>,
}

impl PhaseHook {
  pub fn inline(f: impl Fn(&Context, &Configuration) -> StepResult + Send + Sync + 'static) -> Self {
    Self {
      kind: HookKind::Inline,
      label: "inline".to_string(),
      callable: phase_fn(move |_step, ctx, config| f(ctx, config)),
    }
  }

  pub fn object<H: HookObject + 'static>(hook: H) -> Self {
    Self {
      kind: HookKind::Object,
      label: std::any::type_name::<H>().to_string(),
      callable: phase_fn(move |_step, ctx, config| hook.call(ctx, config)),
    }
  }

  /// Instantiates `H` once, now, and registers that instance.
  pub fn construct<H: HookObject + Default + 'static>() -> Self {
    Self::object(H::default())
  }

  /// A method of the step type, invoked on the instance being performed.
  pub fn method<S: Step>(name: &'static str, method: fn(&S, &Context, &Configuration) -> StepResult) -> Self {
    Self {
      kind: HookKind::Method,
      label: name.to_string(),
      callable: phase_fn(move |step, ctx, config| method(downcast_step::<S>(step, name)?, ctx, config)),
    }
  }

  pub fn kind(&self) -> HookKind {
    self.kind
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub(crate) fn invoke(&self, step: &dyn Step, ctx: &Context, config: &Configuration) -> StepResult {
    (self.callable)(step, ctx, config)
  }
}

impl std::fmt::Debug for PhaseHook {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PhaseHook")
      .field("kind", &self.kind)
      .field("label", &self.label)
      .finish()
  }
}

/// An `around` hook entry.
#[derive(Clone)]
pub struct AroundHook {
  kind: HookKind,
  label: String,
  callable: Arc<AroundFn>,
}

impl AroundHook {
  pub fn inline<F>(f: F) -> Self
  where
    F: for<'n> Fn(Next<'n>, &Context, &Configuration) -> StepResult + Send + Sync + 'static,
  {
    Self {
      kind: HookKind::Inline,
      label: "inline".to_string(),
      callable: around_fn(move |_step, next, ctx, config| f(next, ctx, config)),
    }
  }

  pub fn object<H: AroundHookObject + 'static>(hook: H) -> Self {
    Self {
      kind: HookKind::Object,
      label: std::any::type_name::<H>().to_string(),
      callable: around_fn(move |_step, next, ctx, config| hook.call(next, ctx, config)),
    }
  }

  pub fn construct<H: AroundHookObject + Default + 'static>() -> Self {
    Self::object(H::default())
  }

  pub fn method<S: Step>(
    name: &'static str,
    method: for<'n> fn(&S, Next<'n>, &Context, &Configuration) -> StepResult,
  ) -> Self {
    Self {
      kind: HookKind::Method,
      label: name.to_string(),
      callable: around_fn(move |step, next, ctx, config| method(downcast_step::<S>(step, name)?, next, ctx, config)),
    }
  }

  pub fn kind(&self) -> HookKind {
    self.kind
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub(crate) fn invoke(&self, step: &dyn Step, next: Next<'_>, ctx: &Context, config: &Configuration) -> StepResult {
    (self.callable)(step, next, ctx, config)
  }
}

impl std::fmt::Debug for AroundHook {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AroundHook")
      .field("kind", &self.kind)
      .field("label", &self.label)
      .finish()
  }
}

/// The three ordered hook lists of one step type.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
  before: Vec<PhaseHook>,
  around: Vec<AroundHook>,
  after: Vec<PhaseHook>,
}

impl HookRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn before(&self) -> &[PhaseHook] {
    &self.before
  }

  pub fn around(&self) -> &[AroundHook] {
    &self.around
  }

  pub fn after(&self) -> &[PhaseHook] {
    &self.after
  }

  pub fn len(&self, phase: HookPhase) -> usize {
    match phase {
      HookPhase::Before => self.before.len(),
      HookPhase::Around => self.around.len(),
      HookPhase::After => self.after.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.before.is_empty() && self.around.is_empty() && self.after.is_empty()
  }

  /// Labels of the hooks registered for `phase`, in registration order.
  pub fn labels(&self, phase: HookPhase) -> Vec<&str> {
    match phase {
      HookPhase::Before => self.before.iter().map(PhaseHook::label).collect(),
      HookPhase::Around => self.around.iter().map(AroundHook::label).collect(),
      HookPhase::After => self.after.iter().map(PhaseHook::label).collect(),
    }
  }

  pub(crate) fn push_before(&mut self, hook: PhaseHook) {
    self.before.push(hook);
  }

  pub(crate) fn push_after(&mut self, hook: PhaseHook) {
    self.after.push(hook);
  }

  pub(crate) fn push_around(&mut self, hook: AroundHook) {
    self.around.push(hook);
  }

  /// Appends every list of `other` after the matching list of `self`.
  pub(crate) fn extend_from(&mut self, other: &HookRegistry) {
    self.before.extend(other.before.iter().cloned());
    self.around.extend(other.around.iter().cloned());
    self.after.extend(other.after.iter().cloned());
  }
}

impl StepType {
  /// Registers an inline `before` hook.
  pub fn before(&self, f: impl Fn(&Context, &Configuration) -> StepResult + Send + Sync + 'static) -> &Self {
    self.before_hook(PhaseHook::inline(f))
  }

  /// Registers an inline `after` hook. After hooks only run when `call`
  /// returned normally.
  pub fn after(&self, f: impl Fn(&Context, &Configuration) -> StepResult + Send + Sync + 'static) -> &Self {
    self.after_hook(PhaseHook::inline(f))
  }

  /// Registers an inline `around` hook. The first registered is the outermost.
  pub fn around<F>(&self, f: F) -> &Self
  where
    F: for<'n> Fn(Next<'n>, &Context, &Configuration) -> StepResult + Send + Sync + 'static,
  {
    self.around_hook(AroundHook::inline(f))
  }

  pub fn before_hook(&self, hook: PhaseHook) -> &Self {
    self.add_before_hooks([hook])
  }

  pub fn after_hook(&self, hook: PhaseHook) -> &Self {
    self.add_after_hooks([hook])
  }

  pub fn around_hook(&self, hook: AroundHook) -> &Self {
    self.add_around_hooks([hook])
  }

  /// Registers several `before` hooks at once, keeping their order.
  pub fn add_before_hooks(&self, hooks: impl IntoIterator<Item = PhaseHook>) -> &Self {
    let mut own = self.own_hooks().write();
    for hook in hooks {
      event!(Level::DEBUG, step_type = %self.name(), phase = %HookPhase::Before, label = %hook.label(), kind = ?hook.kind(), "Registering hook.");
      own.push_before(hook);
    }
    self
  }

  /// Registers several `after` hooks at once, keeping their order.
  pub fn add_after_hooks(&self, hooks: impl IntoIterator<Item = PhaseHook>) -> &Self {
    let mut own = self.own_hooks().write();
    for hook in hooks {
      event!(Level::DEBUG, step_type = %self.name(), phase = %HookPhase::After, label = %hook.label(), kind = ?hook.kind(), "Registering hook.");
      own.push_after(hook);
    }
    self
  }

  /// Registers several `around` hooks at once. The first of them ends up
  /// outermost among them.
  pub fn add_around_hooks(&self, hooks: impl IntoIterator<Item = AroundHook>) -> &Self {
    let mut own = self.own_hooks().write();
    for hook in hooks {
      event!(Level::DEBUG, step_type = %self.name(), phase = %HookPhase::Around, label = %hook.label(), kind = ?hook.kind(), "Registering hook.");
      own.push_around(hook);
    }
    self
  }

  /// The hooks this type runs: everything inherited from its ancestors
  /// followed by its own registrations.
  pub fn hooks(&self) -> HookRegistry {
    let mut effective = match self.parent() {
      Some(parent) => parent.hooks(),
      None => HookRegistry::new(),
    };
    effective.extend_from(&self.own_hooks().read());
    effective
  }
}
