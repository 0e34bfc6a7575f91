// stepflow/src/core/context.rs

//! Defines `Context`, the result object shared by every step of one invocation.

use crate::core::attributes::AttributeStore;
use crate::core::control::StepResult;
use crate::error::StepflowError;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The data behind a [`Context`] handle.
#[derive(Debug, Default)]
pub struct ContextState {
  pub attributes: AttributeStore,
  failed: bool,
}

impl ContextState {
  pub fn is_failure(&self) -> bool {
    self.failed
  }
}

/// Shared, mutable result of one top-level `perform`.
///
/// `Context` is a handle: clones point at the same state, which is how every
/// step and process of an invocation observes the same attributes and outcome.
///
/// IMPORTANT: guards returned by [`read`](Self::read) and
/// [`write`](Self::write) must be dropped before calling back into the
/// engine (performing a step, `fail_now`, ...), or the next lock attempt will
/// deadlock.
#[derive(Debug, Clone, Default)]
pub struct Context(Arc<RwLock<ContextState>>);

impl Context {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns `input` itself when it already is a `Context`, otherwise a new
  /// context holding the given attributes.
  pub fn build(input: impl Into<Context>) -> Self {
    input.into()
  }

  pub fn read(&self) -> RwLockReadGuard<'_, ContextState> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, ContextState> {
    self.0.write()
  }

  pub fn get(&self, key: &str) -> Option<Value> {
    self.read().attributes.get(key).cloned()
  }

  pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    self.read().attributes.get_as(key)
  }

  pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
    self.write().attributes.set(key, value);
  }

  pub fn merge(&self, other: impl Into<AttributeStore>) {
    let other = other.into();
    self.write().attributes.merge(other);
  }

  /// Marks the context as failed without leaving the current step.
  pub fn fail(&self) {
    self.write().failed = true;
  }

  /// Marks the context as failed and exits the invocation.
  ///
  /// The returned error carries this context to the outermost `perform`,
  /// which hands it back to its caller as a normal result. Propagate it with
  /// `?` or return it directly.
  pub fn fail_now(&self) -> StepResult {
    self.fail_now_with(AttributeStore::new())
  }

  pub fn fail_now_with(&self, extra: impl Into<AttributeStore>) -> StepResult {
    let extra = extra.into();
    {
      let mut state = self.write();
      state.attributes.merge(extra);
      state.failed = true;
    }
    Err(StepflowError::EarlyExit(self.clone()))
  }

  /// Exits the invocation without touching the outcome.
  pub fn succeed_now(&self) -> StepResult {
    self.succeed_now_with(AttributeStore::new())
  }

  pub fn succeed_now_with(&self, extra: impl Into<AttributeStore>) -> StepResult {
    self.merge(extra);
    Err(StepflowError::EarlyExit(self.clone()))
  }

  pub fn is_failure(&self) -> bool {
    self.read().failed
  }

  pub fn is_success(&self) -> bool {
    !self.is_failure()
  }

  /// True when both handles point at the same context.
  pub fn ptr_eq(&self, other: &Context) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl From<&Context> for Context {
  fn from(ctx: &Context) -> Self {
    ctx.clone()
  }
}

impl From<AttributeStore> for Context {
  fn from(attributes: AttributeStore) -> Self {
    Context(Arc::new(RwLock::new(ContextState {
      attributes,
      failed: false,
    })))
  }
}

impl From<Map<String, Value>> for Context {
  fn from(map: Map<String, Value>) -> Self {
    AttributeStore::from(map).into()
  }
}

impl From<Value> for Context {
  fn from(value: Value) -> Self {
    AttributeStore::from(value).into()
  }
}

impl From<()> for Context {
  fn from(_: ()) -> Self {
    Context::new()
  }
}
