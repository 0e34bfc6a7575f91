// stepflow/src/core/control.rs

//! Signals passed between a step, its hooks and the engine.

use crate::error::StepflowError;

/// Outcome of `Step::call` and of every hook.
///
/// `Err(StepflowError::EarlyExit(_))` is the early-exit signal produced by
/// `fail_now`/`succeed_now`; any other error is a real failure.
pub type StepResult = Result<(), StepflowError>;

/// Continuation handed to an around hook.
///
/// Running it executes everything nested inside the hook: the inner around
/// hooks, the before hooks, the step's `call` and the after hooks. A hook that
/// drops it without running it short-circuits all of that.
pub struct Next<'a> {
  inner: Box<dyn FnOnce() -> StepResult + 'a>,
}

impl<'a> Next<'a> {
  pub(crate) fn new(inner: impl FnOnce() -> StepResult + 'a) -> Self {
    Self { inner: Box::new(inner) }
  }

  pub fn run(self) -> StepResult {
    (self.inner)()
  }
}

impl std::fmt::Debug for Next<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Next").finish_non_exhaustive()
  }
}

/// Which list of a step type a hook is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
  Before,
  Around,
  After,
}

impl std::fmt::Display for HookPhase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      HookPhase::Before => write!(f, "before"),
      HookPhase::Around => write!(f, "around"),
      HookPhase::After => write!(f, "after"),
    }
  }
}
