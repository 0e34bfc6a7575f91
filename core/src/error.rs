// stepflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::core::context::Context;

#[derive(Debug, Error)]
pub enum StepflowError {
  #[error("Key not found in configuration: {key}")]
  MissingKey { key: String },

  #[error("Value for key '{key}' could not be converted. Source: {source}")]
  InvalidValue {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Step '{step}' does not implement `call`")]
  NotImplemented { step: String },

  #[error("Hook method '{method}' expects a step of type {expected}")]
  HookTypeMismatch { method: String, expected: String },

  /// Raised by `fail_now`/`succeed_now` and carried with `?` up to the
  /// outermost `perform`, which turns it back into `Ok(context)`.
  /// Seeing it as a caller means no invocation was in charge of catching it.
  #[error("Early exit reached the caller (failure: {})", .0.is_failure())]
  EarlyExit(Context),

  #[error("Error in user-provided step or hook. Source: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl StepflowError {
  /// True for the early-exit signal, which is control flow rather than a failure.
  pub fn is_early_exit(&self) -> bool {
    matches!(self, StepflowError::EarlyExit(_))
  }
}

impl From<AnyhowError> for StepflowError {
  fn from(err: AnyhowError) -> Self {
    // A StepflowError that went through anyhow keeps its own identity so an
    // early exit or a missing key is never re-labelled as a handler error.
    match err.downcast::<StepflowError>() {
      Ok(inner) => inner,
      Err(err) => StepflowError::Handler { source: err },
    }
  }
}

pub type StepflowResult<T, E = StepflowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn anyhow_errors_become_handler_errors() {
    let err = StepflowError::from(anyhow::anyhow!("card declined"));
    match err {
      StepflowError::Handler { source } => assert_eq!(source.to_string(), "card declined"),
      other => panic!("expected Handler, got {:?}", other),
    }
  }

  #[test]
  fn wrapped_stepflow_errors_are_unwrapped() {
    let wrapped = anyhow::Error::new(StepflowError::MissingKey { key: "amount".into() });
    match StepflowError::from(wrapped) {
      StepflowError::MissingKey { key } => assert_eq!(key, "amount"),
      other => panic!("expected MissingKey, got {:?}", other),
    }
  }

  #[test]
  fn early_exit_is_identified() {
    let ctx = Context::new();
    ctx.fail();
    let err = StepflowError::EarlyExit(ctx);
    assert!(err.is_early_exit());
    assert_eq!(err.to_string(), "Early exit reached the caller (failure: true)");
    assert!(!StepflowError::NotImplemented { step: "Charge".into() }.is_early_exit());
  }
}
