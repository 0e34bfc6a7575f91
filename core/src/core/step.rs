// stepflow/src/core/step.rs

//! Defines the `Step` trait implemented by every unit of business logic.

use crate::core::config::Configuration;
use crate::core::context::Context;
use crate::core::control::StepResult;
use crate::error::StepflowError;
use std::any::Any;

/// Upcast to `Any`, used to resolve method hooks against the running step.
pub trait AsAny: Any {
  fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// Business logic of a step.
///
/// Implementors override [`call`](Step::call). A step type that never does is
/// abstract: performing it fails with `StepflowError::NotImplemented`.
pub trait Step: AsAny + Send + Sync {
  /// Runs the step against the shared context.
  ///
  /// Return `ctx.fail_now()` / `ctx.succeed_now()` (or propagate them with
  /// `?`) to end the whole invocation early.
  fn call(&self, ctx: &Context, config: &Configuration) -> StepResult {
    let _ = (ctx, config);
    Err(StepflowError::NotImplemented {
      step: std::any::type_name::<Self>().to_string(),
    })
  }
}
