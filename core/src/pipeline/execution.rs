// stepflow/src/pipeline/execution.rs

//! Contains `StepInstance::perform()` and the composition of a step type's
//! hooks around its business logic.

use crate::core::config::{Configuration, NestingStack};
use crate::core::context::Context;
use crate::core::control::{Next, StepResult};
use crate::core::step::Step;
use crate::error::{StepflowError, StepflowResult};
use crate::pipeline::definition::StepType;
use crate::pipeline::hooks::{AroundHook, HookRegistry};
use std::cell::Cell;
use tracing::{event, instrument, Level};

/// A configured step, ready to be performed.
pub struct StepInstance {
  step_type: StepType,
  config: Configuration,
  logic: Box<dyn Step>,
}

impl StepInstance {
  pub(crate) fn new(step_type: StepType, config: Configuration, logic: Box<dyn Step>) -> Self {
    Self {
      step_type,
      config,
      logic,
    }
  }

  pub fn name(&self) -> &str {
    self.step_type.name()
  }

  pub fn step_type(&self) -> &StepType {
    &self.step_type
  }

  pub fn config(&self) -> &Configuration {
    &self.config
  }

  /// The business logic, for callers that know its concrete type.
  pub fn logic(&self) -> &dyn Step {
    self.logic.as_ref()
  }

  /// Runs the step against `input` and returns the shared context.
  ///
  /// `input` may be an existing [`Context`] (it is used as-is, which is how
  /// the steps of a process share one) or any attribute mapping, which starts
  /// a new one.
  ///
  /// The outermost invocation of a tree absorbs an early exit and returns the
  /// context normally. A process is outermost when it is the only one on its
  /// configuration's nesting stack; a plain step is outermost when that stack
  /// is empty. Any other invocation hands the early exit back as
  /// `Err(StepflowError::EarlyExit(_))` for its caller to propagate.
  /// Either way the context returned is the one this call built or reused.
  ///
  /// An instance whose nesting stack is empty runs each perform on a fresh
  /// stack, so one instance can be performed from several threads at once.
  ///
  /// Errors from user code are never caught here.
  #[instrument(
    name = "StepInstance::perform",
    skip_all,
    fields(step = %self.step_type.name(), process = self.step_type.is_process())
  )]
  pub fn perform(&self, input: impl Into<Context>) -> StepflowResult<Context> {
    let ctx = Context::build(input);

    // A top-level invocation gets a stack of its own so concurrent performs
    // of one instance never see each other's frames.
    let top_level;
    let config = if self.config.processes().is_empty() {
      top_level = self.config.clone().with_processes(NestingStack::new());
      &top_level
    } else {
      &self.config
    };
    let processes = config.processes();

    // Popped when dropped, on every return path below.
    let frame = self
      .step_type
      .is_process()
      .then(|| processes.push(self.step_type.name()));
    let outermost = match &frame {
      Some(frame) => frame.is_outermost(),
      None => processes.is_empty(),
    };
    event!(Level::DEBUG, outermost, depth = processes.depth(), "Perform starting.");

    let hooks = self.step_type.hooks();
    let outcome = run_chain(&hooks, self.logic.as_ref(), &ctx, config);
    drop(frame);

    match outcome {
      Ok(()) => {
        event!(Level::DEBUG, success = ctx.is_success(), "Perform completed.");
        Ok(ctx)
      }
      Err(StepflowError::EarlyExit(exited)) if outermost => {
        if !exited.ptr_eq(&ctx) {
          event!(Level::WARN, "Absorbed an early exit raised for another context.");
        }
        event!(Level::INFO, failure = ctx.is_failure(), "Early exit absorbed.");
        Ok(ctx)
      }
      Err(err @ StepflowError::EarlyExit(_)) => {
        event!(Level::DEBUG, "Early exit propagating to the enclosing invocation.");
        Err(err)
      }
      Err(err) => {
        event!(Level::ERROR, error = %err, "Perform failed.");
        Err(err)
      }
    }
  }
}

impl std::fmt::Debug for StepInstance {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepInstance")
      .field("step_type", &self.step_type)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

/// Runs `step` wrapped in `hooks`.
///
/// Around hooks nest in registration order, the first one outermost. Inside
/// the innermost one the before hooks run, then `call`, then the after hooks.
/// The first error or early exit stops the chain and travels back out through
/// whatever around hooks are still on the stack.
///
/// An early exit raised inside an around hook's `next` is re-raised once the
/// hook returns, whatever the hook returned. Hook code placed after
/// `next.run()` is only skipped when the hook propagates the result with `?`.
pub(crate) fn run_chain(hooks: &HookRegistry, step: &dyn Step, ctx: &Context, config: &Configuration) -> StepResult {
  run_around(hooks.around(), hooks, step, ctx, config)
}

fn run_around(
  remaining: &[AroundHook],
  hooks: &HookRegistry,
  step: &dyn Step,
  ctx: &Context,
  config: &Configuration,
) -> StepResult {
  let Some((hook, inner)) = remaining.split_first() else {
    return run_core(hooks, step, ctx, config);
  };
  event!(Level::TRACE, label = %hook.label(), depth = hooks.around().len() - remaining.len(), "Entering around hook.");

  let exit: Cell<Option<Context>> = Cell::new(None);
  let next = Next::new(|| {
    let result = run_around(inner, hooks, step, ctx, config);
    if let Err(StepflowError::EarlyExit(exited)) = &result {
      exit.set(Some(exited.clone()));
    }
    result
  });
  let result = hook.invoke(step, next, ctx, config);

  match exit.take() {
    Some(exited) => {
      if !matches!(result, Err(StepflowError::EarlyExit(_))) {
        event!(Level::WARN, label = %hook.label(), "Around hook did not propagate an early exit; re-raising it.");
      }
      Err(StepflowError::EarlyExit(exited))
    }
    None => result,
  }
}

fn run_core(hooks: &HookRegistry, step: &dyn Step, ctx: &Context, config: &Configuration) -> StepResult {
  for (index, hook) in hooks.before().iter().enumerate() {
    event!(Level::TRACE, index, label = %hook.label(), "Executing 'before' hook.");
    hook.invoke(step, ctx, config)?;
  }

  step.call(ctx, config)?;

  for (index, hook) in hooks.after().iter().enumerate() {
    event!(Level::TRACE, index, label = %hook.label(), "Executing 'after' hook.");
    hook.invoke(step, ctx, config)?;
  }
  Ok(())
}
