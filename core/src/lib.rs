// stepflow/src/lib.rs

//! Stepflow: a small synchronous engine for composing steps into processes.
//!
//! Stepflow lets you:
//!  - Write units of business logic as [`Step`]s and declare them as [`StepType`]s.
//!  - Wrap them with `before`, `around` and `after` hooks, inherited by sub-types.
//!  - Chain step types into processes that share one [`Context`], each step
//!    getting its own copy of the process [`Configuration`].
//!  - End a whole invocation early with `fail_now` / `succeed_now`, from any
//!    depth of nested processes, and get the context back as a normal result.

pub mod core;
pub mod error;
pub mod pipeline;

// --- Re-exports for the Public API ---

pub use crate::core::attributes::AttributeStore;
pub use crate::core::config::{Configuration, Customizer, NestingFrame, NestingStack, PROCESSES_KEY};
pub use crate::core::context::{Context, ContextState};
pub use crate::core::control::{HookPhase, Next, StepResult};
pub use crate::core::step::Step;

pub use crate::pipeline::definition::StepType;
pub use crate::pipeline::execution::StepInstance;
pub use crate::pipeline::hooks::{AroundHook, AroundHookObject, HookKind, HookObject, HookRegistry, PhaseHook};
pub use crate::pipeline::process::{Process, ProcessBuilder, StepEntry};

pub use crate::error::{StepflowError, StepflowResult};

/*
    Core Workflow:
    1. Implement `Step` for each unit of business logic, overriding `call`.
    2. Declare step types: `StepType::of::<MyStep>("MyStep")`, or
       `StepType::new("MyStep", |config| ...)` to build from configuration.
    3. Register hooks: `.before(..)`, `.around(..)`, `.after(..)`, or the
       `_hook` variants for hook objects and step methods.
    4. Declare processes with `Process::builder("Name").step(&a).step_with(&b, |c| ..).build()`.
    5. Run: `step_type.instantiate(config)?.perform(input)?` returns the `Context`;
       check `is_success()` / `is_failure()` and read its attributes.
*/
