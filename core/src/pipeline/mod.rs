// stepflow/src/pipeline/mod.rs

//! Step types, their hooks, processes, and the execution of all three.

pub mod definition;
pub mod execution;
pub mod hooks;
pub mod process;

pub use definition::{StepFactory, StepType};
pub use execution::StepInstance;
pub use hooks::{AroundHook, AroundHookObject, HookKind, HookObject, HookRegistry, PhaseHook};
pub use process::{Process, ProcessBuilder, StepEntry};
