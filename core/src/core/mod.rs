pub mod attributes;
pub mod config;
pub mod context;
pub mod control;
pub mod step;

pub use attributes::AttributeStore;
pub use config::{Configuration, Customizer, NestingFrame, NestingStack, PROCESSES_KEY};
pub use context::{Context, ContextState};
pub use control::{HookPhase, Next, StepResult};
pub use step::{AsAny, Step};
