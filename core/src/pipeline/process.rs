// stepflow/src/pipeline/process.rs

//! Defines `Process`, the step whose logic is "run these steps, in order,
//! against one shared context", and the builder declaring process types.

use crate::core::config::{Configuration, Customizer};
use crate::core::context::Context;
use crate::core::control::StepResult;
use crate::core::step::Step;
use crate::error::StepflowResult;
use crate::pipeline::definition::{StepFactory, StepKind, StepType};
use std::sync::Arc;
use tracing::{event, span, Level};

/// One entry of a process: the step type to run and how to adjust the
/// configuration it inherits from the process.
#[derive(Clone)]
pub struct StepEntry {
  step_type: StepType,
  customizer: Option<Customizer>,
}

impl StepEntry {
  pub fn step_type(&self) -> &StepType {
    &self.step_type
  }

  pub fn has_customizer(&self) -> bool {
    self.customizer.is_some()
  }

  /// The configuration this entry's step receives inside a process
  /// configured with `parent`.
  pub fn configuration(&self, parent: &Configuration) -> Configuration {
    Configuration::derive(parent, self.customizer.as_ref())
  }
}

impl std::fmt::Debug for StepEntry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepEntry")
      .field("step_type", &self.step_type.name())
      .field("customized", &self.customizer.is_some())
      .finish()
  }
}

/// Business logic shared by every process type.
pub struct Process {
  entries: Arc<[StepEntry]>,
}

impl Process {
  /// Starts declaring a process type.
  ///
  /// ```
  /// use stepflow::{Configuration, Context, Process, Step, StepResult, StepType};
  ///
  /// #[derive(Default)]
  /// struct Reserve;
  ///
  /// impl Step for Reserve {
  ///   fn call(&self, ctx: &Context, config: &Configuration) -> StepResult {
  ///     ctx.set("reserved", config.fetch("quantity")?);
  ///     Ok(())
  ///   }
  /// }
  ///
  /// let checkout = Process::builder("Checkout")
  ///   .step_with(&StepType::of::<Reserve>("Reserve"), |c| {
  ///     c.set("quantity", 2);
  ///   })
  ///   .build();
  ///
  /// let ctx = checkout.perform((), ()).unwrap();
  /// assert_eq!(ctx.get("reserved").unwrap(), 2);
  /// ```
  pub fn builder(name: impl Into<String>) -> ProcessBuilder {
    ProcessBuilder {
      name: name.into(),
      entries: Vec::new(),
    }
  }

  pub fn entries(&self) -> &[StepEntry] {
    &self.entries
  }
}

impl Step for Process {
  fn call(&self, ctx: &Context, config: &Configuration) -> StepResult {
    for (step_index, entry) in self.entries.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "process_step",
        step_name = entry.step_type.name(),
        step_index
      );
      let _step_span_guard = step_span.enter();

      let step = entry.step_type.instantiate(entry.configuration(config))?;
      step.perform(ctx)?;
      event!(Level::DEBUG, "Step finished.");
    }
    Ok(())
  }
}

/// Declares the ordered steps of a process type.
#[derive(Debug)]
pub struct ProcessBuilder {
  name: String,
  entries: Vec<StepEntry>,
}

impl ProcessBuilder {
  /// Appends a step that runs with a copy of the process configuration.
  pub fn step(mut self, step_type: &StepType) -> Self {
    self.entries.push(StepEntry {
      step_type: step_type.clone(),
      customizer: None,
    });
    self
  }

  /// Appends a step whose configuration copy is adjusted by `customizer`.
  pub fn step_with(mut self, step_type: &StepType, customizer: impl Fn(&mut Configuration) + Send + Sync + 'static) -> Self {
    self.entries.push(StepEntry {
      step_type: step_type.clone(),
      customizer: Some(Arc::new(customizer)),
    });
    self
  }

  pub fn build(self) -> StepType {
    event!(Level::DEBUG, process = %self.name, num_steps = self.entries.len(), "Declaring process type.");
    let entries: Arc<[StepEntry]> = self.entries.into();
    let shared = Arc::clone(&entries);
    let factory: StepFactory = Arc::new(move |_config: &Configuration| -> StepflowResult<Box<dyn Step>> {
      Ok(Box::new(Process {
        entries: Arc::clone(&shared),
      }))
    });
    StepType::from_parts(self.name, None, factory, StepKind::Process(entries))
  }
}
