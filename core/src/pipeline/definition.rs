// stepflow/src/pipeline/definition.rs

//! Contains `StepType`, the runtime "class" of a step: its name, how an
//! instance is built from a configuration, its hooks and, for processes, its
//! ordered step list.

use crate::core::config::Configuration;
use crate::core::context::Context;
use crate::core::step::Step;
use crate::error::StepflowResult;
use crate::pipeline::execution::StepInstance;
use crate::pipeline::hooks::HookRegistry;
use crate::pipeline::process::StepEntry;
use parking_lot::RwLock;
use std::sync::Arc;

/// Builds the business logic of a step from its configuration.
pub type StepFactory = Arc<dyn Fn(&Configuration) -> StepflowResult<Box<dyn Step>> + Send + Sync + 'static>;

#[derive(Clone)]
pub(crate) enum StepKind {
  Task,
  Process(Arc<[StepEntry]>),
}

struct StepTypeInner {
  name: String,
  parent: Option<StepType>,
  factory: StepFactory,
  kind: StepKind,
  hooks: RwLock<HookRegistry>,
}

/// A declared kind of step.
///
/// `StepType` is a cheap handle; clones refer to the same definition, so hooks
/// registered through one clone are seen by all of them. Sub-types made with
/// [`subtype`](Self::subtype) inherit the hooks of their parent, including
/// ones the parent registers later, while their own registrations stay
/// private to them.
#[derive(Clone)]
pub struct StepType(Arc<StepTypeInner>);

impl StepType {
  /// Declares a step type whose instances are built by `factory`.
  ///
  /// ```
  /// use stepflow::{Configuration, Context, Step, StepResult, StepType};
  ///
  /// struct Greet {
  ///   name: String,
  /// }
  ///
  /// impl Step for Greet {
  ///   fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
  ///     ctx.set("greeting", format!("Hello, {}", self.name));
  ///     Ok(())
  ///   }
  /// }
  ///
  /// let greet = StepType::new("Greet", |config| {
  ///   Ok(Greet { name: config.fetch_as("name")? })
  /// });
  /// let ctx = greet.perform(serde_json::json!({ "name": "Irvin" }), ()).unwrap();
  /// assert_eq!(ctx.get("greeting").unwrap(), "Hello, Irvin");
  /// ```
  pub fn new<S, F>(name: impl Into<String>, factory: F) -> Self
  where
    S: Step,
    F: Fn(&Configuration) -> StepflowResult<S> + Send + Sync + 'static,
  {
    let factory: StepFactory = Arc::new(move |config: &Configuration| -> StepflowResult<Box<dyn Step>> {
      Ok(Box::new(factory(config)?) as Box<dyn Step>)
    });
    Self::from_parts(name.into(), None, factory, StepKind::Task)
  }

  /// Declares a step type for a `Default` step that ignores its configuration
  /// at construction time.
  pub fn of<S: Step + Default>(name: impl Into<String>) -> Self {
    Self::new(name, |_config| Ok(S::default()))
  }

  /// A sub-type with the same behavior, inheriting this type's hooks.
  pub fn subtype(&self, name: impl Into<String>) -> Self {
    Self::from_parts(
      name.into(),
      Some(self.clone()),
      Arc::clone(&self.0.factory),
      self.0.kind.clone(),
    )
  }

  /// A sub-type inheriting this type's hooks but running its own logic.
  pub fn subtype_with<S, F>(&self, name: impl Into<String>, factory: F) -> Self
  where
    S: Step,
    F: Fn(&Configuration) -> StepflowResult<S> + Send + Sync + 'static,
  {
    let factory: StepFactory = Arc::new(move |config: &Configuration| -> StepflowResult<Box<dyn Step>> {
      Ok(Box::new(factory(config)?) as Box<dyn Step>)
    });
    Self::from_parts(name.into(), Some(self.clone()), factory, StepKind::Task)
  }

  pub(crate) fn from_parts(name: String, parent: Option<StepType>, factory: StepFactory, kind: StepKind) -> Self {
    StepType(Arc::new(StepTypeInner {
      name,
      parent,
      factory,
      kind,
      hooks: RwLock::new(HookRegistry::new()),
    }))
  }

  pub fn name(&self) -> &str {
    &self.0.name
  }

  pub fn parent(&self) -> Option<&StepType> {
    self.0.parent.as_ref()
  }

  pub fn is_process(&self) -> bool {
    matches!(self.0.kind, StepKind::Process(_))
  }

  /// The ordered step list of a process type; empty for plain steps.
  pub fn steps(&self) -> &[StepEntry] {
    match &self.0.kind {
      StepKind::Process(entries) => &entries[..],
      StepKind::Task => &[],
    }
  }

  pub fn ptr_eq(&self, other: &StepType) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  pub(crate) fn own_hooks(&self) -> &RwLock<HookRegistry> {
    &self.0.hooks
  }

  /// Builds an instance from a configuration-like input.
  pub fn instantiate(&self, config: impl Into<Configuration>) -> StepflowResult<StepInstance> {
    let config = config.into();
    let logic = (self.0.factory)(&config)?;
    Ok(StepInstance::new(self.clone(), config, logic))
  }

  /// Instantiates with `config` and performs with `input` in one go.
  pub fn perform(&self, config: impl Into<Configuration>, input: impl Into<Context>) -> StepflowResult<Context> {
    self.instantiate(config)?.perform(input)
  }
}

impl std::fmt::Debug for StepType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepType")
      .field("name", &self.0.name)
      .field("parent", &self.0.parent.as_ref().map(StepType::name))
      .field("process", &self.is_process())
      .field("steps", &self.steps().len())
      .finish()
  }
}
