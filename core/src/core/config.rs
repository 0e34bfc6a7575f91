// stepflow/src/core/config.rs

//! Per-step parameter bag and the nesting stack it carries between processes.

use crate::core::attributes::AttributeStore;
use crate::error::{StepflowError, StepflowResult};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{event, Level};

/// Reserved configuration key under which the nesting stack is exposed.
pub const PROCESSES_KEY: &str = "_processes";

/// Customizer run against a freshly built `Configuration`.
pub type Customizer = Arc<dyn Fn(&mut Configuration) + Send + Sync + 'static>;

/// Shared record of the processes currently performing in one invocation tree.
///
/// Clones share the same underlying sequence. A process pushes a frame on
/// entry and the returned [`NestingFrame`] pops it when dropped.
#[derive(Debug, Clone, Default)]
pub struct NestingStack(Arc<Mutex<Vec<String>>>);

impl NestingStack {
  pub fn new() -> Self {
    Self::default()
  }

  /// Pushes `process` and returns the guard that pops it again.
  #[must_use = "the frame is popped as soon as the guard is dropped"]
  pub fn push(&self, process: impl Into<String>) -> NestingFrame {
    let mut frames = self.0.lock();
    frames.push(process.into());
    NestingFrame {
      stack: self.clone(),
      depth: frames.len(),
    }
  }

  pub fn depth(&self) -> usize {
    self.0.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.lock().is_empty()
  }

  /// Names of the processes on the stack, outermost first.
  pub fn frames(&self) -> Vec<String> {
    self.0.lock().clone()
  }

  pub fn ptr_eq(&self, other: &NestingStack) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

/// Scoped membership of a process on a [`NestingStack`].
#[derive(Debug)]
pub struct NestingFrame {
  stack: NestingStack,
  depth: usize,
}

impl NestingFrame {
  /// Stack depth right after this frame was pushed; `1` means outermost.
  pub fn depth(&self) -> usize {
    self.depth
  }

  pub fn is_outermost(&self) -> bool {
    self.depth == 1
  }
}

impl Drop for NestingFrame {
  fn drop(&mut self) {
    self.stack.0.lock().pop();
  }
}

/// Configuration of one step or process instance.
///
/// Building a `Configuration` from another copies its attributes; later writes
/// to either side stay private. The nesting stack is the exception and is
/// shared by every configuration derived from the same root.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
  attributes: AttributeStore,
  processes: NestingStack,
}

impl Configuration {
  pub fn new() -> Self {
    Self::default()
  }

  /// Copies `seed`, then lets `customizer` declare further attributes.
  ///
  /// ```
  /// use stepflow::Configuration;
  ///
  /// let config = Configuration::build((), |c| {
  ///   c.set("timeout", 30).set("name", "Irvin");
  /// });
  /// assert_eq!(config.fetch("timeout").unwrap(), 30);
  /// ```
  pub fn build(seed: impl Into<Configuration>, customizer: impl FnOnce(&mut Configuration)) -> Self {
    let mut config = seed.into();
    customizer(&mut config);
    config
  }

  /// The configuration a process hands to one of its steps.
  pub fn derive(parent: &Configuration, customizer: Option<&Customizer>) -> Self {
    let mut config = parent.clone();
    if let Some(customize) = customizer {
      customize(&mut config);
    }
    config
  }

  /// Reads `key`. The reserved [`PROCESSES_KEY`] reads as the stack's frames.
  pub fn get(&self, key: &str) -> Option<Value> {
    if key == PROCESSES_KEY {
      return Some(Value::from(self.processes.frames()));
    }
    self.attributes.get(key).cloned()
  }

  /// Writes `key`, returning `self` so declarations can be chained.
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
    let key = key.into();
    if key == PROCESSES_KEY {
      event!(Level::WARN, key = PROCESSES_KEY, "Ignoring write to reserved configuration key.");
      return self;
    }
    self.attributes.set(key, value);
    self
  }

  pub fn merge(&mut self, other: impl Into<AttributeStore>) -> &mut Self {
    let mut incoming = other.into();
    if incoming.remove(PROCESSES_KEY).is_some() {
      event!(Level::WARN, key = PROCESSES_KEY, "Ignoring write to reserved configuration key.");
    }
    self.attributes.merge(incoming);
    self
  }

  pub fn contains_key(&self, key: &str) -> bool {
    key == PROCESSES_KEY || self.attributes.contains_key(key)
  }

  /// Returns the value for `key`, failing with `MissingKey` when it is absent
  /// or `null`.
  pub fn fetch(&self, key: &str) -> StepflowResult<Value> {
    self.present(key).ok_or_else(|| StepflowError::MissingKey { key: key.to_string() })
  }

  /// Like [`fetch`](Self::fetch) but hands absent keys to `fallback`.
  pub fn fetch_or_else(&self, key: &str, fallback: impl FnOnce(&str) -> Value) -> Value {
    self.present(key).unwrap_or_else(|| fallback(key))
  }

  pub fn fetch_as<T: DeserializeOwned>(&self, key: &str) -> StepflowResult<T> {
    let value = self.fetch(key)?;
    serde_json::from_value(value).map_err(|source| StepflowError::InvalidValue {
      key: key.to_string(),
      source,
    })
  }

  pub fn attributes(&self) -> &AttributeStore {
    &self.attributes
  }

  pub fn processes(&self) -> &NestingStack {
    &self.processes
  }

  /// Replaces the nesting stack, e.g. to run a process as part of an
  /// invocation tree managed elsewhere.
  pub fn with_processes(mut self, processes: NestingStack) -> Self {
    self.processes = processes;
    self
  }

  fn present(&self, key: &str) -> Option<Value> {
    self.get(key).filter(|value| !value.is_null())
  }
}

impl From<AttributeStore> for Configuration {
  fn from(attributes: AttributeStore) -> Self {
    let mut config = Configuration::default();
    config.merge(attributes);
    config
  }
}

impl From<Map<String, Value>> for Configuration {
  fn from(map: Map<String, Value>) -> Self {
    AttributeStore::from(map).into()
  }
}

impl From<Value> for Configuration {
  fn from(value: Value) -> Self {
    AttributeStore::from(value).into()
  }
}

impl From<&Configuration> for Configuration {
  fn from(config: &Configuration) -> Self {
    config.clone()
  }
}

impl From<()> for Configuration {
  fn from(_: ()) -> Self {
    Configuration::default()
  }
}
