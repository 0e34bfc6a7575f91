// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use serde_json::json;
use stepflow::{Configuration, Context, Step, StepResult, StepType};
use tracing::Level;

// --- Trail helpers: every test step and hook appends its label to the
// "trail" attribute of the shared context, so ordering is read back from it.

pub fn record(ctx: &Context, entry: impl Into<String>) {
  let mut state = ctx.write();
  let mut trail: Vec<String> = state.attributes.get_as("trail").unwrap_or_default();
  trail.push(entry.into());
  state.attributes.set("trail", trail);
}

pub fn trail(ctx: &Context) -> Vec<String> {
  ctx.get_as("trail").unwrap_or_default()
}

// --- Common Step Types ---

/// Records its label and returns normally.
pub struct Mark(pub &'static str);

impl Step for Mark {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    record(ctx, self.0);
    Ok(())
  }
}

/// Records its label, then fails the invocation with `{ "x": 1 }`.
pub struct FailNow(pub &'static str);

impl Step for FailNow {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    record(ctx, self.0);
    ctx.fail_now_with(json!({ "x": 1 }))?;
    record(ctx, "unreachable");
    Ok(())
  }
}

/// Records its label, then succeeds the invocation early with `{ "x": 1 }`.
pub struct SucceedNow(pub &'static str);

impl Step for SucceedNow {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    record(ctx, self.0);
    ctx.succeed_now_with(json!({ "x": 1 }))
  }
}

/// Records its label, then raises a business error.
pub struct Explode(pub &'static str);

impl Step for Explode {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    record(ctx, self.0);
    Err(anyhow::anyhow!("{} exploded", self.0).into())
  }
}

pub fn mark(label: &'static str) -> StepType {
  StepType::new(label, move |_config| Ok(Mark(label)))
}

pub fn failing(label: &'static str) -> StepType {
  StepType::new(label, move |_config| Ok(FailNow(label)))
}

pub fn succeeding(label: &'static str) -> StepType {
  StepType::new(label, move |_config| Ok(SucceedNow(label)))
}

pub fn exploding(label: &'static str) -> StepType {
  StepType::new(label, move |_config| Ok(Explode(label)))
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::TRACE)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
