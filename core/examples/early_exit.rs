// stepflow/examples/early_exit.rs

use serde_json::json;
use stepflow::{Configuration, Context, Process, Step, StepResult, StepType, StepflowError};
use tracing::info;

struct Log(&'static str);

impl Step for Log {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    info!(step = self.0, "Executed");
    let mut log: Vec<String> = ctx.get_as("log").unwrap_or_default();
    log.push(self.0.to_string());
    ctx.set("log", log);
    Ok(())
  }
}

#[derive(Default)]
struct CheckStock;

impl Step for CheckStock {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    let quantity: u64 = ctx.get_as("quantity").unwrap_or_default();
    if quantity > 3 {
      info!(quantity, "Out of stock, failing the whole checkout");
      return ctx.fail_now_with(json!({ "error": "out of stock" }));
    }
    Ok(())
  }
}

fn log_step(name: &'static str) -> StepType {
  StepType::new(name, move |_config| Ok(Log(name)))
}

fn main() -> Result<(), StepflowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Early Exit Example ---");

  // The reservation process runs as one step of the checkout process.
  let reserve = Process::builder("Reserve")
    .step(&StepType::of::<CheckStock>("CheckStock"))
    .step(&log_step("reserve_items"))
    .build();

  let checkout = Process::builder("Checkout")
    .step(&log_step("open_session"))
    .step(&reserve)
    .step(&log_step("charge_card")) // Skipped when CheckStock fails
    .build();

  for quantity in [1, 5] {
    let ctx = checkout.perform((), json!({ "quantity": quantity }))?;
    info!(
      quantity,
      success = ctx.is_success(),
      log = ?ctx.get("log"),
      error = ?ctx.get("error"),
      "Checkout returned"
    );
  }
  Ok(())
}
