// stepflow/examples/basic_process.rs

use serde_json::json;
use stepflow::{Configuration, Context, Process, Step, StepResult, StepType, StepflowError};
use tracing::info;

// 1. Business logic for each step
#[derive(Default)]
struct LoadCart;

impl Step for LoadCart {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    ctx.set("items", json!([{ "sku": "tea", "price": 4 }, { "sku": "mug", "price": 9 }]));
    Ok(())
  }
}

struct ApplyDiscount {
  percent: u64,
}

impl Step for ApplyDiscount {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    let items: Vec<serde_json::Value> = ctx.get_as("items").unwrap_or_default();
    let total: u64 = items.iter().filter_map(|item| item["price"].as_u64()).sum();
    let discounted = total * (100 - self.percent) / 100;
    info!(total, discounted, "Discount applied");
    ctx.set("total", discounted);
    Ok(())
  }
}

fn main() -> Result<(), StepflowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Basic Process Example ---");

  // 2. Declare the step types
  let load_cart = StepType::of::<LoadCart>("LoadCart");
  let apply_discount = StepType::new("ApplyDiscount", |config| {
    Ok(ApplyDiscount {
      percent: config.fetch_as("percent")?,
    })
  });

  // 3. Hooks wrap every run of a step type
  apply_discount.around(|next, ctx, config| {
    info!(percent = %config.fetch_or_else("percent", |_| json!(0)), "Applying discount...");
    next.run()?;
    info!(total = ?ctx.get("total"), "...discount done");
    Ok(())
  });

  // 4. Declare the process; the second entry customizes its own config copy
  let checkout = Process::builder("Checkout")
    .step(&load_cart)
    .step_with(&apply_discount, |c| {
      c.set("percent", 10);
    })
    .build();

  // 5. Run it
  let ctx = checkout.perform((), json!({ "customer": "Irvin" }))?;
  info!(success = ctx.is_success(), total = ?ctx.get("total"), customer = ?ctx.get("customer"), "Checkout finished");
  assert_eq!(ctx.get("total"), Some(json!(11)));
  Ok(())
}
