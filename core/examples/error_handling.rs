// stepflow/examples/error_handling.rs

use anyhow::Context as _;
use stepflow::{Configuration, Context, Process, Step, StepResult, StepType, StepflowError};
use tracing::{error, info};

// A business error raised by a step. It reaches the caller untouched.
#[derive(Debug, thiserror::Error)]
enum PaymentError {
  #[error("card declined: {0}")]
  Declined(String),
}

struct Charge {
  card: String,
}

impl Step for Charge {
  fn call(&self, _ctx: &Context, _config: &Configuration) -> StepResult {
    let result: Result<(), PaymentError> = Err(PaymentError::Declined(self.card.clone()));
    result.context("charging the customer")?;
    Ok(())
  }
}

fn main() {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Error Handling Example ---");

  let charge = StepType::new("Charge", |config| {
    Ok(Charge {
      card: config.fetch_as("card")?,
    })
  });
  let process = Process::builder("Pay").step(&charge).build();

  // Scenario 1: the step's factory cannot find its configuration
  match process.perform((), ()) {
    Err(StepflowError::MissingKey { key }) => info!(%key, "Missing configuration, as expected"),
    other => error!(?other, "Unexpected outcome"),
  }

  // Scenario 2: the step raises a business error
  match process.perform(serde_json::json!({ "card": "4242" }), ()) {
    Err(StepflowError::Handler { source }) => {
      info!(error = %source, "Business error surfaced to the caller");
      match source.downcast_ref::<PaymentError>() {
        Some(PaymentError::Declined(card)) => info!(%card, "Declined card"),
        None => error!("Lost the original error"),
      }
    }
    other => error!(?other, "Unexpected outcome"),
  }
}
