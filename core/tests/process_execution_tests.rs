// tests/process_execution_tests.rs
mod common;

use common::*;
use serde_json::json;
use stepflow::{Configuration, Context, NestingStack, Process, Step, StepResult, StepType, StepflowError, PROCESSES_KEY};

#[test]
fn test_process_runs_steps_in_declaration_order() {
  setup_tracing();
  let process = Process::builder("Ordered")
    .step(&mark("step1"))
    .step(&mark("step2"))
    .step(&mark("step3"))
    .build();

  let ctx = process.perform((), ()).unwrap();

  assert_eq!(trail(&ctx), vec!["step1", "step2", "step3"]);
  assert!(ctx.is_success());
}

#[test]
fn test_steps_lists_entries_with_their_customizers() {
  setup_tracing();
  let step1 = mark("step1");
  let step2 = mark("step2");
  let process = Process::builder("Listed")
    .step(&step1)
    .step_with(&step2, |_config| {})
    .build();

  let steps = process.steps();
  assert_eq!(steps.len(), 2);
  assert!(steps[0].step_type().ptr_eq(&step1));
  assert!(!steps[0].has_customizer());
  assert!(steps[1].step_type().ptr_eq(&step2));
  assert!(steps[1].has_customizer());
  assert!(process.is_process());
  assert!(step1.steps().is_empty());
}

#[test]
fn test_process_without_steps_completes() {
  setup_tracing();
  let ctx = Process::builder("Empty").build().perform((), ()).unwrap();
  assert!(ctx.is_success());
  assert!(trail(&ctx).is_empty());
}

struct ReadConfig;

impl Step for ReadConfig {
  fn call(&self, ctx: &Context, config: &Configuration) -> StepResult {
    ctx.set("name", config.fetch("name")?);
    ctx.set("role", config.fetch_or_else("role", |_key| json!("guest")));
    Ok(())
  }
}

#[test]
fn test_each_step_gets_a_customized_copy_of_the_process_configuration() {
  setup_tracing();
  let read = StepType::new("ReadConfig", |_config| Ok(ReadConfig));
  let process = Process::builder("Configured")
    .step(&read)
    .step_with(&read, |c| {
      c.set("name", "Ada").set("role", "admin");
    })
    .build();

  let instance = process.instantiate(json!({ "name": "Irvin" })).unwrap();
  let ctx = Context::new();
  let observed = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
  {
    let observed = observed.clone();
    read.after(move |ctx, _config| {
      observed.lock().push((ctx.get("name"), ctx.get("role")));
      Ok(())
    });
  }

  instance.perform(&ctx).unwrap();

  assert_eq!(
    *observed.lock(),
    vec![
      (Some(json!("Irvin")), Some(json!("guest"))),
      (Some(json!("Ada")), Some(json!("admin"))),
    ]
  );
  assert_eq!(instance.config().fetch("name").unwrap(), json!("Irvin"));
}

#[test]
fn test_process_shares_one_context_across_steps() {
  setup_tracing();
  let writer = StepType::new("Writer", |_config| Ok(Mark("writer")));
  writer.after(|ctx, _config| {
    ctx.set("counter", 10);
    Ok(())
  });
  let reader = StepType::new("Reader", |_config| Ok(Mark("reader")));
  reader.before(|ctx, _config| {
    let counter: i64 = ctx.get_as("counter").unwrap_or_default();
    ctx.set("counter", counter + 5);
    Ok(())
  });

  let process = Process::builder("Shared").step(&writer).step(&reader).build();
  let initial = Context::build(json!({ "counter": 0 }));
  let ctx = process.perform((), &initial).unwrap();

  assert!(ctx.ptr_eq(&initial));
  assert_eq!(ctx.get("counter"), Some(json!(15)));
}

#[test]
fn test_fail_now_stops_the_process_and_is_absorbed() {
  setup_tracing();
  let process = Process::builder("Failing")
    .step(&failing("S1"))
    .step(&mark("S2"))
    .build();
  process.after(|ctx, _config| {
    record(ctx, "process after");
    Ok(())
  });

  let ctx = process.perform((), ()).unwrap();

  assert_eq!(trail(&ctx), vec!["S1"]);
  assert_eq!(ctx.get("x"), Some(json!(1)));
  assert!(ctx.is_failure());
}

#[test]
fn test_succeed_now_stops_the_process_successfully() {
  setup_tracing();
  let process = Process::builder("Succeeding")
    .step(&mark("S1"))
    .step(&succeeding("S2"))
    .step(&mark("S3"))
    .build();

  let ctx = process.perform((), ()).unwrap();

  assert_eq!(trail(&ctx), vec!["S1", "S2"]);
  assert_eq!(ctx.get("x"), Some(json!(1)));
  assert!(ctx.is_success());
}

#[test]
fn test_nested_process_early_exit_unwinds_to_the_outermost_process() {
  setup_tracing();
  let inner = Process::builder("Inner")
    .step(&mark("inner 1"))
    .step(&failing("inner 2"))
    .step(&mark("inner 3"))
    .build();
  inner.after(|ctx, _config| {
    record(ctx, "inner after");
    Ok(())
  });

  let outer = Process::builder("Outer")
    .step(&mark("outer 1"))
    .step(&inner)
    .step(&mark("outer 3"))
    .build();
  outer.around(|next, ctx, _config| {
    record(ctx, "outer around in");
    next.run()?;
    record(ctx, "outer around out");
    Ok(())
  });

  let instance = outer.instantiate(()).unwrap();
  let ctx = instance.perform(()).unwrap();

  assert_eq!(
    trail(&ctx),
    vec!["outer around in", "outer 1", "inner 1", "inner 2"]
  );
  assert!(ctx.is_failure());
  assert!(instance.config().processes().is_empty());
}

struct InspectStack;

impl Step for InspectStack {
  fn call(&self, ctx: &Context, config: &Configuration) -> StepResult {
    ctx.set("depth", config.processes().depth());
    ctx.set("frames", config.get(PROCESSES_KEY).unwrap_or_default());
    Ok(())
  }
}

#[test]
fn test_process_pushes_itself_on_the_nesting_stack_while_running() {
  setup_tracing();
  let inspect = StepType::new("InspectStack", |_config| Ok(InspectStack));
  let inner = Process::builder("Inner").step(&inspect).build();
  let outer = Process::builder("Outer").step(&inner).build();

  let instance = outer.instantiate(()).unwrap();
  let ctx = instance.perform(()).unwrap();

  assert_eq!(ctx.get("depth"), Some(json!(2)));
  assert_eq!(ctx.get("frames"), Some(json!(["Outer", "Inner"])));
  assert!(instance.config().processes().is_empty());
}

#[test]
fn test_process_called_from_another_invocation_does_not_absorb_early_exit() {
  setup_tracing();
  let process = Process::builder("Nested").step(&failing("S1")).build();

  let stack = NestingStack::new();
  let _caller = stack.push("Caller");
  let config = Configuration::new().with_processes(stack.clone());

  match process.perform(config, ()) {
    Err(StepflowError::EarlyExit(ctx)) => {
      assert!(ctx.is_failure());
      assert_eq!(ctx.get("x"), Some(json!(1)));
    }
    other => panic!("Expected EarlyExit, got {:?}", other),
  }
  assert_eq!(stack.frames(), vec!["Caller"]);
}

#[test]
fn test_nesting_stack_is_unwound_after_errors() {
  setup_tracing();
  let inner = Process::builder("Inner").step(&exploding("boom")).build();
  let outer = Process::builder("Outer").step(&inner).step(&mark("never")).build();

  let instance = outer.instantiate(()).unwrap();
  let result = instance.perform(());

  assert!(matches!(result, Err(StepflowError::Handler { .. })));
  assert!(instance.config().processes().is_empty());
}

#[test]
fn test_process_instances_can_be_performed_repeatedly() {
  setup_tracing();
  let process = Process::builder("Repeat").step(&failing("S1")).build();
  let instance = process.instantiate(()).unwrap();

  let first = instance.perform(()).unwrap();
  let second = instance.perform(()).unwrap();

  assert!(!first.ptr_eq(&second));
  assert!(first.is_failure() && second.is_failure());
}

#[test]
fn test_swallowed_early_exit_still_skips_remaining_process_steps() {
  setup_tracing();
  let first = failing("S1");
  first.around(|next, _ctx, _config| {
    let _ = next.run();
    Ok(())
  });
  let process = Process::builder("Swallowing").step(&first).step(&mark("S2")).build();

  let ctx = process.perform((), ()).unwrap();

  assert_eq!(trail(&ctx), vec!["S1"]);
  assert!(ctx.is_failure());
}

struct Pause(u64);

impl Step for Pause {
  fn call(&self, ctx: &Context, _config: &Configuration) -> StepResult {
    std::thread::sleep(std::time::Duration::from_millis(self.0));
    record(ctx, "paused");
    Ok(())
  }
}

#[test]
fn test_one_instance_can_be_performed_from_several_threads() {
  setup_tracing();
  let pause = StepType::new("Pause", |config| Ok(Pause(config.fetch_as("pause_ms")?)));
  let process = Process::builder("Concurrent")
    .step(&pause)
    .step(&failing("S2"))
    .step(&mark("never"))
    .build();
  let instance = std::sync::Arc::new(process.instantiate(json!({ "pause_ms": 100 })).unwrap());

  let handles: Vec<_> = (0..4)
    .map(|_| {
      let instance = instance.clone();
      std::thread::spawn(move || instance.perform(()))
    })
    .collect();

  for handle in handles {
    let ctx = handle.join().unwrap().unwrap();
    assert_eq!(trail(&ctx), vec!["paused", "S2"]);
    assert!(ctx.is_failure());
  }
  assert!(instance.config().processes().is_empty());
}
