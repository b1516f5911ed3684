//! Runner and failure-injection properties, checked with small test blocks.

use async_trait::async_trait;
use fourtwo_core::failure::{MISSING_TOOL_MARKER, NOISY_INPUT_MARKER, STALE_MEMORY_MARKER};
use fourtwo_core::{
    apply_failures, create_initial_context, run_pipeline, Block, BlockError, ExecutionContext,
    FailureConfig, PipelineConfig, Stage, TOOL_SEND_NOTIFICATION,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Appends its stage to `state.trail`, optionally after sleeping.
struct Trail {
    stage: Stage,
    delay_ms: u64,
}

#[async_trait]
impl Block for Trail {
    fn id(&self) -> &'static str {
        "test.trail"
    }
    fn stage(&self) -> Stage {
        self.stage
    }
    fn label(&self) -> &'static str {
        "Trail"
    }
    fn description(&self) -> &'static str {
        "Records the order stages ran in"
    }
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        let trail = ctx
            .state
            .entry("trail")
            .or_insert_with(|| json!([]));
        if let Some(items) = trail.as_array_mut() {
            items.push(json!(self.stage.as_str()));
        }
        ctx.push_log(format!("{}_TRAIL", self.stage.tag()), json!({ "stage": self.stage }));
        Ok(())
    }
}

struct Explodes;

#[async_trait]
impl Block for Explodes {
    fn id(&self) -> &'static str {
        "test.explodes"
    }
    fn stage(&self) -> Stage {
        Stage::Reasoning
    }
    fn label(&self) -> &'static str {
        "Explodes"
    }
    fn description(&self) -> &'static str {
        "Always fails"
    }
    async fn run(&self, _ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        Err(BlockError::ExecutionFailed("sensor model diverged".to_string()))
    }
}

fn trail(stage: Stage, delay_ms: u64) -> Arc<dyn Block> {
    Arc::new(Trail { stage, delay_ms })
}

fn full_config() -> PipelineConfig {
    Stage::ALL
        .into_iter()
        .fold(PipelineConfig::new(), |cfg, s| cfg.with(trail(s, 0)))
}

fn marker_steps(ctx: &ExecutionContext) -> Vec<String> {
    ctx.log
        .iter()
        .map(|e| e.step.clone())
        .filter(|s| s.starts_with("START_") || s.starts_with("END_"))
        .collect()
}

// =============================================================================
// Ordering and determinism
// =============================================================================

#[tokio::test]
async fn test_markers_follow_stage_order() {
    let ctx = run_pipeline(&full_config(), create_initial_context(json!({}))).await;

    let expected: Vec<String> = Stage::ALL
        .iter()
        .flat_map(|s| [s.start_marker(), s.end_marker()])
        .collect();
    assert_eq!(marker_steps(&ctx), expected);
    assert_eq!(
        ctx.state["trail"],
        json!(["perception", "reasoning", "planning", "execution"])
    );
}

#[tokio::test]
async fn test_async_blocks_do_not_reorder_stages() {
    // Earlier stages sleep longer; sequencing must still hold.
    let config = PipelineConfig::new()
        .with(trail(Stage::Perception, 30))
        .with(trail(Stage::Reasoning, 20))
        .with(trail(Stage::Planning, 0))
        .with(trail(Stage::Execution, 10));

    let ctx = run_pipeline(&config, create_initial_context(json!({}))).await;
    assert_eq!(
        ctx.state["trail"],
        json!(["perception", "reasoning", "planning", "execution"])
    );
}

#[tokio::test]
async fn test_identical_runs_produce_identical_traces() {
    let input = json!({ "steps": 5000, "heartRate": [100, 110] });
    let failures = FailureConfig::none().noisy_input().stale_memory();

    let a = run_pipeline(
        &full_config(),
        apply_failures(&create_initial_context(input.clone()), &failures),
    )
    .await;
    let b = run_pipeline(
        &full_config(),
        apply_failures(&create_initial_context(input), &failures),
    )
    .await;

    assert_eq!(a.log.len(), b.log.len());
    for (left, right) in a.log.iter().zip(&b.log) {
        assert_eq!(left.step, right.step);
        assert_eq!(left.data, right.data);
    }
    assert_eq!(a.trace_digest(), b.trace_digest());
}

// =============================================================================
// Fail-fast
// =============================================================================

#[tokio::test]
async fn test_missing_stage_stops_the_run() {
    for missing in Stage::ALL {
        let mut config = full_config();
        config.unbind(missing);

        let ctx = run_pipeline(&config, create_initial_context(json!({}))).await;

        let last = ctx.log.last().unwrap();
        assert_eq!(last.step, missing.error_marker(), "missing {}", missing);
        assert_eq!(ctx.success, Some(false));

        for later in Stage::ALL.into_iter().filter(|s| *s > missing) {
            assert!(
                ctx.log.iter().all(|e| !e.step.contains(later.tag())),
                "{} appeared after missing {}",
                later,
                missing
            );
        }
    }
}

#[tokio::test]
async fn test_block_error_becomes_error_entry() {
    let config = full_config().with(Arc::new(Explodes));

    let ctx = run_pipeline(&config, create_initial_context(json!({}))).await;

    let last = ctx.log.last().unwrap();
    assert_eq!(last.step, "ERROR_REASONING");
    assert_eq!(last.data["blockId"], json!("test.explodes"));
    assert_eq!(last.data["code"], json!("BLOCK/EXEC"));
    assert_eq!(last.data["error"], json!("sensor model diverged"));
    assert_eq!(ctx.success, Some(false));
    assert!(ctx.log.iter().all(|e| !e.step.contains("PLANNING")));
}

/// Indexes into an empty sample list.
struct EmptyIndex;

#[async_trait]
impl Block for EmptyIndex {
    fn id(&self) -> &'static str {
        "test.empty_index"
    }
    fn stage(&self) -> Stage {
        Stage::Perception
    }
    fn label(&self) -> &'static str {
        "Empty Index"
    }
    fn description(&self) -> &'static str {
        "Reads the first of zero samples"
    }
    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError> {
        let samples: Vec<i64> = Vec::new();
        ctx.state.insert("first".into(), json!(samples[0]));
        Ok(())
    }
}

#[tokio::test]
async fn test_block_panic_becomes_error_entry() {
    let config = full_config().with(Arc::new(EmptyIndex));

    let handle = tokio::spawn(async move {
        run_pipeline(&config, create_initial_context(json!({}))).await
    });
    let ctx = handle.await.expect("runner must not unwind");

    let last = ctx.log.last().unwrap();
    assert_eq!(last.step, "ERROR_PERCEPTION");
    assert_eq!(last.data["blockId"], json!("test.empty_index"));
    assert_eq!(last.data["code"], json!("BLOCK/PANIC"));
    assert!(last.data["error"]
        .as_str()
        .unwrap()
        .contains("index out of bounds"));
    assert_eq!(ctx.success, Some(false));
    assert_eq!(ctx.log.len(), 2);
}

// =============================================================================
// Failure injection
// =============================================================================

#[test]
fn test_apply_failures_leaves_base_untouched() {
    let mut base = create_initial_context(json!({ "steps": 5000, "heartRate": [100, 110, 120, 130] }));
    base.state.insert("currentStreak".into(), json!(3));
    base.push_log("SEEDED", json!({}));
    let before = base.snapshot();
    let tools_before = base.tools.names().len();

    let all = FailureConfig::none()
        .noisy_input()
        .missing_tool(TOOL_SEND_NOTIFICATION)
        .stale_memory();
    let _ = apply_failures(&base, &all);

    assert_eq!(base.snapshot(), before);
    assert_eq!(base.tools.names().len(), tools_before);
    assert!(base.has_tool(TOOL_SEND_NOTIFICATION));
}

#[test]
fn test_noise_is_exact() {
    let base = create_initial_context(json!({ "steps": 5000, "heartRate": [100, 110, 120, 130] }));
    let ctx = apply_failures(&base, &FailureConfig::none().noisy_input());
    assert_eq!(ctx.input["heartRate"], json!([115, 95, 135, 115]));
    assert_eq!(ctx.input["steps"], json!(4200));

    let low = create_initial_context(json!({ "steps": 500 }));
    let ctx = apply_failures(&low, &FailureConfig::none().noisy_input());
    assert_eq!(ctx.input["steps"], json!(0));
}

#[test]
fn test_missing_tool_removes_the_key() {
    let base = create_initial_context(json!({}));
    let ctx = apply_failures(&base, &FailureConfig::none().missing_tool(TOOL_SEND_NOTIFICATION));
    assert!(!ctx.tools.names().contains(&TOOL_SEND_NOTIFICATION));
    assert_eq!(ctx.log.len(), 1);
    assert_eq!(ctx.log[0].step, MISSING_TOOL_MARKER);
    assert_eq!(ctx.log[0].data["tool"], json!(TOOL_SEND_NOTIFICATION));
}

#[test]
fn test_stale_memory_empties_state() {
    let mut base = create_initial_context(json!({}));
    base.state.insert("plan".into(), json!("rest"));
    base.state.insert("streak".into(), json!(4));
    let ctx = apply_failures(&base, &FailureConfig::none().stale_memory());
    assert_eq!(ctx.state.len(), 0);
    assert_eq!(base.state.len(), 2);
}

#[test]
fn test_all_failures_compose() {
    let mut base = create_initial_context(json!({ "steps": 5000, "heartRate": [100, 110, 120, 130] }));
    base.state.insert("plan".into(), json!("rest"));

    let ctx = apply_failures(
        &base,
        &FailureConfig::none()
            .noisy_input()
            .missing_tool(TOOL_SEND_NOTIFICATION)
            .stale_memory(),
    );

    assert_eq!(ctx.input["heartRate"], json!([115, 95, 135, 115]));
    assert_eq!(ctx.input["steps"], json!(4200));
    assert!(!ctx.has_tool(TOOL_SEND_NOTIFICATION));
    assert!(ctx.state.is_empty());

    let tags: Vec<_> = ctx.log.iter().map(|e| e.step.as_str()).collect();
    assert_eq!(tags, vec![NOISY_INPUT_MARKER, MISSING_TOOL_MARKER, STALE_MEMORY_MARKER]);
    assert!(ctx.log.iter().all(|e| e.is_injection()));
}
