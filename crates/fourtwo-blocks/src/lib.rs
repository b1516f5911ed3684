//! FourTwo Blocks: health-coach reference blocks, two per stage.
//!
//! Each stage offers two interchangeable blocks so a learner can swap one
//! implementation for another and watch downstream behaviour change while
//! the shape of the pipeline stays fixed.
//!
//! # Pipeline Flow
//!
//! ```text
//! wearable input → Perception → Reasoning → Planning → Execution
//!                      ↓            ↓           ↓           ↓
//!                 steps, HR    activeToday     plan     notify/streak
//! ```
//!
//! Blocks share no static schema. They read and write named `state` keys
//! by convention (`steps`, `heartRateAvg`, `activeToday`, `plan`, ...).

mod execution;
mod perception;
mod planning;
mod reasoning;

pub use execution::{SendNotificationBlock, UpdateStreakBlock};
pub use perception::{ParseWearablesBlock, SmoothWearablesBlock};
pub use planning::{DailyPlannerBlock, SafetyPlannerBlock};
pub use reasoning::{RuleClassifierBlock, ThresholdBlock};

use fourtwo_core::{Block, BlockError, ExecutionContext, PipelineConfig, Stage};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;

/// Steps above this count as an active day
pub const ACTIVE_STEPS: f64 = 8000.0;
/// Average heart rate above this is treated as elevated
pub const ELEVATED_HR: f64 = 150.0;

static ALL_BLOCKS: Lazy<Vec<Arc<dyn Block>>> = Lazy::new(library);

fn library() -> Vec<Arc<dyn Block>> {
    vec![
        Arc::new(ParseWearablesBlock),
        Arc::new(SmoothWearablesBlock),
        Arc::new(ThresholdBlock),
        Arc::new(RuleClassifierBlock),
        Arc::new(DailyPlannerBlock),
        Arc::new(SafetyPlannerBlock),
        Arc::new(SendNotificationBlock),
        Arc::new(UpdateStreakBlock),
    ]
}

/// All eight blocks, grouped by stage in run-loop order
pub fn all_blocks() -> Vec<Arc<dyn Block>> {
    ALL_BLOCKS.clone()
}

pub fn blocks_for(stage: Stage) -> Vec<Arc<dyn Block>> {
    ALL_BLOCKS
        .iter()
        .filter(|b| b.stage() == stage)
        .cloned()
        .collect()
}

/// parse → threshold → daily → notify
pub fn default_pipeline() -> PipelineConfig {
    PipelineConfig::new()
        .with(Arc::new(ParseWearablesBlock))
        .with(Arc::new(ThresholdBlock))
        .with(Arc::new(DailyPlannerBlock))
        .with(Arc::new(SendNotificationBlock))
}

/// smooth → classifier → safety → streak
pub fn careful_pipeline() -> PipelineConfig {
    PipelineConfig::new()
        .with(Arc::new(SmoothWearablesBlock))
        .with(Arc::new(RuleClassifierBlock))
        .with(Arc::new(SafetyPlannerBlock))
        .with(Arc::new(UpdateStreakBlock))
}

// ============================================================================
// SHARED READERS
// ============================================================================

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// `state[key]`, then `input[key]`, then 0
pub(crate) fn state_or_input(ctx: &ExecutionContext, key: &str) -> Value {
    present(ctx.state.get(key))
        .or_else(|| present(ctx.input.get(key)))
        .cloned()
        .unwrap_or_else(|| json!(0))
}

pub(crate) fn input_or_zero(ctx: &ExecutionContext, key: &str) -> Value {
    present(ctx.input.get(key))
        .cloned()
        .unwrap_or_else(|| json!(0))
}

pub(crate) fn state_number(ctx: &ExecutionContext, key: &str) -> Value {
    present(ctx.state.get(key))
        .cloned()
        .unwrap_or_else(|| json!(0))
}

pub(crate) fn state_flag(ctx: &ExecutionContext, key: &str) -> bool {
    ctx.state.get(key).and_then(Value::as_bool).unwrap_or(false)
}

pub(crate) fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

/// `input.heartRate` as given, `[]` when absent. Must be an array.
pub(crate) fn heart_rate_samples(ctx: &ExecutionContext) -> Result<Vec<Value>, BlockError> {
    match present(ctx.input.get("heartRate")) {
        None => Ok(Vec::new()),
        Some(Value::Array(samples)) => Ok(samples.clone()),
        Some(other) => Err(BlockError::InvalidInput(format!(
            "heartRate must be an array, got {}",
            other
        ))),
    }
}
