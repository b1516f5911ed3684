//! Failure injection: deterministic faults applied to a copy of a context
use crate::context::{ExecutionContext, StateBag};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Offset applied to heart-rate samples: `+` on even indices, `-` on odd.
pub const HEART_RATE_NOISE_BPM: i64 = 15;
/// Steps lost to sensor corruption, floored at zero.
pub const STEPS_NOISE: i64 = 800;

pub const NOISY_INPUT_MARKER: &str = "FAILURE_INJECTED_NOISY_INPUT";
pub const MISSING_TOOL_MARKER: &str = "FAILURE_INJECTED_MISSING_TOOL";
pub const STALE_MEMORY_MARKER: &str = "FAILURE_INJECTED_STALE_MEMORY";

/// Three independent toggles. Any combination is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureConfig {
    #[serde(default)]
    pub noisy_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_tool: Option<String>,
    #[serde(default)]
    pub stale_memory: bool,
}

impl FailureConfig {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn noisy_input(mut self) -> Self {
        self.noisy_input = true;
        self
    }

    pub fn missing_tool(mut self, tool: impl Into<String>) -> Self {
        self.missing_tool = Some(tool.into());
        self
    }

    pub fn stale_memory(mut self) -> Self {
        self.stale_memory = true;
        self
    }

    fn tool_to_remove(&self) -> Option<&str> {
        self.missing_tool.as_deref().filter(|t| !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.noisy_input && !self.stale_memory && self.tool_to_remove().is_none()
    }
}

/// Returns a corrupted copy of `base`; `base` itself is never touched.
///
/// The three faults touch disjoint fields (`input`, `tools`, `state`), so
/// they compose without interfering. Each one appends a single
/// `FAILURE_INJECTED_*` entry to the copy's log.
pub fn apply_failures(base: &ExecutionContext, failures: &FailureConfig) -> ExecutionContext {
    let mut ctx = base.clone();
    ctx.run_id = uuid::Uuid::new_v4().to_string();

    if failures.noisy_input {
        corrupt_input(&mut ctx.input);
        ctx.push_log(
            NOISY_INPUT_MARKER,
            json!({
                "type": "noisyInput",
                "description": "Deterministic sensor corruption applied",
                "hrNoise": format!("±{} BPM alternating pattern", HEART_RATE_NOISE_BPM),
                "stepsNoise": format!("-{} steps", STEPS_NOISE),
            }),
        );
    }

    if let Some(tool) = failures.tool_to_remove() {
        ctx.tools.remove(tool);
        ctx.push_log(
            MISSING_TOOL_MARKER,
            json!({ "type": "missingTool", "tool": tool }),
        );
    }

    if failures.stale_memory {
        ctx.state = StateBag::new();
        ctx.push_log(
            STALE_MEMORY_MARKER,
            json!({ "type": "staleMemory", "description": "Cleared all memory state" }),
        );
    }

    tracing::debug!(
        run_id = %ctx.run_id,
        noisy_input = failures.noisy_input,
        missing_tool = ?failures.tool_to_remove(),
        stale_memory = failures.stale_memory,
        "failures applied"
    );

    ctx
}

fn corrupt_input(input: &mut Value) {
    if let Some(Value::Array(samples)) = input.get_mut("heartRate") {
        for (index, sample) in samples.iter_mut().enumerate() {
            let offset = if index % 2 == 0 {
                HEART_RATE_NOISE_BPM
            } else {
                -HEART_RATE_NOISE_BPM
            };
            *sample = shift(sample, offset);
        }
    }

    if let Some(steps) = input.get_mut("steps") {
        if let Some(n) = steps.as_i64() {
            *steps = json!(n.saturating_sub(STEPS_NOISE).max(0));
        } else if let Some(n) = steps.as_u64() {
            *steps = json!(n.saturating_sub(STEPS_NOISE as u64));
        } else if let Some(n) = steps.as_f64() {
            *steps = json!((n - STEPS_NOISE as f64).max(0.0));
        }
    }
}

/// Integer samples saturate at the bounds of their JSON type.
fn shift(sample: &Value, offset: i64) -> Value {
    if let Some(n) = sample.as_i64() {
        json!(n.saturating_add(offset))
    } else if let Some(n) = sample.as_u64() {
        json!(n.saturating_add_signed(offset))
    } else if let Some(n) = sample.as_f64() {
        json!(n + offset as f64)
    } else {
        sample.clone()
    }
}
