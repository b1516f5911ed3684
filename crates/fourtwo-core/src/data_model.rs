//! Data Model: Fixture, SimulationStep
use crate::context::LogEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named sensor reading used as pipeline input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    /// Fixture ID (ex: "active-day")
    pub id: String,
    pub name: String,
    pub description: String,
    /// Raw input payload (`steps`, `heartRate`, ...)
    pub input: Value,
    /// What the learner should expect from the default pipeline
    pub expected_outcome: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
}

/// Flattened trace row handed to renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStep {
    pub id: String,
    pub step: String,
    pub block_id: Option<String>,
    pub status: StepStatus,
    pub data: Value,
    /// Unix millis
    pub timestamp: i64,
}

/// One row per log entry, in log order. Any length is fine, including zero.
pub fn flatten_log(log: &[LogEntry]) -> Vec<SimulationStep> {
    log.iter()
        .enumerate()
        .map(|(index, entry)| SimulationStep {
            id: format!("step-{}", index),
            step: entry.step.clone(),
            block_id: entry
                .data
                .get("blockId")
                .and_then(Value::as_str)
                .map(str::to_string),
            status: if entry.is_error() {
                StepStatus::Error
            } else {
                StepStatus::Success
            },
            data: entry.data.clone(),
            timestamp: entry.timestamp.timestamp_millis(),
        })
        .collect()
}
