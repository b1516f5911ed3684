//! Execution Context: the record threaded through every stage of one run
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Open key/value working memory shared by the stages
pub type StateBag = Map<String, Value>;

/// A capability the agent can invoke. Stateless, so sharing is free.
pub type ToolFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

pub const TOOL_SEND_NOTIFICATION: &str = "sendNotification";
pub const TOOL_READ_STEPS: &str = "readSteps";
pub const TOOL_READ_HEART_RATE: &str = "readHeartRate";

/// Capability table. Cloning copies the container; the callables are shared.
#[derive(Clone, Default)]
pub struct ToolTable {
    tools: BTreeMap<String, ToolFn>,
}

impl ToolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tool: ToolFn) {
        self.tools.insert(name.into(), tool);
    }

    /// Drops the entry entirely; absence is detected with `contains`.
    pub fn remove(&mut self, name: &str) -> Option<ToolFn> {
        self.tools.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolFn> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tools.keys()).finish()
    }
}

/// One trace row. Appended, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub step: String,
    pub data: Value,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(step: impl Into<String>, data: Value) -> Self {
        Self {
            step: step.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.step.starts_with("ERROR")
    }

    pub fn is_injection(&self) -> bool {
        self.step.starts_with("FAILURE_INJECTED")
    }
}

/// The clonable half of a context: everything except the tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub input: Value,
    pub state: StateBag,
    pub log: Vec<LogEntry>,
    pub success: Option<bool>,
}

/// Mutable record of one simulation run. Owned by exactly one run.
///
/// `Clone` deep-copies the value fields and shallow-copies `tools`.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub run_id: String,
    pub input: Value,
    pub state: StateBag,
    pub tools: ToolTable,
    pub log: Vec<LogEntry>,
    /// `None` until a block or the runner decides the outcome
    pub success: Option<bool>,
}

impl ExecutionContext {
    pub fn push_log(&mut self, step: impl Into<String>, data: Value) {
        self.log.push(LogEntry::new(step, data));
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains(name)
    }

    /// Invoke a tool by name. Tool calls never touch the log.
    pub fn call_tool(&self, name: &str, args: &Value) -> Result<Value, EngineError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| EngineError::ToolUnavailable(name.to_string()))?;
        Ok(tool(args))
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            input: self.input.clone(),
            state: self.state.clone(),
            log: self.log.clone(),
            success: self.success,
        }
    }

    /// Hash of step tags and payloads, timestamps excluded.
    pub fn trace_digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for entry in &self.log {
            hasher.update(entry.step.as_bytes());
            hasher.update(&[0]);
            hasher.update(entry.data.to_string().as_bytes());
            hasher.update(&[0]);
        }
        format!("blake3:{}", hasher.finalize())
    }
}

/// Build a fresh context whose tools report on a private copy of `input`.
pub fn create_initial_context(input: Value) -> ExecutionContext {
    let sensed = Arc::new(input.clone());
    let mut tools = ToolTable::new();

    tools.insert(
        TOOL_SEND_NOTIFICATION,
        Arc::new(|args: &Value| {
            tracing::debug!(tool = TOOL_SEND_NOTIFICATION, %args, "tool invoked");
            let kind = args.get("type").cloned().unwrap_or(Value::Null);
            json!({ "sent": true, "type": kind })
        }),
    );

    let for_steps = Arc::clone(&sensed);
    tools.insert(
        TOOL_READ_STEPS,
        Arc::new(move |_: &Value| {
            tracing::debug!(tool = TOOL_READ_STEPS, "tool invoked");
            let steps = for_steps
                .get("steps")
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| json!(0));
            json!({ "steps": steps })
        }),
    );

    let for_heart_rate = Arc::clone(&sensed);
    tools.insert(
        TOOL_READ_HEART_RATE,
        Arc::new(move |_: &Value| {
            tracing::debug!(tool = TOOL_READ_HEART_RATE, "tool invoked");
            let samples = for_heart_rate
                .get("heartRate")
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| json!([]));
            json!({ "heartRate": samples })
        }),
    );

    ExecutionContext {
        run_id: uuid::Uuid::new_v4().to_string(),
        input,
        state: StateBag::new(),
        tools,
        log: Vec::new(),
        success: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_context_shape() {
        let ctx = create_initial_context(json!({ "steps": 4000 }));
        assert!(ctx.state.is_empty());
        assert!(ctx.log.is_empty());
        assert_eq!(ctx.success, None);
        assert_eq!(
            ctx.tools.names(),
            vec![TOOL_READ_HEART_RATE, TOOL_READ_STEPS, TOOL_SEND_NOTIFICATION]
        );
    }

    #[test]
    fn test_tools_report_original_input() {
        let mut ctx = create_initial_context(json!({ "steps": 4000, "heartRate": [80, 90] }));
        ctx.state.insert("steps".into(), json!(1));
        ctx.input = json!({ "steps": 1 });

        let steps = ctx.call_tool(TOOL_READ_STEPS, &Value::Null).unwrap();
        assert_eq!(steps, json!({ "steps": 4000 }));
        let hr = ctx.call_tool(TOOL_READ_HEART_RATE, &Value::Null).unwrap();
        assert_eq!(hr, json!({ "heartRate": [80, 90] }));
        assert!(ctx.log.is_empty());
    }

    #[test]
    fn test_tool_defaults_when_fields_missing() {
        let ctx = create_initial_context(json!({}));
        assert_eq!(
            ctx.call_tool(TOOL_READ_STEPS, &Value::Null).unwrap(),
            json!({ "steps": 0 })
        );
        assert_eq!(
            ctx.call_tool(TOOL_READ_HEART_RATE, &Value::Null).unwrap(),
            json!({ "heartRate": [] })
        );
    }

    #[test]
    fn test_send_notification_echoes_type() {
        let ctx = create_initial_context(json!({}));
        let result = ctx
            .call_tool(TOOL_SEND_NOTIFICATION, &json!({ "type": "nudge", "message": "go" }))
            .unwrap();
        assert_eq!(result, json!({ "sent": true, "type": "nudge" }));
    }

    #[test]
    fn test_missing_tool_is_an_error() {
        let mut ctx = create_initial_context(json!({}));
        ctx.tools.remove(TOOL_SEND_NOTIFICATION);
        assert!(!ctx.has_tool(TOOL_SEND_NOTIFICATION));
        assert_eq!(
            ctx.call_tool(TOOL_SEND_NOTIFICATION, &json!({})),
            Err(EngineError::ToolUnavailable(TOOL_SEND_NOTIFICATION.into()))
        );
    }

    #[test]
    fn test_trace_digest_ignores_timestamps() {
        let mut a = create_initial_context(json!({}));
        let mut b = create_initial_context(json!({}));
        a.push_log("STEP", json!({ "x": 1 }));
        b.push_log("STEP", json!({ "x": 1 }));
        b.log[0].timestamp = b.log[0].timestamp + chrono::Duration::seconds(5);
        assert_eq!(a.trace_digest(), b.trace_digest());

        b.push_log("OTHER", json!(null));
        assert_ne!(a.trace_digest(), b.trace_digest());
    }

    #[test]
    fn test_log_entry_classification() {
        assert!(LogEntry::new("ERROR_PLANNING", json!({})).is_error());
        assert!(!LogEntry::new("EXECUTION_ERROR", json!({})).is_error());
        assert!(LogEntry::new("FAILURE_INJECTED_STALE_MEMORY", json!({})).is_injection());
    }
}
