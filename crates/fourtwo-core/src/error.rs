//! Unified engine error model
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("STAGE/UNKNOWN: {0}")]
    UnknownStage(String),

    #[error("STAGE/SUPPORTING: {0} is a supporting system, not a run-loop stage")]
    SupportingSystem(String),

    #[error("TOOL/UNAVAILABLE: {0}")]
    ToolUnavailable(String),
}
