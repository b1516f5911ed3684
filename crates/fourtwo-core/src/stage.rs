//! Stage enum and Block trait: the single contract every block implements
use crate::context::ExecutionContext;
use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four run-loop stages, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Perception,
    Reasoning,
    Planning,
    Execution,
}

impl Stage {
    /// Fixed traversal order of the run loop
    pub const ALL: [Stage; 4] = [
        Stage::Perception,
        Stage::Reasoning,
        Stage::Planning,
        Stage::Execution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Perception => "perception",
            Stage::Reasoning => "reasoning",
            Stage::Planning => "planning",
            Stage::Execution => "execution",
        }
    }

    /// Upper-case tag used in log markers (`START_PERCEPTION`, ...)
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::Perception => "PERCEPTION",
            Stage::Reasoning => "REASONING",
            Stage::Planning => "PLANNING",
            Stage::Execution => "EXECUTION",
        }
    }

    /// Short alias from the sense/interpret/decide/act vocabulary
    pub fn alias(&self) -> &'static str {
        match self {
            Stage::Perception => "sense",
            Stage::Reasoning => "interpret",
            Stage::Planning => "decide",
            Stage::Execution => "act",
        }
    }

    pub fn start_marker(&self) -> String {
        format!("START_{}", self.tag())
    }

    pub fn end_marker(&self) -> String {
        format!("END_{}", self.tag())
    }

    pub fn error_marker(&self) -> String {
        format!("ERROR_{}", self.tag())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if let Some(stage) = Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == wanted || stage.alias() == wanted)
        {
            return Ok(stage);
        }
        if SupportingSystem::SUPPORTING
            .iter()
            .any(|system| system.as_str() == wanted)
        {
            return Err(EngineError::SupportingSystem(wanted));
        }
        Err(EngineError::UnknownStage(s.to_string()))
    }
}

/// The "+2" of the 4+2 model. Supporting systems surround the run loop but
/// never hold a block slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportingSystem {
    Learning,
    Interaction,
}

impl SupportingSystem {
    pub const SUPPORTING: [SupportingSystem; 2] =
        [SupportingSystem::Learning, SupportingSystem::Interaction];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportingSystem::Learning => "learning",
            SupportingSystem::Interaction => "interaction",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SupportingSystem::Learning => {
                "Feedback loops, adaptation and memory carried across runs"
            }
            SupportingSystem::Interaction => {
                "Communication with users and external systems"
            }
        }
    }
}

impl fmt::Display for SupportingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract of a pipeline block.
///
/// A block is bound to exactly one stage, reads `input`/`state`, writes new
/// `state` keys, may call a tool, and appends one descriptive log entry.
/// Returning `Err` aborts the run at this stage.
#[async_trait]
pub trait Block: Send + Sync {
    /// Stable unique id (ex: "perception.parse")
    fn id(&self) -> &'static str;

    fn stage(&self) -> Stage;

    fn label(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Whether the block consults shared memory (`state`). UI badge only.
    fn uses_memory(&self) -> bool {
        true
    }

    /// Tool names the block may invoke. UI badge only, never enforced.
    fn tool_calls(&self) -> &'static [&'static str] {
        &[]
    }

    async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), BlockError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockError {
    InvalidInput(String),
    ExecutionFailed(String),
    ToolUnavailable(String),
    /// The block panicked; the runner caught the unwind.
    Panicked(String),
}

impl BlockError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "BLOCK/INPUT",
            Self::ExecutionFailed(_) => "BLOCK/EXEC",
            Self::ToolUnavailable(_) => "BLOCK/TOOL",
            Self::Panicked(_) => "BLOCK/PANIC",
        }
    }

    /// Bare message, without the code prefix
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::ExecutionFailed(msg) | Self::Panicked(msg) => {
                msg.clone()
            }
            Self::ToolUnavailable(name) => format!("{} tool not available", name),
        }
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for BlockError {}

impl From<EngineError> for BlockError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ToolUnavailable(name) => BlockError::ToolUnavailable(name),
            other => BlockError::ExecutionFailed(other.to_string()),
        }
    }
}
