//! FourTwo Core: Block trait, ExecutionContext, failure injection and runner
//!
//! Deterministic engine behind the "4+2" agent model: four stages run in a
//! fixed order over one shared context, and the resulting log is the trace.
//!
//! ```text
//! input → create_initial_context → apply_failures? → run_pipeline → trace
//!                                        ↓
//!                         perception → reasoning → planning → execution
//! ```

pub mod context;
pub mod data_model;
pub mod error;
pub mod failure;
pub mod runner;
pub mod stage;

pub use context::{
    create_initial_context, ContextSnapshot, ExecutionContext, LogEntry, StateBag, ToolFn,
    ToolTable, TOOL_READ_HEART_RATE, TOOL_READ_STEPS, TOOL_SEND_NOTIFICATION,
};
pub use data_model::{flatten_log, Fixture, SimulationStep, StepStatus};
pub use error::EngineError;
pub use failure::{apply_failures, FailureConfig};
pub use runner::{run_pipeline, PipelineConfig, PipelineRunner};
pub use stage::{Block, BlockError, Stage, SupportingSystem};

/// Engine version reported by the API
pub const ENGINE_VERSION: &str = "1.0.0";
