//! Pipeline Runner: walks the four stages in order over one context
use crate::context::ExecutionContext;
use crate::stage::{Block, BlockError, Stage};
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// Stage → block binding. Partially filled configs are accepted; the runner
/// fails the run at the first empty slot.
#[derive(Clone, Default)]
pub struct PipelineConfig {
    slots: BTreeMap<Stage, Arc<dyn Block>>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `block` to its own stage
    pub fn with(mut self, block: Arc<dyn Block>) -> Self {
        self.slots.insert(block.stage(), block);
        self
    }

    /// Bind `block` to its own stage, returning the block it replaced
    pub fn set(&mut self, block: Arc<dyn Block>) -> Option<Arc<dyn Block>> {
        self.slots.insert(block.stage(), block)
    }

    pub fn unbind(&mut self, stage: Stage) -> Option<Arc<dyn Block>> {
        self.slots.remove(&stage)
    }

    pub fn get(&self, stage: Stage) -> Option<&Arc<dyn Block>> {
        self.slots.get(&stage)
    }

    pub fn is_complete(&self) -> bool {
        Stage::ALL.iter().all(|s| self.slots.contains_key(s))
    }

    /// `perception.parse→reasoning.threshold→…`, `?` for empty slots
    pub fn pipeline_id(&self) -> String {
        Stage::ALL
            .iter()
            .map(|s| self.slots.get(s).map(|b| b.id()).unwrap_or("?"))
            .collect::<Vec<_>>()
            .join("→")
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("pipeline", &self.pipeline_id())
            .finish()
    }
}

pub struct PipelineRunner {
    config: PipelineConfig,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, ctx: ExecutionContext) -> ExecutionContext {
        run_pipeline(&self.config, ctx).await
    }
}

/// Run the four stages strictly in sequence.
///
/// A missing block, a block error or a block panic appends `ERROR_<STAGE>`,
/// sets `success = false` and stops the run. On full traversal `success` is left
/// to whatever the execution block decided.
pub async fn run_pipeline(config: &PipelineConfig, mut ctx: ExecutionContext) -> ExecutionContext {
    let run_id = ctx.run_id.clone();
    info!(%run_id, pipeline = %config.pipeline_id(), "pipeline started");

    for stage in Stage::ALL {
        let Some(block) = config.get(stage) else {
            warn!(%run_id, %stage, "no block bound for stage");
            ctx.push_log(
                stage.error_marker(),
                json!({ "error": "No block selected for this process" }),
            );
            ctx.success = Some(false);
            return ctx;
        };

        ctx.push_log(
            stage.start_marker(),
            json!({ "blockId": block.id(), "blockLabel": block.label() }),
        );

        let span = tracing::info_span!("stage", %run_id, %stage, block = block.id());
        let outcome = AssertUnwindSafe(block.run(&mut ctx))
            .catch_unwind()
            .instrument(span)
            .await
            .unwrap_or_else(|payload| Err(BlockError::Panicked(panic_message(payload))));

        match outcome {
            Ok(()) => {
                ctx.push_log(
                    stage.end_marker(),
                    json!({
                        "blockId": block.id(),
                        "state": Value::Object(ctx.state.clone()),
                        "success": true,
                    }),
                );
            }
            Err(err) => {
                warn!(%run_id, %stage, block = block.id(), error = %err, "block failed");
                ctx.push_log(
                    stage.error_marker(),
                    json!({
                        "blockId": block.id(),
                        "code": err.code(),
                        "error": err.message(),
                    }),
                );
                ctx.success = Some(false);
                return ctx;
            }
        }
    }

    info!(%run_id, success = ?ctx.success, entries = ctx.log.len(), "pipeline finished");
    ctx
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "block panicked".to_string()
    }
}
