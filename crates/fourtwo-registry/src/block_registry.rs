//! Block Registry: id → block lookup and pipeline resolution
use fourtwo_core::{Block, PipelineConfig, Stage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Block metadata as shown to a learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub id: String,
    pub stage: Stage,
    pub label: String,
    pub description: String,
    pub uses_memory: bool,
    pub tool_calls: Vec<String>,
}

impl From<&dyn Block> for BlockInfo {
    fn from(block: &dyn Block) -> Self {
        Self {
            id: block.id().to_string(),
            stage: block.stage(),
            label: block.label().to_string(),
            description: block.description().to_string(),
            uses_memory: block.uses_memory(),
            tool_calls: block.tool_calls().iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Requested block id per stage, as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSelection {
    #[serde(default)]
    pub perception: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub planning: Option<String>,
    #[serde(default)]
    pub execution: Option<String>,
}

impl StageSelection {
    pub fn get(&self, stage: Stage) -> Option<&str> {
        let id = match stage {
            Stage::Perception => &self.perception,
            Stage::Reasoning => &self.reasoning,
            Stage::Planning => &self.planning,
            Stage::Execution => &self.execution,
        };
        id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn set(&mut self, stage: Stage, id: impl Into<String>) {
        let slot = match stage {
            Stage::Perception => &mut self.perception,
            Stage::Reasoning => &mut self.reasoning,
            Stage::Planning => &mut self.planning,
            Stage::Execution => &mut self.execution,
        };
        *slot = Some(id.into());
    }
}

/// One identifier that could not be turned into a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unresolved {
    pub field: String,
    pub id: Option<String>,
    pub reason: String,
}

impl Unresolved {
    pub fn new(field: impl Into<String>, id: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            id: id.map(str::to_string),
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Default)]
pub struct BlockRegistry {
    blocks: Vec<Arc<dyn Block>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The eight health-coach blocks
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for block in fourtwo_blocks::all_blocks() {
            registry.register(block);
        }
        registry
    }

    /// Add a block; a block with the same id is replaced.
    pub fn register(&mut self, block: Arc<dyn Block>) {
        self.blocks.retain(|b| b.id() != block.id());
        self.blocks.push(block);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Block>> {
        self.blocks.iter().find(|b| b.id() == id).cloned()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.blocks.iter().map(|b| b.id()).collect()
    }

    pub fn for_stage(&self, stage: Stage) -> Vec<Arc<dyn Block>> {
        self.blocks
            .iter()
            .filter(|b| b.stage() == stage)
            .cloned()
            .collect()
    }

    pub fn info(&self, stage: Option<Stage>) -> Vec<BlockInfo> {
        self.blocks
            .iter()
            .filter(|b| stage.map_or(true, |s| b.stage() == s))
            .map(|b| BlockInfo::from(b.as_ref()))
            .collect()
    }

    /// All four stages must resolve to a block of that stage. Every failure
    /// is reported, not just the first.
    pub fn resolve(&self, selection: &StageSelection) -> Result<PipelineConfig, Vec<Unresolved>> {
        let mut config = PipelineConfig::new();
        let mut unresolved = Vec::new();

        for stage in Stage::ALL {
            let field = format!("blockIds.{}", stage);
            let Some(id) = selection.get(stage) else {
                unresolved.push(Unresolved::new(field, None, "no block selected"));
                continue;
            };
            match self.get(id) {
                None => unresolved.push(Unresolved::new(field, Some(id), "unknown block")),
                Some(block) if block.stage() != stage => unresolved.push(Unresolved::new(
                    field,
                    Some(id),
                    format!("block belongs to {}", block.stage()),
                )),
                Some(block) => {
                    config.set(block);
                }
            }
        }

        if unresolved.is_empty() {
            Ok(config)
        } else {
            Err(unresolved)
        }
    }
}
