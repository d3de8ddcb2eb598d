//! Flow templates: typed automation blocks plus ordered steps,
//! convertible into a running task

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::task::{Subtask, Task};

/// Block kinds the flow generator may emit
///
/// `Agent` blocks exist in stored flows but are never produced by the
/// generator, so they carry no option allow-list.
pub const GENERATOR_KINDS: [BlockKind; 3] = [BlockKind::Collect, BlockKind::Think, BlockKind::Act];

/// Kind of automation a block performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Collect,
    Think,
    Act,
    Agent,
}

impl BlockKind {
    /// Fixed option allow-list for this kind
    pub fn allowed_options(&self) -> &'static [&'static str] {
        match self {
            BlockKind::Collect => &[
                "User Text",
                "Upload Sheet",
                "All Listing Info",
                "Get Keywords",
                "Estimate Sales",
                "Review Information",
                "Seller Account Feedback",
                "Email Parsing",
            ],
            BlockKind::Think => &[
                "Basic AI Analysis",
                "Listing Analysis",
                "Insights Generation",
                "Review Analysis",
            ],
            BlockKind::Act => &[
                "AI Summary",
                "Push to Amazon",
                "Send Email",
                "Human in the Loop",
                "Agent Escalation",
            ],
            BlockKind::Agent => &[],
        }
    }

    /// First allow-listed option, used when coercing unknown options
    pub fn default_option(&self) -> Option<&'static str> {
        self.allowed_options().first().copied()
    }

    /// Whether `option` is allow-listed for this kind
    pub fn allows(&self, option: &str) -> bool {
        self.allowed_options().contains(&option)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BlockKind::Collect => "collect",
            BlockKind::Think => "think",
            BlockKind::Act => "act",
            BlockKind::Agent => "agent",
        };
        write!(f, "{}", label)
    }
}

/// A typed unit of automation referenced by flow steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub option: String,
    pub name: String,
}

impl FlowBlock {
    pub fn new(kind: BlockKind, option: String, name: String) -> Self {
        Self { kind, option, name }
    }
}

/// One ordered step of a flow, optionally backed by a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    pub title: String,
    pub description: String,
    /// Index into the owning flow's `blocks` list
    pub block_index: Option<usize>,
}

/// A reusable template of ordered blocks and steps
///
/// A flow owns its blocks and steps by value (embedded JSON in the store,
/// not foreign keys to shared rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub blocks: Vec<FlowBlock>,
    pub steps: Vec<FlowStep>,
}

/// Flow shape produced by the generation endpoint: no id, no steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDraft {
    pub name: String,
    pub description: String,
    pub blocks: Vec<FlowBlock>,
}

/// Flow validation failures
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow name is empty")]
    EmptyName,
    #[error("flow description is empty")]
    EmptyDescription,
    #[error("flow has no blocks")]
    NoBlocks,
    #[error("option '{option}' is not valid for {kind} blocks")]
    UnknownOption { kind: BlockKind, option: String },
    #[error("step '{title}' references block index {index}, but the flow has {count} blocks")]
    StepOutOfRange {
        title: String,
        index: usize,
        count: usize,
    },
}

impl Flow {
    pub fn new(name: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            blocks: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Check structural integrity: non-empty name and in-range step references
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.name.trim().is_empty() {
            return Err(FlowError::EmptyName);
        }
        for step in &self.steps {
            if let Some(index) = step.block_index {
                if index >= self.blocks.len() {
                    return Err(FlowError::StepOutOfRange {
                        title: step.title.clone(),
                        index,
                        count: self.blocks.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Instantiate this template as a task
    ///
    /// Subtasks mirror the steps in order; a flow with blocks but no steps
    /// (the generated shape) gets one subtask per block. The template itself
    /// is embedded in the task and readable back via `Task::flow()`.
    pub fn into_task(self) -> Task {
        let mut task = Task::new(self.name.clone(), self.description.clone());
        task.category = "Flow".to_string();

        task.subtasks = if self.steps.is_empty() {
            self.blocks
                .iter()
                .map(|block| {
                    let mut subtask = Subtask::new(
                        block.name.clone(),
                        format!("{} via {}", block.kind, block.option),
                    );
                    subtask.block = Some(block.clone());
                    subtask
                })
                .collect()
        } else {
            self.steps
                .iter()
                .map(|step| {
                    let mut subtask = Subtask::new(step.title.clone(), step.description.clone());
                    subtask.block = step
                        .block_index
                        .and_then(|index| self.blocks.get(index))
                        .cloned();
                    subtask
                })
                .collect()
        };

        task.flow = Some(self);
        task
    }
}

impl FlowDraft {
    /// Check the generation contract: non-empty name and description, at
    /// least one block, every block a generator kind with an allow-listed
    /// option
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.name.trim().is_empty() {
            return Err(FlowError::EmptyName);
        }
        if self.description.trim().is_empty() {
            return Err(FlowError::EmptyDescription);
        }
        if self.blocks.is_empty() {
            return Err(FlowError::NoBlocks);
        }
        for block in &self.blocks {
            if !GENERATOR_KINDS.contains(&block.kind) || !block.kind.allows(&block.option) {
                return Err(FlowError::UnknownOption {
                    kind: block.kind,
                    option: block.option.clone(),
                });
            }
        }
        Ok(())
    }

    /// Promote this draft to a stored flow with a fresh id and no steps
    pub fn into_flow(self) -> Flow {
        Flow {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            blocks: self.blocks,
            steps: Vec::new(),
        }
    }
}
