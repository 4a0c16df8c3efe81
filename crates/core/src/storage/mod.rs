pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemStore;
pub use memory::InMemoryStore;

use crate::types::{Behavior, BehaviorId, BehaviorSummary, WorkflowDefinition, WorkflowId, WorkflowSummary};
use anyhow::Result;

/// Source of persisted workflow definitions
pub trait WorkflowStore: Send + Sync {
    /// Fetch a workflow's nodes and edges
    fn workflow(&self, id: WorkflowId) -> Result<Option<WorkflowDefinition>>;

    /// List all stored workflows, ordered by id
    fn list_workflows(&self) -> Result<Vec<WorkflowSummary>>;
}

/// Source of behavior source text
pub trait BehaviorStore: Send + Sync {
    /// Fetch a behavior by id
    fn behavior(&self, id: BehaviorId) -> Result<Option<Behavior>>;

    /// List all stored behaviors, ordered by id
    fn list_behaviors(&self) -> Result<Vec<BehaviorSummary>>;
}

pub(crate) fn summarize(definition: &WorkflowDefinition) -> WorkflowSummary {
    WorkflowSummary {
        id: definition.id,
        name: definition.name.clone(),
        node_count: definition.nodes.len(),
        edge_count: definition.edges.len(),
    }
}
