use super::{summarize, BehaviorStore, WorkflowStore};
use crate::types::{
    Behavior, BehaviorId, BehaviorSummary, WorkflowDefinition, WorkflowId, WorkflowSummary,
};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory definition store (for tests and embedding)
#[derive(Default)]
pub struct InMemoryStore {
    workflows: RwLock<BTreeMap<WorkflowId, WorkflowDefinition>>,
    behaviors: RwLock<BTreeMap<BehaviorId, Behavior>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a workflow definition
    pub fn put_workflow(&self, definition: WorkflowDefinition) {
        self.workflows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(definition.id, definition);
    }

    /// Insert or replace a behavior
    pub fn put_behavior(&self, behavior: Behavior) {
        self.behaviors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(behavior.id, behavior);
    }

    pub fn with_workflow(self, definition: WorkflowDefinition) -> Self {
        self.put_workflow(definition);
        self
    }

    pub fn with_behavior(self, behavior: Behavior) -> Self {
        self.put_behavior(behavior);
        self
    }
}

impl WorkflowStore for InMemoryStore {
    fn workflow(&self, id: WorkflowId) -> Result<Option<WorkflowDefinition>> {
        let workflows = self.workflows.read().unwrap_or_else(|e| e.into_inner());
        Ok(workflows.get(&id).cloned())
    }

    fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let workflows = self.workflows.read().unwrap_or_else(|e| e.into_inner());
        Ok(workflows.values().map(summarize).collect())
    }
}

impl BehaviorStore for InMemoryStore {
    fn behavior(&self, id: BehaviorId) -> Result<Option<Behavior>> {
        let behaviors = self.behaviors.read().unwrap_or_else(|e| e.into_inner());
        Ok(behaviors.get(&id).cloned())
    }

    fn list_behaviors(&self) -> Result<Vec<BehaviorSummary>> {
        let behaviors = self.behaviors.read().unwrap_or_else(|e| e.into_inner());
        Ok(behaviors
            .values()
            .map(|b| BehaviorSummary {
                id: b.id,
                name: b.name.clone(),
            })
            .collect())
    }
}
