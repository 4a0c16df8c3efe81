use super::dag::WorkflowDag;
use super::executor::WorkflowExecutor;
use super::report::RunReport;
use super::schedule::topological_order;
use crate::error::{EngineError, EngineResult};
use crate::loader::CodeLoader;
use crate::storage::{BehaviorStore, WorkflowStore};
use crate::types::{NodeId, RunId, WorkflowDefinition, WorkflowId};
use chrono::Utc;
use std::sync::Arc;

/// Entry point for running stored workflows.
///
/// Each run loads the definition once, executes on a blocking worker thread,
/// and always yields a [`RunReport`]. Runs share nothing but the stores and the
/// loader, so any number may be in flight at once.
#[derive(Clone)]
pub struct WorkflowRunner {
    workflows: Arc<dyn WorkflowStore>,
    executor: Arc<WorkflowExecutor>,
}

impl WorkflowRunner {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        behaviors: Arc<dyn BehaviorStore>,
        loader: Arc<dyn CodeLoader>,
    ) -> Self {
        Self {
            workflows,
            executor: Arc::new(WorkflowExecutor::new(behaviors, loader)),
        }
    }

    /// Run a stored workflow to completion
    pub async fn run(&self, workflow_id: WorkflowId) -> RunReport {
        let run_id = RunId::new();
        let started_at = Utc::now();

        tracing::info!(
            "Starting workflow execution: run_id={}, workflow_id={}",
            run_id,
            workflow_id
        );

        let result = match self.load(workflow_id) {
            Ok(definition) => {
                let executor = self.executor.clone();
                tokio::task::spawn_blocking(move || executor.run_definition(run_id, &definition))
                    .await
                    .unwrap_or_else(|e| Err(aborted(e)))
            }
            Err(e) => Err(e),
        };

        RunReport::from_result(run_id, Some(workflow_id), started_at, result)
    }

    /// Run an in-hand definition on the current thread
    pub fn run_definition(&self, definition: &WorkflowDefinition) -> RunReport {
        let run_id = RunId::new();
        let started_at = Utc::now();

        tracing::info!(
            "Starting workflow execution: run_id={}, workflow={:?}",
            run_id,
            definition.name
        );

        let result = self.executor.run_definition(run_id, definition);
        RunReport::from_result(run_id, None, started_at, result)
    }

    /// Validate a stored workflow and return its execution order without
    /// running any node
    pub fn check(&self, workflow_id: WorkflowId) -> EngineResult<Vec<NodeId>> {
        let definition = self.load(workflow_id)?;
        let dag = WorkflowDag::from_definition(&definition)?;
        topological_order(&dag)
    }

    fn load(&self, workflow_id: WorkflowId) -> EngineResult<WorkflowDefinition> {
        self.workflows
            .workflow(workflow_id)
            .map_err(EngineError::Storage)?
            .ok_or(EngineError::WorkflowNotFound(workflow_id))
    }
}

fn aborted(e: tokio::task::JoinError) -> EngineError {
    if e.is_cancelled() {
        return EngineError::Aborted("worker task was cancelled".to_string());
    }

    let panic = e.into_panic();
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    EngineError::Aborted(format!("worker panicked: {}", message))
}
