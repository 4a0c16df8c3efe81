use crate::error::{EngineResult, FailureKind};
use crate::types::{NodeId, ResultMap, RunId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one run, ready to be serialized for the caller.
///
/// ```json
/// {"run_id": "...", "workflow_id": 7, "started_at": "...", "completed_at": "...",
///  "status": "success", "result": {"1": null, "2": 3}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<WorkflowId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every node ran; absences included
    Success { result: ResultMap },
    /// The run stopped at the first fatal error
    Failure {
        error: String,
        kind: FailureKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<NodeId>,
    },
}

impl RunReport {
    /// Package the engine's result. This is the only place engine errors are
    /// turned into failure envelopes.
    pub fn from_result(
        run_id: RunId,
        workflow_id: Option<WorkflowId>,
        started_at: DateTime<Utc>,
        result: EngineResult<ResultMap>,
    ) -> Self {
        let completed_at = Utc::now();
        let duration = completed_at - started_at;

        let outcome = match result {
            Ok(result) => {
                tracing::info!(
                    "Workflow execution completed: run_id={}, nodes={}, duration_ms={}",
                    run_id,
                    result.len(),
                    duration.num_milliseconds()
                );
                RunOutcome::Success { result }
            }
            Err(e) => {
                tracing::error!("Workflow execution failed: run_id={}, error={}", run_id, e);
                RunOutcome::Failure {
                    error: e.to_string(),
                    kind: e.kind(),
                    node_id: e.node_id(),
                }
            }
        };

        Self {
            run_id,
            workflow_id,
            started_at,
            completed_at,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Success { .. })
    }

    /// Per-node results of a successful run
    pub fn results(&self) -> Option<&ResultMap> {
        match &self.outcome {
            RunOutcome::Success { result } => Some(result),
            RunOutcome::Failure { .. } => None,
        }
    }

    /// Failure description of a failed run
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Success { .. } => None,
            RunOutcome::Failure { error, .. } => Some(error),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            RunOutcome::Success { .. } => None,
            RunOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}
