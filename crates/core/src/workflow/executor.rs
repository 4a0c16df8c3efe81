use super::dag::WorkflowDag;
use super::node_executor::NodeExecutor;
use super::schedule::topological_order;
use crate::error::{EngineError, EngineResult};
use crate::loader::CodeLoader;
use crate::storage::BehaviorStore;
use crate::types::{NodeId, NodeOutput, ResultMap, RunId, WorkflowDefinition};
use std::sync::Arc;

/// Workflow executor that walks a scheduled DAG one node at a time
pub struct WorkflowExecutor {
    node_executor: NodeExecutor,
}

/// Outputs recorded so far in one run
#[derive(Default)]
struct ExecutionState {
    outputs: ResultMap,
}

impl ExecutionState {
    /// Outputs of every predecessor, one per incoming edge, in edge order
    fn inputs_for(&self, dag: &WorkflowDag, node: NodeId) -> EngineResult<Vec<NodeOutput>> {
        Ok(dag
            .predecessors(node)?
            .into_iter()
            .map(|pred| self.outputs.get(&pred).cloned().flatten())
            .collect())
    }

    fn record(&mut self, node: NodeId, output: NodeOutput) {
        // null and "no output" are the same thing
        let output = output.filter(|value| !value.is_null());
        let previous = self.outputs.insert(node, output);
        debug_assert!(previous.is_none(), "node {} recorded twice", node);
    }
}

impl WorkflowExecutor {
    pub fn new(behaviors: Arc<dyn BehaviorStore>, loader: Arc<dyn CodeLoader>) -> Self {
        Self {
            node_executor: NodeExecutor::new(behaviors, loader),
        }
    }

    /// Build, schedule and execute a workflow definition
    pub fn run_definition(
        &self,
        run_id: RunId,
        definition: &WorkflowDefinition,
    ) -> EngineResult<ResultMap> {
        let dag = WorkflowDag::from_definition(definition)?;
        let order = topological_order(&dag)?;

        tracing::debug!(
            "Scheduled {} nodes over {} edges for run {}",
            order.len(),
            dag.edge_count(),
            run_id
        );

        self.execute(run_id, &dag, &order)
    }

    /// Execute the nodes of `dag` strictly in `order`.
    ///
    /// The first failing node stops the run; nothing recorded up to that
    /// point is returned.
    pub fn execute(
        &self,
        run_id: RunId,
        dag: &WorkflowDag,
        order: &[NodeId],
    ) -> EngineResult<ResultMap> {
        let mut state = ExecutionState::default();

        for &node_id in order {
            let node = dag.node(node_id).ok_or(EngineError::UnknownNode(node_id))?;
            let inputs = state.inputs_for(dag, node_id)?;

            tracing::debug!("Executing node {} (run {})", node_id, run_id);

            let output = self.node_executor.execute(run_id, node, &inputs)?;
            state.record(node_id, output);
        }

        Ok(state.outputs)
    }
}
