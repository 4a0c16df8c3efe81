use super::dag::WorkflowDag;
use crate::error::{EngineError, EngineResult};
use crate::types::NodeId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Compute the execution order of a DAG (dependencies first).
///
/// Kahn's algorithm over the arena. When several nodes are ready at once the
/// one inserted first goes first, so the order depends only on node and edge
/// insertion order. Fails with [`EngineError::CyclicGraph`] when some nodes
/// can never become ready.
pub fn topological_order(dag: &WorkflowDag) -> EngineResult<Vec<NodeId>> {
    let count = dag.node_count();
    let mut in_degree: Vec<usize> = (0..count).map(|idx| dag.in_degree_at(idx)).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(idx, _)| Reverse(idx))
        .collect();

    let mut order = Vec::with_capacity(count);
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(dag.node_id_at(idx));

        // One decrement per edge, so duplicate edges balance out
        for target in dag.targets_of(idx) {
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                ready.push(Reverse(target));
            }
        }
    }

    if order.len() < count {
        let unordered = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree > 0)
            .map(|(idx, _)| dag.node_id_at(idx))
            .collect();
        tracing::warn!("Workflow graph contains a cycle");
        return Err(EngineError::CyclicGraph { unordered });
    }

    Ok(order)
}
