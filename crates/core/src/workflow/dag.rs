use crate::error::{EngineError, EngineResult};
use crate::types::{Edge, Node, NodeId, WorkflowDefinition};
use std::collections::HashMap;

/// A directed link between two arena slots
#[derive(Debug, Clone)]
struct Link {
    source: usize,
    target: usize,
    label: Option<String>,
}

/// In-memory DAG for one run of a workflow.
///
/// Nodes and links live in insertion-ordered arenas; adjacency is kept as lists
/// of link indices per node so that duplicate edges stay distinct and traversal
/// order follows the order edges were added.
#[derive(Debug, Clone)]
pub struct WorkflowDag {
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_indices: HashMap<NodeId, usize>,
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
}

impl WorkflowDag {
    /// Build a DAG from a node list and an edge list
    pub fn build(nodes: &[Node], edges: &[Edge]) -> EngineResult<Self> {
        let mut dag = Self {
            nodes: Vec::with_capacity(nodes.len()),
            links: Vec::with_capacity(edges.len()),
            node_indices: HashMap::with_capacity(nodes.len()),
            incoming: Vec::with_capacity(nodes.len()),
            outgoing: Vec::with_capacity(nodes.len()),
        };

        for node in nodes {
            if dag.node_indices.contains_key(&node.id) {
                return Err(EngineError::DuplicateNode(node.id));
            }
            dag.node_indices.insert(node.id, dag.nodes.len());
            dag.nodes.push(node.clone());
            dag.incoming.push(Vec::new());
            dag.outgoing.push(Vec::new());
        }

        for edge in edges {
            let source = dag.index_of_endpoint(edge, edge.source)?;
            let target = dag.index_of_endpoint(edge, edge.target)?;

            let link = dag.links.len();
            dag.links.push(Link {
                source,
                target,
                label: edge.label.clone(),
            });
            dag.outgoing[source].push(link);
            dag.incoming[target].push(link);
        }

        Ok(dag)
    }

    /// Build a DAG from a persisted workflow definition
    pub fn from_definition(definition: &WorkflowDefinition) -> EngineResult<Self> {
        Self::build(&definition.nodes, &definition.edges)
    }

    fn index_of_endpoint(&self, edge: &Edge, endpoint: NodeId) -> EngineResult<usize> {
        self.node_indices
            .get(&endpoint)
            .copied()
            .ok_or(EngineError::DanglingEdge {
                from: edge.source,
                to: edge.target,
                missing: endpoint,
            })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.links.len()
    }

    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_indices.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node_indices.contains_key(&id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Edges in insertion order as (source, target, label)
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, Option<&str>)> + '_ {
        self.links.iter().map(|link| {
            (
                self.nodes[link.source].id,
                self.nodes[link.target].id,
                link.label.as_deref(),
            )
        })
    }

    /// Source of every edge into `id`, one entry per edge, in edge insertion order
    pub fn predecessors(&self, id: NodeId) -> EngineResult<Vec<NodeId>> {
        let idx = self.index_of(id)?;
        Ok(self.incoming[idx]
            .iter()
            .map(|&link| self.nodes[self.links[link].source].id)
            .collect())
    }

    /// Target of every edge out of `id`, one entry per edge, in edge insertion order
    pub fn successors(&self, id: NodeId) -> EngineResult<Vec<NodeId>> {
        let idx = self.index_of(id)?;
        Ok(self.outgoing[idx]
            .iter()
            .map(|&link| self.nodes[self.links[link].target].id)
            .collect())
    }

    /// Nodes with no incoming edges (can start immediately)
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.incoming[*idx].is_empty())
            .map(|(_, node)| node.id)
            .collect()
    }

    fn index_of(&self, id: NodeId) -> EngineResult<usize> {
        self.node_indices
            .get(&id)
            .copied()
            .ok_or(EngineError::UnknownNode(id))
    }

    // Arena accessors for the scheduler

    pub(crate) fn node_id_at(&self, idx: usize) -> NodeId {
        self.nodes[idx].id
    }

    pub(crate) fn in_degree_at(&self, idx: usize) -> usize {
        self.incoming[idx].len()
    }

    pub(crate) fn targets_of(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.outgoing[idx].iter().map(|&link| self.links[link].target)
    }
}
