//! Error types for the workflow engine.

use crate::types::{BehaviorId, NodeId, WorkflowId};
use serde::{Deserialize, Serialize};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal conditions that abort a workflow run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An edge names a node that is not part of the graph.
    #[error("edge {from} -> {to} references unknown node {missing}")]
    DanglingEdge {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },

    /// The same node id appears twice in one workflow.
    #[error("node {0} is defined more than once")]
    DuplicateNode(NodeId),

    /// No topological order exists.
    #[error("cyclic dependency detected in the workflow (unordered nodes: {})", join_ids(.unordered))]
    CyclicGraph { unordered: Vec<NodeId> },

    /// The execution order names a node the graph does not contain.
    #[error("node {0} is not part of the workflow graph")]
    UnknownNode(NodeId),

    /// A node references a behavior that does not resolve.
    #[error("node {node} references unknown behavior {behavior}")]
    UnknownBehavior { node: NodeId, behavior: BehaviorId },

    /// The behavior's source did not yield a usable `run` function.
    #[error("failed to load behavior {behavior} for node {node}: {source}")]
    BehaviorLoad {
        node: NodeId,
        behavior: BehaviorId,
        #[source]
        source: LoadError,
    },

    /// The node's function signalled failure.
    #[error("node {node} failed: {cause}")]
    NodeExecution {
        node: NodeId,
        #[source]
        cause: anyhow::Error,
    },

    /// The definition store has no such workflow.
    #[error("workflow {0} not found")]
    WorkflowNotFound(WorkflowId),

    /// The definition store could not be read.
    #[error("storage error: {0:#}")]
    Storage(#[source] anyhow::Error),

    /// The run's worker thread stopped without producing a result.
    #[error("run aborted: {0}")]
    Aborted(String),
}

/// Classification of an [`EngineError`], as exposed in failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DanglingEdge,
    DuplicateNode,
    CyclicGraph,
    UnknownNode,
    UnknownBehavior,
    BehaviorLoad,
    NodeExecution,
    WorkflowNotFound,
    Storage,
    Aborted,
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::DanglingEdge { .. } => FailureKind::DanglingEdge,
            Self::DuplicateNode(_) => FailureKind::DuplicateNode,
            Self::CyclicGraph { .. } => FailureKind::CyclicGraph,
            Self::UnknownNode(_) => FailureKind::UnknownNode,
            Self::UnknownBehavior { .. } => FailureKind::UnknownBehavior,
            Self::BehaviorLoad { .. } => FailureKind::BehaviorLoad,
            Self::NodeExecution { .. } => FailureKind::NodeExecution,
            Self::WorkflowNotFound(_) => FailureKind::WorkflowNotFound,
            Self::Storage(_) => FailureKind::Storage,
            Self::Aborted(_) => FailureKind::Aborted,
        }
    }

    /// The node implicated by this error, if any.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::DanglingEdge { missing, .. } => Some(*missing),
            Self::DuplicateNode(node) | Self::UnknownNode(node) => Some(*node),
            Self::UnknownBehavior { node, .. }
            | Self::BehaviorLoad { node, .. }
            | Self::NodeExecution { node, .. } => Some(*node),
            Self::CyclicGraph { .. }
            | Self::WorkflowNotFound(_)
            | Self::Storage(_)
            | Self::Aborted(_) => None,
        }
    }
}

/// Reasons a block of source text cannot be turned into a node function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The source text failed to parse or compile.
    #[error("failed to compile source: {0}")]
    Compile(String),

    /// No `run` symbol is defined.
    #[error("source does not define a `run` function")]
    MissingEntryPoint,

    /// `run` exists but cannot be called as `run(inputs, config)`.
    #[error("`run` must take 2 parameters (inputs, config), found {0}")]
    InvalidSignature(usize),

    /// No native function is registered under the given name.
    #[error("no native behavior registered as `{0}`")]
    UnknownNative(String),
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
