use crate::error::{EngineError, EngineResult};
use crate::loader::CodeLoader;
use crate::storage::BehaviorStore;
use crate::types::{Node, NodeOutput, RunId};
use std::sync::Arc;

/// Executes a single node: resolves its behavior, loads the code, parses the
/// configuration and invokes the function
pub struct NodeExecutor {
    behaviors: Arc<dyn BehaviorStore>,
    loader: Arc<dyn CodeLoader>,
}

impl NodeExecutor {
    pub fn new(behaviors: Arc<dyn BehaviorStore>, loader: Arc<dyn CodeLoader>) -> Self {
        Self { behaviors, loader }
    }

    /// Execute a node with its already-resolved inputs
    pub fn execute(&self, run_id: RunId, node: &Node, inputs: &[NodeOutput]) -> EngineResult<NodeOutput> {
        // Placeholder nodes produce nothing and never fail
        let Some(behavior_id) = node.behavior_id else {
            tracing::debug!("Node {} has no behavior, recording absence (run {})", node.id, run_id);
            return Ok(None);
        };

        let behavior = self
            .behaviors
            .behavior(behavior_id)
            .map_err(EngineError::Storage)?
            .ok_or(EngineError::UnknownBehavior {
                node: node.id,
                behavior: behavior_id,
            })?;

        let function = self
            .loader
            .load(&behavior.code)
            .map_err(|source| EngineError::BehaviorLoad {
                node: node.id,
                behavior: behavior_id,
                source,
            })?;

        let config = parse_config(node);

        tracing::debug!(
            "Invoking behavior {} ({}) for node {} with {} inputs (run {})",
            behavior.name,
            behavior_id,
            node.id,
            inputs.len(),
            run_id
        );

        let start = std::time::Instant::now();
        let output = function
            .call(inputs, &config)
            .map_err(|cause| EngineError::NodeExecution {
                node: node.id,
                cause,
            })?;

        tracing::debug!("Node {} finished in {:?}", node.id, start.elapsed());

        Ok(output)
    }
}

/// Parse a node's configuration payload.
///
/// Missing, blank or malformed payloads become an empty mapping; a malformed
/// payload never fails the run.
pub fn parse_config(node: &Node) -> serde_json::Value {
    let empty = || serde_json::Value::Object(serde_json::Map::new());

    let Some(raw) = node.config.as_deref().filter(|raw| !raw.trim().is_empty()) else {
        return empty();
    };

    match serde_json::from_str(raw) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                "Ignoring unparseable configuration for node {}: {}",
                node.id,
                e
            );
            empty()
        }
    }
}
