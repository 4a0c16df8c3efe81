//! Turning behavior source text into invocable node functions.
//!
//! A [`CodeLoader`] takes the source of a behavior and returns a
//! [`NodeFunction`] with the fixed `run(inputs, config)` contract. Two loaders
//! are provided: [`ScriptLoader`], which compiles Rhai scripts, and
//! [`NativeLoader`], which resolves the source text as the name of a
//! pre-registered Rust function.

pub mod native;
pub mod script;

pub use native::NativeLoader;
pub use script::{EngineConfig, ScriptLoader};

use crate::error::LoadError;
use crate::types::NodeOutput;
use std::sync::Arc;

/// Name of the symbol every behavior must define
pub const ENTRY_POINT: &str = "run";

/// A loaded behavior, ready to be invoked with its inputs and configuration
pub trait NodeFunction: Send + Sync {
    /// Run the behavior. `inputs` holds one entry per incoming edge.
    fn call(&self, inputs: &[NodeOutput], config: &serde_json::Value) -> anyhow::Result<NodeOutput>;
}

impl<F> NodeFunction for F
where
    F: Fn(&[NodeOutput], &serde_json::Value) -> anyhow::Result<NodeOutput> + Send + Sync,
{
    fn call(&self, inputs: &[NodeOutput], config: &serde_json::Value) -> anyhow::Result<NodeOutput> {
        self(inputs, config)
    }
}

/// Compiles behavior source text into a [`NodeFunction`]
pub trait CodeLoader: Send + Sync {
    fn load(&self, source: &str) -> Result<Arc<dyn NodeFunction>, LoadError>;
}
