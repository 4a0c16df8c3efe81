use super::{CodeLoader, NodeFunction};
use crate::error::LoadError;
use crate::types::NodeOutput;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of pre-registered Rust behaviors.
///
/// The behavior's source text, trimmed, is the registered name. Nothing is
/// compiled; an unregistered name fails to load.
#[derive(Clone, Default)]
pub struct NativeLoader {
    functions: HashMap<String, Arc<dyn NodeFunction>>,
}

impl NativeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure under `name`, replacing any previous registration
    pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&[NodeOutput], &serde_json::Value) -> anyhow::Result<NodeOutput>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    /// Register an already shared function under `name`
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        function: Arc<dyn NodeFunction>,
    ) -> &mut Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl CodeLoader for NativeLoader {
    fn load(&self, source: &str) -> Result<Arc<dyn NodeFunction>, LoadError> {
        let name = source.trim();
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::UnknownNative(name.to_string()))
    }
}
