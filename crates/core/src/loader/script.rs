use super::{CodeLoader, NodeFunction, ENTRY_POINT};
use crate::error::LoadError;
use crate::types::NodeOutput;
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, Scope, AST};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource limits for behavior scripts. `0` means unlimited for every limit
/// except `max_call_levels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on script operations per call
    #[serde(default)]
    pub max_operations: u64,

    /// Maximum function call nesting depth
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    #[serde(default)]
    pub max_string_size: usize,

    #[serde(default)]
    pub max_array_size: usize,

    #[serde(default)]
    pub max_map_size: usize,
}

fn default_max_call_levels() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: default_max_call_levels(),
            max_string_size: 0,
            max_array_size: 0,
            max_map_size: 0,
        }
    }
}

/// Loads behaviors written as Rhai scripts.
///
/// A behavior must define `fn run(inputs, config)`. `inputs` arrives as an
/// array with `()` standing in for absent predecessor outputs and `config` as
/// an object map. Returning `()` records an absence.
///
/// Every loaded script is its own AST and every call runs in a fresh scope
/// without evaluating top-level statements, so nothing one behavior defines
/// is visible to another.
pub struct ScriptLoader {
    engine: Arc<Engine>,
}

impl ScriptLoader {
    pub fn new(config: &EngineConfig) -> Self {
        let mut engine = Engine::new();

        engine.on_print(|text| tracing::info!(target: "fremen::script", "{}", text));
        engine.on_debug(|text, source, pos| {
            tracing::debug!(target: "fremen::script", "{} ({:?} {})", text, source, pos)
        });

        engine.set_max_operations(config.max_operations);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);
        engine.set_max_map_size(config.max_map_size);

        Self {
            engine: Arc::new(engine),
        }
    }
}

impl Default for ScriptLoader {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CodeLoader for ScriptLoader {
    fn load(&self, source: &str) -> Result<Arc<dyn NodeFunction>, LoadError> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| LoadError::Compile(e.to_string()))?;

        let arities: Vec<usize> = ast
            .iter_functions()
            .filter(|f| f.name == ENTRY_POINT)
            .map(|f| f.params.len())
            .collect();

        match arities.as_slice() {
            [] => return Err(LoadError::MissingEntryPoint),
            found if !found.contains(&2) => return Err(LoadError::InvalidSignature(found[0])),
            _ => {}
        }

        Ok(Arc::new(ScriptFunction {
            engine: self.engine.clone(),
            ast,
        }))
    }
}

struct ScriptFunction {
    engine: Arc<Engine>,
    ast: AST,
}

impl NodeFunction for ScriptFunction {
    fn call(&self, inputs: &[NodeOutput], config: &serde_json::Value) -> anyhow::Result<NodeOutput> {
        let inputs: Vec<serde_json::Value> = inputs
            .iter()
            .map(|input| input.clone().unwrap_or(serde_json::Value::Null))
            .collect();
        let inputs = rhai::serde::to_dynamic(&inputs).map_err(script_error)?;
        let config = rhai::serde::to_dynamic(config).map_err(script_error)?;

        let mut scope = Scope::new();
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        let result: Dynamic = self
            .engine
            .call_fn_with_options(options, &mut scope, &self.ast, ENTRY_POINT, (inputs, config))
            .map_err(script_error)?;

        if result.is_unit() {
            return Ok(None);
        }

        let value: serde_json::Value = rhai::serde::from_dynamic(&result).map_err(script_error)?;
        Ok(Some(value))
    }
}

fn script_error(err: Box<EvalAltResult>) -> anyhow::Error {
    anyhow::anyhow!("{}", err)
}
