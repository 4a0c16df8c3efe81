// Core engine for Fremen workflow execution

pub mod error;
pub mod loader;
pub mod storage;
pub mod types;
pub mod workflow;

pub use error::{EngineError, EngineResult, FailureKind, LoadError};
pub use types::*;
