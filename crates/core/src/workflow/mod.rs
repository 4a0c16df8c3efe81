//! Graph construction, scheduling and execution of workflows.

pub mod dag;
pub mod executor;
pub mod node_executor;
pub mod report;
pub mod runner;
pub mod schedule;

pub use dag::WorkflowDag;
pub use executor::WorkflowExecutor;
pub use node_executor::{parse_config, NodeExecutor};
pub use report::{RunOutcome, RunReport};
pub use runner::WorkflowRunner;
pub use schedule::topological_order;
