//! `engine` crate: the host side: node definitions, the in-memory
//! execution context, and the executor that drives a node over a batch.

pub mod context;
pub mod error;
pub mod executor;
pub mod models;

pub use context::StaticContext;
pub use error::EngineError;
pub use executor::{ExecutionResult, ExecutorConfig, NodeExecutor};
pub use models::NodeDefinition;
