//! Engine-level error types.

use thiserror::Error;

use nodes::NodeError;

/// Errors produced while executing a node over a batch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No implementation is registered for the definition's `node_type`.
    #[error("no implementation registered for node_type '{0}'")]
    UnknownNodeType(String),

    /// The HTTP transport could not be built from the executor config.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A record failed and the definition does not continue on failure.
    #[error("node failed on item {item_index}: {source}")]
    NodeFailed {
        item_index: usize,
        #[source]
        source: NodeError,
    },
}

impl From<NodeError> for EngineError {
    fn from(source: NodeError) -> Self {
        EngineError::NodeFailed {
            item_index: source.item_index(),
            source,
        }
    }
}
