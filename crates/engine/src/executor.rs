//! Node execution.
//!
//! `NodeExecutor` drives one node over a batch of records:
//! 1. Looks up the implementation for the definition's `node_type`.
//! 2. Builds a [`StaticContext`] from the definition and the records.
//! 3. Without `continue_on_fail`, invokes the node once over the whole batch;
//!    the first failing record aborts the run.
//! 4. With `continue_on_fail`, invokes the node once per record and emits an
//!    `{"error": ...}` record in place of each failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use nodes::{DoppelgangerNode, ExecutableNode, PropertyOption};

use crate::models::DOPPELGANGER_NODE_TYPE;
use crate::{EngineError, NodeDefinition, StaticContext};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Per-request timeout applied to the shared HTTP client. `None` leaves
    /// reqwest's default (no timeout).
    pub request_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Node registry
// ---------------------------------------------------------------------------

/// Builds a node instance from its definition.
pub type NodeFactory = fn(&NodeDefinition) -> Arc<dyn ExecutableNode>;

/// Maps `node_type` strings to node factories.
pub type NodeRegistry = HashMap<String, NodeFactory>;

/// Registry containing every built-in node.
pub fn default_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.insert(DOPPELGANGER_NODE_TYPE.to_owned(), doppelganger_node as NodeFactory);
    registry
}

fn doppelganger_node(definition: &NodeDefinition) -> Arc<dyn ExecutableNode> {
    Arc::new(DoppelgangerNode::new(definition.mode))
}

// ---------------------------------------------------------------------------
// Output of a completed execution
// ---------------------------------------------------------------------------

/// The result of running a node over a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// One record per input record, in input order.
    pub output: Vec<Value>,
    /// Indices of records replaced by an error record (`continue_on_fail` only).
    pub failed: Vec<usize>,
}

// ---------------------------------------------------------------------------
// NodeExecutor
// ---------------------------------------------------------------------------

/// Stateless driver; construct once and call [`NodeExecutor::run`] per batch.
pub struct NodeExecutor {
    registry: NodeRegistry,
    http: reqwest::Client,
}

impl NodeExecutor {
    /// Create an executor with the given registry.
    ///
    /// # Errors
    /// Returns [`EngineError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(registry: NodeRegistry, config: ExecutorConfig) -> Result<Self, EngineError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            registry,
            http: builder.build()?,
        })
    }

    /// Executor with the built-in nodes and default config.
    pub fn with_defaults() -> Result<Self, EngineError> {
        Self::new(default_registry(), ExecutorConfig::default())
    }

    fn node(&self, definition: &NodeDefinition) -> Result<Arc<dyn ExecutableNode>, EngineError> {
        self.registry
            .get(&definition.node_type)
            .map(|factory| factory(definition))
            .ok_or_else(|| EngineError::UnknownNodeType(definition.node_type.clone()))
    }

    /// Run the node over `records` and return the output batch.
    ///
    /// # Errors
    /// Returns `EngineError` for an unknown node type, or the first record
    /// failure when `continue_on_fail` is off.
    #[instrument(skip(self, definition, records), fields(node_type = %definition.node_type, records = records.len()))]
    pub async fn run(&self, definition: &NodeDefinition, records: Vec<Value>) -> Result<ExecutionResult, EngineError> {
        let node = self.node(definition)?;
        let ctx = StaticContext::new(definition, records, self.http.clone());

        if !definition.continue_on_fail {
            let output = node.execute(&ctx).await.map_err(|e| {
                error!("node '{}' failed: {}", definition.node_type, e);
                EngineError::from(e)
            })?;
            info!("node '{}' succeeded on {} records", definition.node_type, output.len());
            return Ok(ExecutionResult { output, failed: Vec::new() });
        }

        let mut output = Vec::with_capacity(ctx.len());
        let mut failed = Vec::new();

        for index in 0..ctx.len() {
            let Some(view) = ctx.single(index) else { break };

            match node.execute(&view).await {
                Ok(mut records) if records.len() == 1 => output.push(records.remove(0)),
                Ok(records) => {
                    warn!("node returned {} records for item {}", records.len(), index);
                    failed.push(index);
                    output.push(json!({ "error": format!("expected 1 output record, got {}", records.len()) }));
                }
                Err(e) => {
                    let e = e.with_item_index(index);
                    warn!("item {} failed, continuing: {}", index, e);
                    failed.push(index);
                    output.push(json!({ "error": e.to_string() }));
                }
            }
        }

        info!(
            "node '{}' finished {} records ({} failed)",
            definition.node_type,
            output.len(),
            failed.len()
        );
        Ok(ExecutionResult { output, failed })
    }

    /// Serve an option-loading method of the definition's node.
    ///
    /// Never fails on the node side; only an unknown node type is an error.
    pub async fn load_options(&self, definition: &NodeDefinition, method: &str) -> Result<Vec<PropertyOption>, EngineError> {
        let node = self.node(definition)?;
        let ctx = StaticContext::new(definition, Vec::new(), self.http.clone());
        Ok(node.load_options(method, &ctx).await)
    }
}
