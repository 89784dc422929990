//! The `ExecutableNode` trait (the contract every node must fulfil) and the
//! `ExecutionContext` interface through which the host serves a node.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CredentialsError, NodeError};

// ---------------------------------------------------------------------------
// Host interface
// ---------------------------------------------------------------------------

/// Everything a node may ask of its host during one invocation.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Fetch the stored credentials of the given type as a JSON object.
    ///
    /// Hosts must return fresh values on every call; nodes never cache them.
    async fn fetch_credentials(&self, credential_type: &str) -> Result<Value, CredentialsError>;

    /// Resolve a parameter for the record at `record_index`.
    ///
    /// Returns `Ok(None)` when the parameter is not set, letting the node
    /// fall back to the default it declared in its [`NodeDescription`].
    fn get_parameter(&self, name: &str, record_index: usize) -> Result<Option<Value>, NodeError>;

    /// The input batch, in order.
    fn get_input_records(&self) -> Vec<Value>;

    /// HTTP transport owned by the host. Timeouts and TLS live here.
    fn http_client(&self) -> reqwest::Client;
}

// ---------------------------------------------------------------------------
// Node description
// ---------------------------------------------------------------------------

/// One selectable entry of a dropdown control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOption {
    pub label: String,
    pub value: String,
}

/// How the host renders a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKind {
    /// Free text.
    String,
    /// JSON document entered as text.
    Json,
    /// Dropdown, static or filled by an option-loading method.
    Options,
    /// Repeatable group of sub-fields.
    FixedCollection,
}

/// A parameter a node reads, with the value used when the host has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub default: Value,
    pub required: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
    /// Name of the option-loading method that populates this parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_options_method: Option<&'static str>,
}

/// One entry of a node's operation selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSpec {
    pub value: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Label shown when the node is offered as an action.
    pub action: &'static str,
}

/// Static description of a node, as presented to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescription {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub version: u32,
    pub group: Vec<&'static str>,
    /// Name given to a freshly placed node.
    pub default_name: &'static str,
    /// Whether the host may expose the node as a tool to agents.
    pub usable_as_tool: bool,
    pub credential_type: &'static str,
    pub operations: Vec<OperationSpec>,
    pub parameters: Vec<ParameterSpec>,
}

impl NodeDescription {
    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

// ---------------------------------------------------------------------------
// Node trait
// ---------------------------------------------------------------------------

/// The core node trait.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Static description of the node's parameters and credentials.
    fn description(&self) -> NodeDescription;

    /// Process the context's input batch and return exactly one output
    /// record per input record, in input order.
    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<Vec<Value>, NodeError>;

    /// Populate a dropdown control. Never fails: any problem yields no options.
    async fn load_options(&self, _method: &str, _ctx: &dyn ExecutionContext) -> Vec<PropertyOption> {
        Vec::new()
    }
}
