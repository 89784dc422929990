//! Node definitions as the host stores them.
//!
//! A definition is plain JSON so it can be kept in a file next to the
//! records it processes:
//!
//! ```json
//! {
//!   "node_type": "doppelganger",
//!   "mode": "structured",
//!   "parameters": { "taskId": "abc", "variables": { "values": [{ "name": "x", "value": "1" }] } },
//!   "credentials": { "baseUrl": "http://localhost:11345", "apiKey": "..." },
//!   "continue_on_fail": false
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use nodes::InputMode;

/// Node type of the Doppelganger node in the registry.
pub const DOPPELGANGER_NODE_TYPE: &str = "doppelganger";

fn default_node_type() -> String {
    DOPPELGANGER_NODE_TYPE.to_owned()
}

/// A single configured node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Maps to a registered `ExecutableNode` implementation.
    #[serde(default = "default_node_type")]
    pub node_type: String,
    /// Presentation mode of the node's parameters.
    #[serde(default)]
    pub mode: InputMode,
    /// Parameter values, applied to every record.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Credential values handed to the node when it asks for its credentials.
    #[serde(default)]
    pub credentials: Option<Value>,
    /// Keep going after a record fails, emitting an error record in its place.
    #[serde(default)]
    pub continue_on_fail: bool,
}

impl NodeDefinition {
    /// Convenience constructor for a Doppelganger node.
    pub fn doppelganger(mode: InputMode) -> Self {
        Self {
            node_type: default_node_type(),
            mode,
            parameters: Map::new(),
            credentials: None,
            continue_on_fail: false,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_credentials(mut self, credentials: Value) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn continue_on_fail(mut self, enabled: bool) -> Self {
        self.continue_on_fail = enabled;
        self
    }
}
