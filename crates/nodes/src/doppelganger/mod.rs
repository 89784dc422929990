//! Doppelganger integration: run remote tasks through the Doppelganger API.
//!
//! - [`credentials`]: base URL + API key and the header authentication rule.
//! - [`client`]     : the two HTTP calls (list tasks, execute task).
//! - [`options`]    : task dropdown population.
//! - [`variables`]  : building the `variables` payload from node parameters.
//! - [`node`]       : the `ExecutableNode` implementation.

pub mod client;
pub mod credentials;
pub mod node;
pub mod options;
pub mod variables;

pub use client::{ClientError, DoppelgangerClient};
pub use credentials::{DoppelgangerCredentials, CREDENTIAL_TYPE};
pub use node::{DoppelgangerNode, InputMode, EXECUTE_TASK};
pub use options::task_options;
pub use variables::{VariableInput, VariablePair, VariablesError};
