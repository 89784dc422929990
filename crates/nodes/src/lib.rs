//! `nodes` crate: the `ExecutableNode` contract and the Doppelganger node.
//!
//! A node is driven by the host through an [`ExecutionContext`]: the host
//! supplies credentials, per-record parameters and the input batch, and the
//! node returns one output record per input record.

pub mod doppelganger;
pub mod error;
pub mod mock;
pub mod traits;

pub use doppelganger::{DoppelgangerNode, InputMode};
pub use error::{CredentialsError, NodeError};
pub use traits::{
    ExecutableNode, ExecutionContext, NodeDescription, OperationSpec, ParameterKind, ParameterSpec,
    PropertyOption,
};
