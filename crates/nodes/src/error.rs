//! Node-level error types.

use thiserror::Error;

use crate::doppelganger::client::ClientError;

/// Errors returned by a node's `execute` method.
///
/// Every variant carries the index of the input record being processed when
/// the failure happened, so the host can attribute it.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Credentials are missing or incomplete (e.g. an empty base URL).
    #[error("{message} [item {item_index}]")]
    Configuration { item_index: usize, message: String },

    /// A parameter value was rejected before any request was sent.
    #[error("{message} [item {item_index}]")]
    Validation { item_index: usize, message: String },

    /// A parameter could not be resolved from the host.
    #[error("parameter '{name}': {message} [item {item_index}]")]
    Parameter {
        item_index: usize,
        name: String,
        message: String,
    },

    /// The remote API call failed; the client error is passed through as-is.
    #[error("request failed [item {item_index}]: {source}")]
    Upstream {
        item_index: usize,
        #[source]
        source: ClientError,
    },
}

impl NodeError {
    /// Index of the input record the error belongs to.
    pub fn item_index(&self) -> usize {
        match self {
            NodeError::Configuration { item_index, .. }
            | NodeError::Validation { item_index, .. }
            | NodeError::Parameter { item_index, .. }
            | NodeError::Upstream { item_index, .. } => *item_index,
        }
    }

    /// Re-attribute the error to another record index.
    ///
    /// Used by hosts that run records one at a time through a single-record
    /// view of the batch.
    pub fn with_item_index(mut self, index: usize) -> Self {
        match &mut self {
            NodeError::Configuration { item_index, .. }
            | NodeError::Validation { item_index, .. }
            | NodeError::Parameter { item_index, .. }
            | NodeError::Upstream { item_index, .. } => *item_index = index,
        }
        self
    }
}

/// Errors a host may return when asked for credentials.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// No credentials of the requested type are configured.
    #[error("no credentials configured for '{0}'")]
    NotConfigured(String),

    /// The stored credentials could not be decoded.
    #[error("invalid credentials for '{credential_type}': {message}")]
    Invalid {
        credential_type: String,
        message: String,
    },
}
