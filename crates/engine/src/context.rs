//! `StaticContext`: the engine's `ExecutionContext` implementation.
//!
//! Parameters come from a [`NodeDefinition`] and are identical for every
//! record; expressions are not evaluated.

use async_trait::async_trait;
use serde_json::{Map, Value};

use nodes::{CredentialsError, ExecutionContext, NodeError};

use crate::NodeDefinition;

#[derive(Debug, Clone)]
pub struct StaticContext {
    parameters: Map<String, Value>,
    credentials: Option<Value>,
    records: Vec<Value>,
    http: reqwest::Client,
}

impl StaticContext {
    pub fn new(definition: &NodeDefinition, records: Vec<Value>, http: reqwest::Client) -> Self {
        Self {
            parameters: definition.parameters.clone(),
            credentials: definition.credentials.clone(),
            records,
            http,
        }
    }

    /// A view of the same node holding only the record at `index`.
    ///
    /// Returns `None` when `index` is out of range.
    pub fn single(&self, index: usize) -> Option<Self> {
        let record = self.records.get(index)?.clone();
        Some(Self {
            parameters: self.parameters.clone(),
            credentials: self.credentials.clone(),
            records: vec![record],
            http: self.http.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ExecutionContext for StaticContext {
    async fn fetch_credentials(&self, credential_type: &str) -> Result<Value, CredentialsError> {
        self.credentials
            .clone()
            .ok_or_else(|| CredentialsError::NotConfigured(credential_type.to_owned()))
    }

    fn get_parameter(&self, name: &str, record_index: usize) -> Result<Option<Value>, NodeError> {
        if record_index >= self.records.len() {
            return Err(NodeError::Parameter {
                item_index: record_index,
                name: name.to_owned(),
                message: format!("no input record at index {record_index}"),
            });
        }
        Ok(self.parameters.get(name).cloned())
    }

    fn get_input_records(&self) -> Vec<Value> {
        self.records.clone()
    }

    fn http_client(&self) -> reqwest::Client {
        self.http.clone()
    }
}
