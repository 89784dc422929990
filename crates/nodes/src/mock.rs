//! `MockContext`: a test double for `ExecutionContext`.
//!
//! Useful in unit and integration tests where a real host is either
//! unavailable or irrelevant. It records every credential fetch and
//! parameter read so tests can assert what a node touched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{CredentialsError, ExecutionContext, NodeError};

/// In-memory host with static and per-record parameters.
#[derive(Debug, Clone, Default)]
pub struct MockContext {
    /// Input batch handed to the node.
    pub records: Vec<Value>,
    /// Returned by `fetch_credentials`; `None` means "not configured".
    pub credentials: Option<Value>,
    /// Parameters shared by every record.
    pub parameters: HashMap<String, Value>,
    /// Per-record overrides, keyed by record index.
    pub record_parameters: HashMap<usize, HashMap<String, Value>>,
    /// Number of `fetch_credentials` calls.
    pub fetches: Arc<Mutex<usize>>,
    /// Every `(name, record_index)` passed to `get_parameter`, in call order.
    pub reads: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockContext {
    /// A context with `records` input records of the form `{"index": i}`.
    pub fn new(records: usize) -> Self {
        Self::with_records((0..records).map(|i| json!({ "index": i })).collect())
    }

    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Value) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_record_parameter(mut self, index: usize, name: impl Into<String>, value: Value) -> Self {
        self.record_parameters
            .entry(index)
            .or_default()
            .insert(name.into(), value);
        self
    }

    pub fn credential_fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    pub fn parameter_reads(&self) -> Vec<(String, usize)> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionContext for MockContext {
    async fn fetch_credentials(&self, credential_type: &str) -> Result<Value, CredentialsError> {
        *self.fetches.lock().unwrap() += 1;
        self.credentials
            .clone()
            .ok_or_else(|| CredentialsError::NotConfigured(credential_type.to_owned()))
    }

    fn get_parameter(&self, name: &str, record_index: usize) -> Result<Option<Value>, NodeError> {
        self.reads.lock().unwrap().push((name.to_owned(), record_index));

        if record_index >= self.records.len() {
            return Err(NodeError::Parameter {
                item_index: record_index,
                name: name.to_owned(),
                message: format!("record index out of range (batch has {})", self.records.len()),
            });
        }

        let value = self
            .record_parameters
            .get(&record_index)
            .and_then(|params| params.get(name))
            .or_else(|| self.parameters.get(name))
            .cloned();
        Ok(value)
    }

    fn get_input_records(&self) -> Vec<Value> {
        self.records.clone()
    }

    fn http_client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }
}
