//! HTTP client for the Doppelganger API.
//!
//! Two endpoints are used:
//! - `GET  {base}/api/tasks/list`
//! - `POST {base}/tasks/{taskId}/api` with body `{"variables": ...}`
//!
//! No retries, no backoff: a transport failure or non-2xx status is returned
//! to the caller unchanged.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::credentials::DoppelgangerCredentials;

/// Characters left untouched by `encodeURIComponent`-style encoding.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Errors from a single API call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Percent-encode a task id for use as a single path segment.
pub fn encode_task_id(task_id: &str) -> String {
    utf8_percent_encode(task_id, URI_COMPONENT).to_string()
}

/// Authenticated client bound to one set of credentials.
#[derive(Debug, Clone)]
pub struct DoppelgangerClient {
    http: Client,
    credentials: DoppelgangerCredentials,
}

impl DoppelgangerClient {
    pub fn new(http: Client, credentials: DoppelgangerCredentials) -> Self {
        Self { http, credentials }
    }

    /// Base URL with trailing slashes stripped.
    pub fn base_url(&self) -> &str {
        self.credentials.normalized_base_url()
    }

    pub fn list_tasks_url(&self) -> String {
        format!("{}/api/tasks/list", self.base_url())
    }

    pub fn execute_task_url(&self, task_id: &str) -> String {
        format!("{}/tasks/{}/api", self.base_url(), encode_task_id(task_id))
    }

    /// Fetch the raw task listing.
    pub async fn list_tasks(&self) -> Result<Value, ClientError> {
        let url = parse_url(&self.list_tasks_url())?;
        debug!(%url, "listing doppelganger tasks");
        self.send(self.http.get(url)).await
    }

    /// Run a task and return the response body verbatim.
    pub async fn execute_task(&self, task_id: &str, variables: &Value) -> Result<Value, ClientError> {
        let url = parse_url(&self.execute_task_url(task_id))?;
        debug!(%url, "executing doppelganger task");
        let body = json!({ "variables": variables });
        self.send(self.http.post(url).json(&body)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ClientError> {
        let response = self
            .credentials
            .authenticate(request)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

fn parse_url(raw: &str) -> Result<Url, ClientError> {
    Url::parse(raw).map_err(|source| ClientError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })
}
