//! Task dropdown population.
//!
//! This path feeds a UI control, so it never fails: a missing base URL, a
//! failed request or a malformed listing all produce an empty option list.

use serde_json::Value;
use tracing::warn;

use super::client::DoppelgangerClient;
use super::credentials::DoppelgangerCredentials;
use crate::PropertyOption;

/// Fetch the task listing and turn it into dropdown options.
pub async fn task_options(http: reqwest::Client, credentials: DoppelgangerCredentials) -> Vec<PropertyOption> {
    if credentials.normalized_base_url().is_empty() {
        return Vec::new();
    }

    let client = DoppelgangerClient::new(http, credentials);
    match client.list_tasks().await {
        Ok(body) => options_from_listing(&body),
        Err(e) => {
            warn!("could not list doppelganger tasks: {e}");
            Vec::new()
        }
    }
}

/// Map a `{"tasks": [{id, name?}, ...]}` body to `{label, value}` pairs.
///
/// `label` is the name, falling back to the id; entries without a usable id
/// are dropped.
pub fn options_from_listing(body: &Value) -> Vec<PropertyOption> {
    let Some(tasks) = body.get("tasks").and_then(Value::as_array) else {
        return Vec::new();
    };

    tasks
        .iter()
        .filter_map(|task| {
            let value = field_text(task, "id")?;
            let label = field_text(task, "name").unwrap_or_else(|| value.clone());
            Some(PropertyOption { label, value })
        })
        .collect()
}

/// Text of a field, treating the values JavaScript considers falsy
/// (`null`, `false`, `0`, `""`, absent) as missing. Everything else is
/// stringified: `true` as `"true"`, arrays and objects as their JSON text.
fn field_text(task: &Value, field: &str) -> Option<String> {
    match task.get(field)? {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_owned()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
