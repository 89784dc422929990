//! Building the `variables` payload sent with a task execution.
//!
//! Two input shapes are supported and kept deliberately distinct:
//! - [`VariableInput::Structured`]: repeatable name/value pairs. Every value
//!   ends up as a JSON string.
//! - [`VariableInput::RawJson`]: a JSON document (or JSON text) that is sent
//!   as-is, so values keep their JSON types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VariablesError {
    #[error("variables must be valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// One name/value row of the structured variables control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariablePair {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl VariablePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }
}

/// Variables as read from the node parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableInput {
    Structured(Vec<VariablePair>),
    RawJson(Value),
}

impl VariableInput {
    /// Decode the structured control's parameter value.
    ///
    /// Hosts store it as `{"values": [{name, value}, ...]}`; a bare array of
    /// pairs is also accepted. Any other shape means "no variables", and
    /// rows that are not objects contribute a nameless pair that is dropped.
    pub fn structured_from_parameter(raw: &Value) -> Self {
        let rows: &[Value] = match raw {
            Value::Array(rows) => rows.as_slice(),
            Value::Object(obj) => match obj.get("values") {
                Some(Value::Array(rows)) => rows.as_slice(),
                _ => &[],
            },
            _ => &[],
        };

        let pairs = rows
            .iter()
            .map(|row| VariablePair {
                name: row.get("name").and_then(scalar_text),
                value: row.get("value").and_then(scalar_text),
            })
            .collect();

        Self::Structured(pairs)
    }

    /// Produce the value sent as `variables` in the request body.
    pub fn into_variables(self) -> Result<Value, VariablesError> {
        match self {
            VariableInput::Structured(pairs) => Ok(Value::Object(structured_variables(&pairs))),
            VariableInput::RawJson(raw) => raw_json_variables(raw),
        }
    }
}

/// Merge name/value pairs into a mapping.
///
/// Names are trimmed; blank names are dropped; a missing value becomes `""`;
/// the last occurrence of a name wins.
pub fn structured_variables(pairs: &[VariablePair]) -> Map<String, Value> {
    let mut variables = Map::new();
    for pair in pairs {
        let key = pair.name.as_deref().unwrap_or_default().trim();
        if key.is_empty() {
            continue;
        }
        let value = pair.value.clone().unwrap_or_default();
        variables.insert(key.to_owned(), Value::String(value));
    }
    variables
}

/// Interpret a raw JSON variables parameter.
///
/// Text is parsed as JSON, so blank text is rejected like any other invalid
/// document; any other value is passed through unchanged.
pub fn raw_json_variables(raw: Value) -> Result<Value, VariablesError> {
    match raw {
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        other => Ok(other),
    }
}

/// Text form of a scalar cell. Host expressions may yield numbers or booleans
/// where the control expects a string.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_names_are_dropped_and_last_duplicate_wins() {
        let pairs = vec![
            VariablePair::new("  city ", "Paris"),
            VariablePair::new("   ", "ignored"),
            VariablePair { name: None, value: Some("ignored".into()) },
            VariablePair::new("city", "Berlin"),
            VariablePair { name: Some("empty".into()), value: None },
        ];
        let vars = structured_variables(&pairs);
        assert_eq!(Value::Object(vars), json!({ "city": "Berlin", "empty": "" }));
    }

    #[test]
    fn key_order_does_not_affect_equality() {
        let a = structured_variables(&[VariablePair::new("a", "1"), VariablePair::new("b", "2")]);
        let b = structured_variables(&[VariablePair::new("b", "2"), VariablePair::new("a", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn structured_parameter_accepts_host_shapes() {
        let from_collection = VariableInput::structured_from_parameter(&json!({
            "values": [{ "name": "x", "value": "1" }, { "name": "n", "value": 5 }]
        }));
        assert_eq!(
            from_collection.into_variables().unwrap(),
            json!({ "x": "1", "n": "5" })
        );

        for empty in [json!(null), json!({}), json!([])] {
            let input = VariableInput::structured_from_parameter(&empty);
            assert_eq!(input.into_variables().unwrap(), json!({}));
        }
    }

    #[test]
    fn unexpected_structured_shapes_mean_no_variables() {
        for shape in [
            json!("x=1"),
            json!(42),
            json!({ "values": "x" }),
            json!({ "values": { "name": "x" } }),
        ] {
            let input = VariableInput::structured_from_parameter(&shape);
            assert_eq!(input.into_variables().unwrap(), json!({}), "shape {shape}");
        }

        let mixed = VariableInput::structured_from_parameter(&json!({
            "values": ["junk", { "name": "k", "value": "v" }]
        }));
        assert_eq!(mixed.into_variables().unwrap(), json!({ "k": "v" }));
    }

    #[test]
    fn raw_json_text_is_parsed_with_types_preserved() {
        let input = VariableInput::RawJson(json!(r#"{"limit": 5, "tags": ["a"], "on": true}"#));
        assert_eq!(
            input.into_variables().unwrap(),
            json!({ "limit": 5, "tags": ["a"], "on": true })
        );
    }

    #[test]
    fn raw_json_object_passes_through() {
        let obj = json!({ "nested": { "k": 1 } });
        assert_eq!(VariableInput::RawJson(obj.clone()).into_variables().unwrap(), obj);
    }

    #[test]
    fn raw_json_blank_text_is_invalid() {
        for blank in ["", "   "] {
            let err = raw_json_variables(json!(blank)).unwrap_err();
            assert!(matches!(err, VariablesError::InvalidJson(_)));
        }
    }

    #[test]
    fn invalid_raw_json_is_rejected() {
        let err = raw_json_variables(json!("{not json")).unwrap_err();
        assert!(matches!(err, VariablesError::InvalidJson(_)));
        assert!(err.to_string().starts_with("variables must be valid JSON"));
    }
}
