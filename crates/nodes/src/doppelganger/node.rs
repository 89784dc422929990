//! The Doppelganger node: run one remote task per input record.
//!
//! Per record, in order:
//! 1. (structured mode) reject any operation other than `executeTask`;
//! 2. read `taskId` and build the variables payload;
//! 3. fetch credentials and require a non-empty base URL;
//! 4. `POST {base}/tasks/{taskId}/api` and emit the response body.
//!
//! Steps 1 to 3 fail before any request is sent for that record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::client::DoppelgangerClient;
use super::credentials::{DoppelgangerCredentials, CREDENTIAL_TYPE};
use super::options::task_options;
use super::variables::VariableInput;
use crate::{
    ExecutableNode, ExecutionContext, NodeDescription, NodeError, OperationSpec, ParameterKind,
    ParameterSpec, PropertyOption,
};

/// The only operation the node offers.
pub const EXECUTE_TASK: &str = "executeTask";

/// Option-loading method backing the `taskId` dropdown.
pub const GET_TASKS: &str = "getTasks";

/// How the node's parameters are presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// `operation` selector, `taskId` dropdown, name/value variable rows.
    #[default]
    Structured,
    /// Free-text `taskId`, variables as a JSON document.
    RawJson,
}

/// Runs Doppelganger tasks.
#[derive(Debug, Clone, Default)]
pub struct DoppelgangerNode {
    mode: InputMode,
}

impl DoppelgangerNode {
    pub fn new(mode: InputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Read a parameter, falling back to the declared default.
    fn parameter(&self, ctx: &dyn ExecutionContext, name: &str, index: usize) -> Result<Value, NodeError> {
        if let Some(value) = ctx.get_parameter(name, index)? {
            return Ok(value);
        }
        self.description()
            .parameter(name)
            .map(|spec| spec.default.clone())
            .ok_or_else(|| NodeError::Parameter {
                item_index: index,
                name: name.to_owned(),
                message: "not set and has no default".into(),
            })
    }

    fn task_id(&self, ctx: &dyn ExecutionContext, index: usize) -> Result<String, NodeError> {
        match self.parameter(ctx, "taskId", index)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(NodeError::Parameter {
                item_index: index,
                name: "taskId".into(),
                message: format!("expected a string, got {other}"),
            }),
        }
    }

    fn variables(&self, ctx: &dyn ExecutionContext, index: usize) -> Result<Value, NodeError> {
        let raw = self.parameter(ctx, "variables", index)?;
        let input = match self.mode {
            InputMode::Structured => VariableInput::structured_from_parameter(&raw),
            InputMode::RawJson => VariableInput::RawJson(raw),
        };

        input
            .into_variables()
            .map_err(|e| NodeError::Validation {
                item_index: index,
                message: e.to_string(),
            })
    }

    async fn credentials(&self, ctx: &dyn ExecutionContext, index: usize) -> Result<DoppelgangerCredentials, NodeError> {
        let raw = ctx
            .fetch_credentials(CREDENTIAL_TYPE)
            .await
            .map_err(|e| NodeError::Configuration {
                item_index: index,
                message: e.to_string(),
            })?;

        DoppelgangerCredentials::from_value(raw).map_err(|e| NodeError::Configuration {
            item_index: index,
            message: e.to_string(),
        })
    }

    #[instrument(skip(self, ctx), fields(mode = ?self.mode))]
    async fn execute_record(&self, ctx: &dyn ExecutionContext, index: usize) -> Result<Value, NodeError> {
        if self.mode == InputMode::Structured {
            let operation = self.parameter(ctx, "operation", index)?;
            if operation.as_str() != Some(EXECUTE_TASK) {
                return Err(NodeError::Validation {
                    item_index: index,
                    message: "Unsupported operation.".into(),
                });
            }
        }

        let task_id = self.task_id(ctx, index)?;
        let variables = self.variables(ctx, index)?;

        let credentials = self.credentials(ctx, index).await?;
        if credentials.normalized_base_url().is_empty() {
            return Err(NodeError::Configuration {
                item_index: index,
                message: "Base URL is required in credentials.".into(),
            });
        }

        debug!(task_id = %task_id, "sending task execution");
        let client = DoppelgangerClient::new(ctx.http_client(), credentials);
        client
            .execute_task(&task_id, &variables)
            .await
            .map_err(|source| NodeError::Upstream {
                item_index: index,
                source,
            })
    }
}

#[async_trait]
impl ExecutableNode for DoppelgangerNode {
    fn description(&self) -> NodeDescription {
        let mut parameters = Vec::with_capacity(3);

        match self.mode {
            InputMode::Structured => {
                parameters.push(ParameterSpec {
                    name: "operation",
                    display_name: "Operation",
                    kind: ParameterKind::Options,
                    default: json!(EXECUTE_TASK),
                    required: true,
                    description: "",
                    load_options_method: None,
                });
                parameters.push(ParameterSpec {
                    name: "taskId",
                    display_name: "Task ID",
                    kind: ParameterKind::Options,
                    default: json!(""),
                    required: true,
                    description: "Task ID from the Doppelganger dashboard",
                    load_options_method: Some(GET_TASKS),
                });
                parameters.push(ParameterSpec {
                    name: "variables",
                    display_name: "Variables",
                    kind: ParameterKind::FixedCollection,
                    default: json!({}),
                    required: false,
                    description: "Optional task variables to override",
                    load_options_method: None,
                });
            }
            InputMode::RawJson => {
                parameters.push(ParameterSpec {
                    name: "taskId",
                    display_name: "Task ID",
                    kind: ParameterKind::String,
                    default: json!(""),
                    required: true,
                    description: "Task ID from the Doppelganger dashboard",
                    load_options_method: None,
                });
                parameters.push(ParameterSpec {
                    name: "variables",
                    display_name: "Variables (JSON)",
                    kind: ParameterKind::Json,
                    default: json!("{}"),
                    required: false,
                    description: "Optional task variables to override, as a JSON object",
                    load_options_method: None,
                });
            }
        }

        NodeDescription {
            name: "doppelganger",
            display_name: "Doppelganger",
            description: "Run a Doppelganger task via the API",
            version: 1,
            group: vec!["transform"],
            default_name: "Execute Task",
            usable_as_tool: true,
            credential_type: CREDENTIAL_TYPE,
            operations: vec![OperationSpec {
                value: EXECUTE_TASK,
                display_name: "Execute Task",
                description: "Run a Doppelganger task",
                action: "Execute a task",
            }],
            parameters,
        }
    }

    async fn execute(&self, ctx: &dyn ExecutionContext) -> Result<Vec<Value>, NodeError> {
        let records = ctx.get_input_records();
        let mut output = Vec::with_capacity(records.len());

        for index in 0..records.len() {
            output.push(self.execute_record(ctx, index).await?);
        }

        info!("doppelganger node processed {} records", output.len());
        Ok(output)
    }

    async fn load_options(&self, method: &str, ctx: &dyn ExecutionContext) -> Vec<PropertyOption> {
        if method != GET_TASKS {
            return Vec::new();
        }

        let credentials = match ctx.fetch_credentials(CREDENTIAL_TYPE).await {
            Ok(raw) => DoppelgangerCredentials::from_value(raw).unwrap_or_else(|_| DoppelgangerCredentials::new("", "")),
            Err(_) => return Vec::new(),
        };

        task_options(ctx.http_client(), credentials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockContext;
    use mockito::Matcher;

    fn structured_ctx(base_url: &str, records: usize) -> MockContext {
        MockContext::new(records)
            .with_credentials(json!({ "baseUrl": base_url, "apiKey": "k" }))
            .with_parameter("operation", json!(EXECUTE_TASK))
            .with_parameter("taskId", json!("abc"))
    }

    #[tokio::test]
    async fn posts_variables_for_each_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tasks/abc/api")
            .match_header("x-api-key", "k")
            .match_body(Matcher::Json(json!({ "variables": { "x": "1" } })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let ctx = structured_ctx(&format!("{}/", server.url()), 1)
            .with_parameter("variables", json!({ "values": [{ "name": "x", "value": "1" }] }));

        let out = DoppelgangerNode::default().execute(&ctx).await.unwrap();

        mock.assert_async().await;
        assert_eq!(out, vec![json!({ "ok": true })]);
    }

    #[tokio::test]
    async fn output_order_matches_input_order() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        let mut ctx = structured_ctx(&server.url(), 5);

        for i in 0..5 {
            mocks.push(
                server
                    .mock("POST", format!("/tasks/t{i}/api").as_str())
                    .with_status(200)
                    .with_header("content-type", "application/json")
                    .with_body(json!({ "record": i }).to_string())
                    .create_async()
                    .await,
            );
            ctx = ctx.with_record_parameter(i, "taskId", json!(format!("t{i}")));
        }

        let out = DoppelgangerNode::default().execute(&ctx).await.unwrap();

        assert_eq!(out.len(), 5);
        for (i, record) in out.iter().enumerate() {
            assert_eq!(record, &json!({ "record": i }));
        }
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn missing_variables_parameter_sends_empty_mapping() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tasks/abc/api")
            .match_body(Matcher::Json(json!({ "variables": {} })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let out = DoppelgangerNode::default()
            .execute(&structured_ctx(&server.url(), 1))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out, vec![json!({})]);
    }

    #[tokio::test]
    async fn unsupported_operation_fails_before_any_work() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let ctx = structured_ctx(&server.url(), 2)
            .with_record_parameter(0, "operation", json!("deleteTask"))
            .with_parameter("variables", json!({ "values": [{ "name": "x", "value": "1" }] }));
        let err = DoppelgangerNode::default().execute(&ctx).await.unwrap_err();

        assert!(matches!(err, NodeError::Validation { item_index: 0, .. }));
        assert_eq!(err.to_string(), "Unsupported operation. [item 0]");
        assert_eq!(ctx.credential_fetches(), 0);
        assert_eq!(ctx.parameter_reads(), vec![("operation".to_string(), 0)]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_base_url_fails_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let ctx = structured_ctx("//", 1);
        let err = DoppelgangerNode::default().execute(&ctx).await.unwrap_err();

        assert!(matches!(err, NodeError::Configuration { item_index: 0, .. }));
        assert_eq!(err.to_string(), "Base URL is required in credentials. [item 0]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalid_json_variables_fail_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let ctx = MockContext::new(1)
            .with_credentials(json!({ "baseUrl": server.url(), "apiKey": "k" }))
            .with_parameter("taskId", json!("abc"))
            .with_parameter("variables", json!("{oops"));

        let err = DoppelgangerNode::new(InputMode::RawJson).execute(&ctx).await.unwrap_err();

        match &err {
            NodeError::Validation { item_index, message } => {
                assert_eq!(*item_index, 0);
                assert!(message.starts_with("variables must be valid JSON"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ctx.credential_fetches(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blank_raw_json_variables_fail_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let ctx = MockContext::new(1)
            .with_credentials(json!({ "baseUrl": server.url(), "apiKey": "k" }))
            .with_parameter("taskId", json!("abc"))
            .with_parameter("variables", json!("   "));

        let err = DoppelgangerNode::new(InputMode::RawJson).execute(&ctx).await.unwrap_err();

        assert!(matches!(err, NodeError::Validation { item_index: 0, .. }));
        assert!(err.to_string().starts_with("variables must be valid JSON"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_structured_variables_send_empty_mapping() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tasks/abc/api")
            .match_body(Matcher::Json(json!({ "variables": {} })))
            .with_status(200)
            .with_body(r#"{"ran":true}"#)
            .create_async()
            .await;

        let ctx = structured_ctx(&server.url(), 1).with_parameter("variables", json!({ "values": "x=1" }));
        let out = DoppelgangerNode::default().execute(&ctx).await.unwrap();

        mock.assert_async().await;
        assert_eq!(out, vec![json!({ "ran": true })]);
    }

    #[tokio::test]
    async fn raw_json_mode_keeps_value_types_and_ignores_operation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tasks/my%20task/api")
            .match_body(Matcher::Json(json!({ "variables": { "limit": 3, "dry": true } })))
            .with_status(200)
            .with_body(r#"{"done":1}"#)
            .create_async()
            .await;

        let ctx = MockContext::new(1)
            .with_credentials(json!({ "baseUrl": server.url(), "apiKey": "k" }))
            .with_parameter("operation", json!("somethingElse"))
            .with_parameter("taskId", json!("my task"))
            .with_parameter("variables", json!(r#"{"limit": 3, "dry": true}"#));

        let out = DoppelgangerNode::new(InputMode::RawJson).execute(&ctx).await.unwrap();

        mock.assert_async().await;
        assert_eq!(out, vec![json!({ "done": 1 })]);
    }

    #[tokio::test]
    async fn upstream_failure_carries_record_index() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/tasks/abc/api")
            .with_status(502)
            .create_async()
            .await;

        let err = DoppelgangerNode::default()
            .execute(&structured_ctx(&server.url(), 1))
            .await
            .unwrap_err();

        assert!(matches!(err, NodeError::Upstream { item_index: 0, .. }));
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let ctx = structured_ctx("http://127.0.0.1:9", 0);
        let out = DoppelgangerNode::default().execute(&ctx).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(ctx.credential_fetches(), 0);
    }

    #[tokio::test]
    async fn load_options_serves_get_tasks_only() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tasks/list")
            .with_status(200)
            .with_body(r#"{"tasks":[{"id":"1","name":"Foo"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let ctx = structured_ctx(&server.url(), 0);
        let node = DoppelgangerNode::default();

        assert_eq!(
            node.load_options(GET_TASKS, &ctx).await,
            vec![PropertyOption { label: "Foo".into(), value: "1".into() }]
        );
        assert!(node.load_options("getWorkflows", &ctx).await.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn load_options_without_credentials_is_empty() {
        let ctx = MockContext::new(0);
        assert!(DoppelgangerNode::default().load_options(GET_TASKS, &ctx).await.is_empty());
    }

    #[test]
    fn description_differs_per_mode() {
        let structured = DoppelgangerNode::new(InputMode::Structured).description();
        let task_id = structured.parameter("taskId").unwrap();
        assert_eq!(task_id.load_options_method, Some(GET_TASKS));
        assert_eq!(task_id.kind, ParameterKind::Options);
        assert_eq!(task_id.description, "Task ID from the Doppelganger dashboard");
        assert_eq!(
            structured.parameter("variables").map(|p| p.kind),
            Some(ParameterKind::FixedCollection)
        );
        assert!(structured.parameter("operation").is_some());

        let raw_node = DoppelgangerNode::new(InputMode::RawJson);
        assert_eq!(raw_node.mode(), InputMode::RawJson);
        let raw = raw_node.description();
        assert!(raw.parameter("operation").is_none());
        assert_eq!(raw.parameter("taskId").map(|p| p.kind), Some(ParameterKind::String));
        assert_eq!(raw.parameter("variables").map(|p| p.default.clone()), Some(json!("{}")));
    }

    #[test]
    fn description_carries_node_metadata() {
        let d = DoppelgangerNode::default().description();
        assert_eq!(d.version, 1);
        assert_eq!(d.group, vec!["transform"]);
        assert_eq!(d.default_name, "Execute Task");
        assert!(d.usable_as_tool);
        assert_eq!(d.operations.len(), 1);
        assert_eq!(d.operations[0].value, EXECUTE_TASK);
        assert_eq!(d.operations[0].display_name, "Execute Task");
        assert_eq!(d.operations[0].action, "Execute a task");

        let printed = serde_json::to_value(&d).unwrap();
        assert_eq!(printed["parameters"][1]["type"], "options");
        assert_eq!(printed["parameters"][2]["type"], "fixedCollection");
        assert!(printed["parameters"][0].get("description").is_none());
    }
}
