//! `doppelganger` CLI entry-point.
//!
//! Available sub-commands:
//! - `describe`  : print the node and credential descriptions.
//! - `list-tasks`: print the task dropdown options.
//! - `execute`   : run a task once per input record.
//! - `run`       : execute a node definition file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use engine::executor::{default_registry, ExecutorConfig, NodeExecutor};
use engine::NodeDefinition;
use nodes::doppelganger::credentials::{self, DEFAULT_BASE_URL};
use nodes::doppelganger::node::GET_TASKS;
use nodes::{DoppelgangerNode, ExecutableNode, InputMode};

#[derive(Parser)]
#[command(
    name = "doppelganger",
    about = "Run Doppelganger tasks over batches of JSON records",
    version
)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Connection {
    /// Doppelganger server base URL.
    #[arg(long, env = "DOPPELGANGER_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// API key from Doppelganger Settings. Required by every command that
    /// talks to the server.
    #[arg(long, env = "DOPPELGANGER_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

impl Connection {
    fn credentials(&self) -> anyhow::Result<Value> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => bail!("API key is required: pass --api-key or set DOPPELGANGER_API_KEY"),
        };
        Ok(json!({ "baseUrl": self.base_url, "apiKey": api_key }))
    }

    fn executor(&self) -> anyhow::Result<NodeExecutor> {
        let config = ExecutorConfig {
            request_timeout: self.timeout_secs.map(Duration::from_secs),
        };
        NodeExecutor::new(default_registry(), config).context("failed to set up executor")
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the node and credential descriptions as JSON.
    Describe {
        /// Describe the free-text / raw JSON variant.
        #[arg(long)]
        raw_json: bool,
    },
    /// List the tasks available on the server.
    ListTasks,
    /// Execute a task once per input record.
    Execute {
        /// Task ID from the Doppelganger dashboard.
        #[arg(long)]
        task_id: String,

        /// Variable override as `name=value`; repeatable.
        #[arg(long = "var", value_parser = parse_variable)]
        vars: Vec<(String, String)>,

        /// Variables as a JSON document (keeps value types).
        #[arg(long, conflicts_with = "vars")]
        variables_json: Option<String>,

        /// JSON file holding the input records (an array, or one object).
        #[arg(long)]
        input: Option<PathBuf>,

        /// Emit an error record for failed records instead of stopping.
        #[arg(long)]
        continue_on_fail: bool,
    },
    /// Execute a node definition file.
    Run {
        /// Path to the node definition JSON file.
        path: PathBuf,

        /// JSON file holding the input records (an array, or one object).
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn read_records(path: Option<&Path>) -> anyhow::Result<Vec<Value>> {
    let Some(path) = path else {
        return Ok(vec![json!({})]);
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read input file {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&content)
        .with_context(|| format!("input file {} is not valid JSON", path.display()))?;

    match parsed {
        Value::Array(records) => Ok(records),
        record @ Value::Object(_) => Ok(vec![record]),
        other => bail!("input must be an array of records or a single object, got {other}"),
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let connection = cli.connection;

    match cli.command {
        Command::Describe { raw_json } => {
            let node = DoppelgangerNode::new(if raw_json { InputMode::RawJson } else { InputMode::Structured });
            print_json(&json!({
                "mode": node.mode(),
                "node": node.description(),
                "credentials": credentials::descriptor(),
            }))
        }
        Command::ListTasks => {
            let definition = NodeDefinition::doppelganger(InputMode::Structured)
                .with_credentials(connection.credentials()?);
            let options = connection.executor()?.load_options(&definition, GET_TASKS).await?;
            info!("found {} tasks", options.len());
            print_json(&options)
        }
        Command::Execute {
            task_id,
            vars,
            variables_json,
            input,
            continue_on_fail,
        } => {
            let definition = match variables_json {
                Some(text) => NodeDefinition::doppelganger(InputMode::RawJson)
                    .with_parameter("variables", Value::String(text)),
                None => {
                    let values: Vec<Value> = vars
                        .into_iter()
                        .map(|(name, value)| json!({ "name": name, "value": value }))
                        .collect();
                    NodeDefinition::doppelganger(InputMode::Structured)
                        .with_parameter("operation", json!(nodes::doppelganger::EXECUTE_TASK))
                        .with_parameter("variables", json!({ "values": values }))
                }
            }
            .with_parameter("taskId", Value::String(task_id))
            .with_credentials(connection.credentials()?)
            .continue_on_fail(continue_on_fail);

            let records = read_records(input.as_deref())?;
            execute(&connection, &definition, records).await
        }
        Command::Run { path, input } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read node definition {}", path.display()))?;
            let mut definition: NodeDefinition = serde_json::from_str(&content)
                .with_context(|| format!("invalid node definition {}", path.display()))?;
            if definition.credentials.is_none() {
                definition.credentials = Some(connection.credentials()?);
            }

            let records = read_records(input.as_deref())?;
            execute(&connection, &definition, records).await
        }
    }
}

async fn execute(connection: &Connection, definition: &NodeDefinition, records: Vec<Value>) -> anyhow::Result<()> {
    let result = connection.executor()?.run(definition, records).await?;
    if !result.failed.is_empty() {
        warn!("{} records failed: {:?}", result.failed.len(), result.failed);
    }
    print_json(&result.output)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}
