//! Invocation dispatch: resolve a tool by name and run its strategy.
//!
//! Each [`ToolKind`] variant has one handler module:
//!
//! - [`local`]: built-in Rust functions looked up in a [`FunctionTable`].
//! - [`rest`]: HTTP calls through a shared `reqwest` client.
//! - [`search`]: term-frequency search over local text files.
//! - [`shell`]: `sh -c` with `{param}` placeholders filled in.
//!
//! Supplied parameters are merged over the tool's declared defaults before
//! the handler runs. Failures come back as [`Error::ToolInvocation`] from
//! [`Dispatcher::call`], or as an [`InvocationResult::Error`] payload from
//! [`Dispatcher::invoke`], which never fails.

pub mod local;
pub mod rest;
pub mod search;
pub mod shell;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace};

pub use local::{FunctionTable, LocalFn};

use crate::error::{Error, Result};
use crate::registry::ToolRegistry;
use crate::spec::{ToolKind, ToolSpec};

/// Default timeout for `rest` tools.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one invocation, as returned to API callers.
///
/// Serializes as `{"status":"ok","result":...}` or
/// `{"status":"error","error":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InvocationResult {
    Ok { result: Value },
    Error { error: String },
}

impl InvocationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl From<Result<Value>> for InvocationResult {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(result) => Self::Ok { result },
            Err(e) => Self::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Timeout applied to every `rest` call. Default: 10 s.
    pub http_timeout: Duration,
    /// Directory `search` tools scan when neither the tool nor the call
    /// names one. Default: `papers`.
    pub search_root: PathBuf,
    /// Working directory for `shell` tools. Default: `.`.
    pub shell_workdir: PathBuf,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            search_root: PathBuf::from("papers"),
            shell_workdir: PathBuf::from("."),
        }
    }
}

impl DispatcherConfig {
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_search_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_root = dir.into();
        self
    }

    pub fn with_shell_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shell_workdir = dir.into();
        self
    }
}

/// Resolves tool names against the registry and executes them.
pub struct Dispatcher {
    registry: ToolRegistry,
    functions: FunctionTable,
    http: reqwest::Client,
    config: DispatcherConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("functions", &self.functions.names())
            .field("config", &self.config)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher over `registry` with the built-in local functions.
    pub fn new(registry: ToolRegistry, config: DispatcherConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            registry,
            functions: FunctionTable::with_builtins(),
            http,
            config,
        })
    }

    /// Register an extra local function (builder pattern). Replaces any
    /// function with the same name.
    pub fn with_function<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.register(name, f);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Look up `name` and run it with `params` merged over its defaults.
    pub async fn call(&self, name: &str, params: Map<String, Value>) -> Result<Value> {
        let Some(spec) = self.registry.get(name) else {
            info!("Invocation of unknown tool '{name}'");
            return Err(Error::ToolNotFound(name.to_string()));
        };
        let params = merge_params(&spec.params, params);
        let shown = Value::Object(params.clone());
        trace!("Tool {name} params: {shown}");

        let start = Instant::now();
        let result = self.run(&spec, params).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(_) => debug!("Tool {name} ({}) completed in {elapsed_ms:.0}ms", spec.kind.tag()),
            Err(e) => error!("Tool {name} failed after {elapsed_ms:.0}ms: {e}"),
        }
        result.map_err(|message| Error::invocation(name, message))
    }

    /// Like [`call`](Self::call) but never fails: every error becomes an
    /// [`InvocationResult::Error`].
    pub async fn invoke(&self, name: &str, params: Map<String, Value>) -> InvocationResult {
        self.call(name, params).await.into()
    }

    async fn run(
        &self,
        spec: &ToolSpec,
        params: Map<String, Value>,
    ) -> std::result::Result<Value, String> {
        match &spec.kind {
            ToolKind::Local { function } => {
                let f = self
                    .functions
                    .get(function)
                    .ok_or_else(|| format!("local function '{function}' is not available"))?;
                panic::catch_unwind(AssertUnwindSafe(|| f(&params)))
                    .unwrap_or_else(|payload| Err(panic_message(function, &*payload)))
            }
            ToolKind::Rest { endpoint, method } => {
                rest::call(&self.http, endpoint, *method, &params).await
            }
            ToolKind::Search { docs_dir } => {
                let root = docs_dir
                    .as_ref()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.config.search_root.clone());
                search::run(root, params).await
            }
            ToolKind::Shell { command } => {
                shell::run(&self.config.shell_workdir, command, &params).await
            }
        }
    }
}

/// Render a caught panic from a local function as an error message.
fn panic_message(function: &str, payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    format!("local function '{function}' panicked: {detail}")
}

/// Overlay `supplied` on `defaults`. Supplied keys win; defaults fill gaps.
pub fn merge_params(
    defaults: &Map<String, Value>,
    supplied: Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = defaults.clone();
    merged.extend(supplied);
    merged
}
