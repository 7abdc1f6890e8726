//! REST API endpoint handlers.
//!
//! Listing and invocation read the registry snapshot directly. Config
//! edits go through the reloader so that a save and the reload it causes
//! are observed by the caller as one step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use dyntool::config::parse_tools;
use dyntool::{Dispatcher, ReloadHandle, ReloadReason};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{error, info};

use crate::ConfigFiles;
use crate::error::ApiError;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub reloads: ReloadHandle,
    pub files: ConfigFiles,
}

/// GET /api/tools: Every registered tool with its full definition.
pub async fn get_tools(State(app): State<AppState>) -> Json<Value> {
    let tools = app.dispatcher.registry().list();
    Json(json!({ "tools": tools }))
}

/// GET /api/registered: Registered tool names, sorted.
pub async fn get_registered(State(app): State<AppState>) -> Json<Value> {
    Json(json!({ "registered": app.dispatcher.registry().names() }))
}

/// Request body for POST /api/invoke.
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// POST /api/invoke: Run a tool by name.
///
/// Returns `{"status":"ok","result":...}` on success; 400 without a name,
/// 404 for an unknown tool, 500 when the tool itself fails.
pub async fn post_invoke(
    State(app): State<AppState>,
    payload: Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing tool name"))?;
    let result = app.dispatcher.call(&name, body.params).await?;
    Ok(Json(json!({ "status": "ok", "result": result })))
}

/// Which of the two config files a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigTarget {
    Json,
    #[serde(alias = "yml")]
    Yaml,
}

impl ConfigTarget {
    fn path(self, files: &ConfigFiles) -> &Path {
        match self {
            Self::Json => &files.json,
            Self::Yaml => &files.yaml,
        }
    }
}

fn default_target() -> ConfigTarget {
    ConfigTarget::Json
}

#[derive(Debug, Deserialize)]
pub struct ConfigQuery {
    #[serde(default = "default_target")]
    pub path: ConfigTarget,
}

/// GET /api/config?path=json|yaml: Raw text of one config file.
pub async fn get_config(
    State(app): State<AppState>,
    query: Result<Query<ConfigQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let target = query.path.path(&app.files);
    let content = tokio::fs::read_to_string(target).await.map_err(|source| {
        error!("Read config failed: {}: {source}", target.display());
        ApiError::from(dyntool::Error::ConfigRead {
            path: target.to_path_buf(),
            source,
        })
    })?;
    Ok(Json(json!({
        "path": target.display().to_string(),
        "content": content,
    })))
}

/// Request body for POST /api/config.
#[derive(Debug, Deserialize)]
pub struct SaveConfigRequest {
    #[serde(default = "default_target")]
    pub path: ConfigTarget,
    #[serde(default)]
    pub content: Option<String>,
}

/// POST /api/config: Replace one config file and reload.
///
/// The content is parsed first; a file that would not load is rejected with
/// 422 and nothing is written. The write replaces the file in one rename,
/// then the reload is awaited so the response reflects the new registry.
pub async fn post_config(
    State(app): State<AppState>,
    payload: Result<Json<SaveConfigRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let content = body
        .content
        .ok_or_else(|| ApiError::bad_request("Missing content"))?;
    let target = body.path.path(&app.files).to_path_buf();

    let tools = parse_tools(&content, &target)?;
    write_atomically(&target, &content).await?;
    info!(
        "Saved {} ({} tools defined)",
        target.display(),
        tools.len()
    );

    let summary = app
        .reloads
        .reload(ReloadReason::ConfigSaved(target))
        .await
        .map_err(|e| ApiError::internal(format!("Config saved but reload failed: {e}")))?;
    Ok(Json(json!({ "status": "ok", "reload": summary })))
}

/// Write `content` to a hidden sibling of `target`, then rename over it.
async fn write_atomically(target: &Path, content: &str) -> Result<(), dyntool::Error> {
    let write_err = |source| dyntool::Error::ConfigWrite {
        path: target.to_path_buf(),
        source,
    };
    let dir = target
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".into());
    let tmp: PathBuf = dir.join(format!(".{file_name}.tmp"));
    tokio::fs::write(&tmp, content).await.map_err(write_err)?;
    if let Err(source) = tokio::fs::rename(&tmp, target).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(write_err(source));
    }
    Ok(())
}
