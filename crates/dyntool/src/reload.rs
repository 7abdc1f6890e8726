//! The reloader owns the registry's reload lifecycle.
//!
//! Other components never rebuild the registry themselves. They send a
//! [`ReloadRequest`] over a channel (fire-and-forget from the watcher,
//! awaited from the config-save endpoint) and the reloader task re-parses
//! every source and swaps the registry in one step.
//!
//! ```text
//! ConfigWatcher ──ReloadRequest──▶ Reloader task ──replace_all──▶ ToolRegistry
//! POST /api/config ──ReloadRequest + oneshot──▲                        │
//!                                                      Dispatcher ◀─ reads ─┘
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::config;
use crate::error::{Error, Result};
use crate::registry::{ReloadSummary, ToolRegistry};
use crate::spec::ToolSpec;

/// Capacity of the reload request queue.
const RELOAD_QUEUE: usize = 16;

/// Why a reload was requested. Only used for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReason {
    Startup,
    FilesChanged(Vec<PathBuf>),
    ConfigSaved(PathBuf),
    Manual,
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::FilesChanged(paths) => {
                let list: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "modified: {}", list.join(", "))
            }
            Self::ConfigSaved(path) => write!(f, "saved: {}", path.display()),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// A message to the reloader task.
#[derive(Debug)]
pub struct ReloadRequest {
    pub reason: ReloadReason,
    /// Receives the outcome when the caller wants to wait for it.
    pub reply: Option<oneshot::Sender<Result<ReloadSummary>>>,
}

/// Loads the config sources and applies them to the registry.
#[derive(Debug, Clone)]
pub struct Reloader {
    sources: Vec<PathBuf>,
    registry: ToolRegistry,
}

impl Reloader {
    /// `sources` are read in order; later files win on duplicate names.
    pub fn new(sources: Vec<PathBuf>, registry: ToolRegistry) -> Self {
        Self { sources, registry }
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Parse every source without touching the registry.
    pub fn load_all(&self) -> Result<Vec<ToolSpec>> {
        config::load_sources(&self.sources)
    }

    /// Parse every source and swap the registry. On error the previous
    /// snapshot stays in place.
    pub fn reload(&self, reason: &ReloadReason) -> Result<ReloadSummary> {
        let specs = match self.load_all() {
            Ok(specs) => specs,
            Err(e) => {
                error!("Reload ({reason}) aborted, keeping previous tools: {e}");
                return Err(e);
            }
        };
        let summary = self.registry.replace_all(specs);
        log_summary(reason, &summary);
        Ok(summary)
    }

    /// Move the reloader onto a background task and return its handle.
    ///
    /// Requests are handled one at a time; each reload reads the files on
    /// the blocking pool. The task exits once every [`ReloadHandle`] has
    /// been dropped.
    pub fn spawn(self) -> ReloadHandle {
        let (tx, mut rx) = mpsc::channel::<ReloadRequest>(RELOAD_QUEUE);
        let reloader = Arc::new(self);
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let this = Arc::clone(&reloader);
                let reason = request.reason;
                let result = tokio::task::spawn_blocking(move || this.reload(&reason))
                    .await
                    .unwrap_or_else(|e| {
                        error!("Reload task failed: {e}");
                        Err(Error::Io(io::Error::other(e)))
                    });
                if let Some(reply) = request.reply {
                    let _ = reply.send(result);
                }
            }
            debug!("Reloader task stopped");
        });
        ReloadHandle { tx }
    }
}

fn log_summary(reason: &ReloadReason, summary: &ReloadSummary) {
    if summary.is_unchanged() {
        debug!("Reload ({reason}): no changes, {} tools", summary.total);
        return;
    }
    for name in &summary.added {
        info!("Registered tool '{name}'");
    }
    for name in &summary.changed {
        info!("Tool '{name}' changed, re-registered");
    }
    for name in &summary.removed {
        info!("Unregistered tool '{name}'");
    }
    info!(
        "Reload ({reason}) applied: {} tools (generation {})",
        summary.total, summary.generation
    );
}

/// Client side of the reloader task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<ReloadRequest>,
}

impl ReloadHandle {
    /// Queue a reload without waiting for it.
    ///
    /// A full queue already holds a pending reload that will read the same
    /// files, so that case is not an error.
    pub fn request_reload(&self, reason: ReloadReason) -> Result<()> {
        match self.tx.try_send(ReloadRequest {
            reason,
            reply: None,
        }) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::ReloaderClosed),
        }
    }

    /// Queue a reload and wait for its outcome.
    pub async fn reload(&self, reason: ReloadReason) -> Result<ReloadSummary> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ReloadRequest {
                reason,
                reply: Some(reply),
            })
            .await
            .map_err(|_| Error::ReloaderClosed)?;
        rx.await.map_err(|_| Error::ReloaderClosed)?
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tools(path: &std::path::Path, names: &[&str]) {
        let entries: Vec<serde_json::Value> = names
            .iter()
            .map(|n| serde_json::json!({"name": n, "type": "local", "function": "echo"}))
            .collect();
        fs::write(path, serde_json::json!({ "tools": entries }).to_string()).unwrap();
    }

    #[test]
    fn reload_replaces_the_full_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let reloader = Reloader::new(vec![path.clone()], ToolRegistry::new());

        write_tools(&path, &["a", "b"]);
        reloader.reload(&ReloadReason::Startup).unwrap();
        write_tools(&path, &["c"]);
        let summary = reloader.reload(&ReloadReason::Manual).unwrap();

        assert_eq!(reloader.registry().names(), ["c"]);
        assert_eq!(summary.removed, ["a", "b"]);
    }

    #[test]
    fn malformed_config_keeps_previous_tools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let reloader = Reloader::new(vec![path.clone()], ToolRegistry::new());

        write_tools(&path, &["a", "b"]);
        reloader.reload(&ReloadReason::Startup).unwrap();
        fs::write(&path, "{ \"tools\": [ {\"name\": ").unwrap();

        let err = reloader.reload(&ReloadReason::Manual).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert_eq!(reloader.registry().names(), ["a", "b"]);
        assert_eq!(reloader.registry().generation(), 1);
    }

    #[tokio::test]
    async fn handle_reload_reports_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        write_tools(&path, &["x"]);
        let registry = ToolRegistry::new();
        let handle = Reloader::new(vec![path.clone()], registry.clone()).spawn();

        let summary = handle.reload(ReloadReason::Startup).await.unwrap();
        assert_eq!(summary.added, ["x"]);
        assert_eq!(registry.names(), ["x"]);

        fs::write(&path, "not json").unwrap();
        assert!(handle.reload(ReloadReason::Manual).await.is_err());
        assert_eq!(registry.names(), ["x"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reloads_do_not_stall_a_single_threaded_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        write_tools(&path, &["a", "b", "c"]);
        let registry = ToolRegistry::new();
        let handle = Reloader::new(vec![path.clone()], registry.clone()).spawn();

        // Another task on the same thread keeps making progress while
        // reloads are in flight.
        let ticker = tokio::spawn(async {
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
        });
        for _ in 0..3 {
            handle.reload(ReloadReason::Manual).await.unwrap();
        }
        ticker.await.unwrap();
        assert_eq!(registry.names(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn request_reload_is_fire_and_forget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        write_tools(&path, &["y"]);
        let registry = ToolRegistry::new();
        let handle = Reloader::new(vec![path], registry.clone()).spawn();

        handle.request_reload(ReloadReason::Manual).unwrap();
        // A waited reload queues behind the fire-and-forget one.
        handle.reload(ReloadReason::Manual).await.unwrap();
        assert_eq!(registry.names(), ["y"]);
        assert!(!handle.is_closed());
    }
}
