//! HTTP API for listing, invoking and editing `dyntool` tools.
//!
//! `dyntool-web` runs an axum server over a [`ToolRegistry`] that is kept in
//! sync with `tools.json` / `tools.yaml` by a [`Reloader`] and, optionally,
//! a [`ConfigWatcher`].
//!
//! # Quick start
//!
//! ```ignore
//! use dyntool_web::{WebConfig, spawn_web};
//!
//! let server = spawn_web(WebConfig::default()).await?;
//! println!("API: http://{}/api/tools", server.addr);
//! ```
//!
//! # Endpoints
//!
//! | Method | Path              | Body / query              |
//! |--------|-------------------|---------------------------|
//! | GET    | `/api/tools`      |                           |
//! | GET    | `/api/registered` |                           |
//! | POST   | `/api/invoke`     | `{name, params}`          |
//! | GET    | `/api/config`     | `?path=json\|yaml`        |
//! | POST   | `/api/config`     | `{path, content}`         |

mod api;
pub mod error;
mod server;

pub use api::AppState;
pub use error::ApiError;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dyntool::{
    ConfigWatcher, Dispatcher, DispatcherConfig, ReloadReason, Reloader, ToolRegistry,
    WatchConfig, WatcherHandle,
};
use tracing::{error, info};

/// The two config files the API reads and writes.
#[derive(Debug, Clone)]
pub struct ConfigFiles {
    pub json: PathBuf,
    pub yaml: PathBuf,
}

impl ConfigFiles {
    /// `tools.json` and `tools.yaml` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            json: dir.join("tools.json"),
            yaml: dir.join("tools.yaml"),
        }
    }

    /// Load order: JSON first, YAML second (YAML wins on duplicates).
    pub fn sources(&self) -> Vec<PathBuf> {
        vec![self.json.clone(), self.yaml.clone()]
    }
}

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Directory served for any path outside `/api`.
    ///
    /// If `None`, only the API is served.
    pub static_dir: Option<PathBuf>,
    /// Directory holding `tools.json` and `tools.yaml`. Default: `configs`.
    pub config_dir: PathBuf,
    /// Watch the config files and reload on change. Default: `true`.
    pub watch: bool,
    /// Poll interval for the watcher; `None` relies on notifications only.
    pub poll_interval: Option<Duration>,
    pub dispatcher: DispatcherConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
            config_dir: PathBuf::from("configs"),
            watch: true,
            poll_interval: Some(dyntool::watcher::DEFAULT_POLL_INTERVAL),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl WebConfig {
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    pub fn with_watch(mut self, enabled: bool) -> Self {
        self.watch = enabled;
        self
    }

    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_dispatcher(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher = config;
        self
    }

    pub fn files(&self) -> ConfigFiles {
        ConfigFiles::in_dir(&self.config_dir)
    }
}

/// A running server and the background tasks that feed it.
pub struct WebServer {
    pub addr: SocketAddr,
    pub registry: ToolRegistry,
    watcher: Option<WatcherHandle>,
}

impl WebServer {
    /// Stop the config watcher. The HTTP server itself runs until the Tokio
    /// runtime shuts down.
    pub async fn shutdown(mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.shutdown().await;
        }
    }
}

/// Load the configs, start the reloader (and watcher) and spawn the HTTP
/// server on a Tokio task.
///
/// A config that fails to load at startup is logged and the server starts
/// with an empty registry; the next valid save or edit populates it.
pub async fn spawn_web(config: WebConfig) -> dyntool::Result<WebServer> {
    let files = config.files();
    let registry = ToolRegistry::new();

    let reloader = Reloader::new(files.sources(), registry.clone());
    if let Err(e) = reloader.reload(&ReloadReason::Startup) {
        error!("Initial config load failed, starting with no tools: {e}");
    }
    let reloads = reloader.spawn();

    let watcher = if config.watch {
        let watch = WatchConfig::new(files.sources()).with_poll_interval(config.poll_interval);
        Some(ConfigWatcher::new(watch).spawn(reloads.clone())?)
    } else {
        None
    };

    let dispatcher = Dispatcher::new(registry.clone(), config.dispatcher)?;
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        reloads,
        files,
    };
    let router = server::build_router(state, config.static_dir);
    let addr = server::start_server(router, config.bind_addr).await?;
    info!("Serving {} tools on http://{addr}", registry.len());

    Ok(WebServer {
        addr,
        registry,
        watcher,
    })
}
