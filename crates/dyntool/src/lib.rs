//! Config-driven tool registry with hot reload and typed dispatch.
//!
//! `dyntool` registers "tools" (named, typed, invocable actions) from JSON or
//! YAML config files, keeps them in an atomically swapped registry, reloads
//! them when the files change on disk, and invokes them by name.
//!
//! # Getting started
//!
//! ```ignore
//! use dyntool::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> dyntool::Result<()> {
//!     let paths = vec!["configs/tools.json".into(), "configs/tools.yaml".into()];
//!
//!     // The reloader owns reloads; everyone else reads the registry.
//!     let registry = ToolRegistry::new();
//!     let reloader = Reloader::new(paths.clone(), registry.clone());
//!     reloader.reload(&ReloadReason::Startup)?;
//!     let reloads = reloader.spawn();
//!
//!     // Reload whenever a config file changes.
//!     let _watcher = ConfigWatcher::new(WatchConfig::new(paths)).spawn(reloads)?;
//!
//!     let dispatcher = Dispatcher::new(registry, DispatcherConfig::default())?;
//!     let params = serde_json::json!({"text": "hi"}).as_object().cloned().unwrap();
//!     println!("{:?}", dispatcher.invoke("echo_tool", params).await);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! config files ──▶ ConfigWatcher ──ReloadRequest──▶ Reloader ──replace_all──▶ ToolRegistry
//!                                                                                  │
//!                                         invoke(name, params) ──▶ Dispatcher ◀────┘
//! ```
//!
//! # Modules
//!
//! - [`spec`]: [`ToolSpec`] and the [`ToolKind`] strategies.
//! - [`config`]: JSON/YAML parsing and multi-file merging.
//! - [`openapi`]: OpenAPI / Swagger documents as `rest` tools.
//! - [`registry`]: [`ToolRegistry`] snapshots and [`ReloadSummary`].
//! - [`reload`]: the [`Reloader`] task and its [`ReloadHandle`].
//! - [`watcher`]: [`ConfigWatcher`] change detection.
//! - [`invoke`]: [`Dispatcher`] and the per-strategy handlers.
//! - [`samples`]: example configs for a first run.

pub mod config;
pub mod error;
pub mod invoke;
pub mod openapi;
pub mod prelude;
pub mod registry;
pub mod reload;
pub mod samples;
pub mod spec;
pub mod watcher;

pub use error::{Error, Result};
pub use invoke::{Dispatcher, DispatcherConfig, InvocationResult};
pub use registry::{ReloadSummary, Snapshot, ToolRegistry};
pub use reload::{ReloadHandle, ReloadReason, Reloader};
pub use spec::{HttpMethod, ToolKind, ToolSpec};
pub use watcher::{ConfigWatcher, WatchConfig, WatcherHandle};
