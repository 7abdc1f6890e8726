//! Error type shared by the registry, reloader, watcher and dispatcher.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while loading, watching or invoking tools.
///
/// None of these are fatal to the process: the reloader keeps the previous
/// snapshot on [`Error::ConfigParse`], the watcher logs and keeps polling,
/// and the dispatcher turns [`Error::ToolInvocation`] into an error payload.
#[derive(Debug, Error)]
pub enum Error {
    /// A config file is malformed or contains an invalid tool entry.
    #[error("invalid config {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// The invocation referenced a name that is not in the registry.
    #[error("tool '{0}' is not registered")]
    ToolNotFound(String),

    /// The tool was found but its action failed.
    #[error("tool '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write config {}: {source}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("reloader task is not running")]
    ReloaderClosed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn parse(path: &Path, message: impl std::fmt::Display) -> Self {
        Self::ConfigParse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invocation(tool: &str, message: impl std::fmt::Display) -> Self {
        Self::ToolInvocation {
            tool: tool.to_string(),
            message: message.to_string(),
        }
    }
}
