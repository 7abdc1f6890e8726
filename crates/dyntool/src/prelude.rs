//! Convenience re-exports for the common setup.
//!
//! ```ignore
//! use dyntool::prelude::*;
//! ```

pub use crate::config::{ConfigFormat, DEFAULT_JSON_PATH, DEFAULT_YAML_PATH, parse_tools};
pub use crate::error::{Error, Result};
pub use crate::invoke::{Dispatcher, DispatcherConfig, FunctionTable, InvocationResult};
pub use crate::registry::{ReloadSummary, ToolRegistry};
pub use crate::reload::{ReloadHandle, ReloadReason, Reloader};
pub use crate::spec::{HttpMethod, ToolKind, ToolSpec};
pub use crate::watcher::{ConfigWatcher, WatchConfig, WatcherHandle};
