//! Config file watching.
//!
//! Two event sources feed one check: filesystem notifications on the
//! config files' parent directories, and a periodic poll as a fallback for
//! filesystems where notifications are unreliable. Either way the watcher
//! compares each file's [`Fingerprint`] (mtime, length, content hash) with
//! the last one it saw and only asks for a reload when something actually
//! changed. Parse errors are the reloader's concern; the watcher keeps
//! running regardless.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::reload::{ReloadHandle, ReloadReason};

/// Default poll interval when notifications are missed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default pause after a notification before reading the files, so a
/// writer has a chance to finish.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Files to watch.
    pub paths: Vec<PathBuf>,
    /// Poll interval. `None` relies on notifications only.
    pub poll_interval: Option<Duration>,
    /// Delay between a notification and the fingerprint check.
    pub debounce: Duration,
    /// Whether to subscribe to filesystem notifications at all.
    pub notifications: bool,
}

impl WatchConfig {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
            debounce: DEFAULT_DEBOUNCE,
            notifications: true,
        }
    }

    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }
}

// ── Fingerprint ─────────────────────────────────────────────────────

/// Identity of a file's current contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
    hash: u64,
}

impl Fingerprint {
    /// Fingerprint the file at `path`, or `None` if it cannot be read.
    pub fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        let bytes = fs::read(path).ok()?;
        Some(Self {
            modified: meta.modified().ok(),
            len: bytes.len() as u64,
            hash: content_hash(&bytes),
        })
    }

    /// Same bytes, regardless of mtime.
    pub fn same_content(&self, other: &Self) -> bool {
        self.len == other.len && self.hash == other.hash
    }
}

/// FNV-1a over the file bytes.
fn content_hash(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

// ── ConfigWatcher ───────────────────────────────────────────────────

/// Tracks the watched files and detects changes.
#[derive(Debug)]
pub struct ConfigWatcher {
    config: WatchConfig,
    seen: HashMap<PathBuf, Option<Fingerprint>>,
}

impl ConfigWatcher {
    /// Create a watcher and record the files' current state as the baseline.
    pub fn new(mut config: WatchConfig) -> Self {
        config.paths = config.paths.iter().map(|p| resolve(p)).collect();
        let seen = config
            .paths
            .iter()
            .map(|p| (p.clone(), Fingerprint::of(p)))
            .collect();
        Self { config, seen }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.config.paths
    }

    /// Re-fingerprint every watched file and return the ones whose content
    /// changed since the last call (including files that appeared or
    /// disappeared). A touch that leaves the bytes unchanged is not a change.
    pub fn detect_changes(&mut self) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        for path in &self.config.paths {
            let now = Fingerprint::of(path);
            let before = self.seen.insert(path.clone(), now).flatten();
            let differs = match (before, now) {
                (Some(a), Some(b)) => !a.same_content(&b),
                (None, None) => false,
                _ => true,
            };
            if differs {
                changed.push(path.clone());
            }
        }
        changed
    }

    /// Run the watch loop on a background task, sending reload requests to
    /// `reloads`. Stops when the returned handle is shut down or dropped, or
    /// when the reloader goes away.
    pub fn spawn(mut self, reloads: ReloadHandle) -> Result<WatcherHandle> {
        let (event_tx, mut event_rx) = mpsc::channel::<()>(64);
        let notifier = if self.config.notifications {
            match self.subscribe(event_tx) {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!("File notifications unavailable, falling back to polling: {e}");
                    None
                }
            }
        } else {
            None
        };

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let polling = self.config.poll_interval.is_some();
        let mut ticker =
            tokio::time::interval(self.config.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let debounce = self.config.debounce;

        let task = tokio::spawn(async move {
            // Keep the notify watcher alive for the lifetime of the loop.
            let _notifier = notifier;
            info!(
                "Watching config files: {}",
                self.config
                    .paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    Some(()) = event_rx.recv() => {
                        tokio::time::sleep(debounce).await;
                        while event_rx.try_recv().is_ok() {}
                    }
                    _ = ticker.tick(), if polling => {}
                }
                let changed = self.detect_changes();
                if changed.is_empty() {
                    continue;
                }
                for path in &changed {
                    info!("Detected modification of config: {}", path.display());
                }
                if reloads
                    .request_reload(ReloadReason::FilesChanged(changed))
                    .is_err()
                {
                    warn!("Reloader stopped; config watcher exiting");
                    break;
                }
            }
            debug!("Config watcher stopped");
        });

        Ok(WatcherHandle {
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// Watch each existing parent directory (non-recursively) and forward
    /// events that touch a watched file.
    fn subscribe(&self, events: mpsc::Sender<()>) -> Result<RecommendedWatcher> {
        let targets: BTreeSet<PathBuf> = self.config.paths.iter().cloned().collect();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res
                && event.paths.iter().any(|p| targets.contains(p))
            {
                // A full queue already has a check pending.
                let _ = events.try_send(());
            }
        })?;

        let dirs: BTreeSet<&Path> = self
            .config
            .paths
            .iter()
            .filter_map(|p| p.parent())
            .collect();
        for dir in dirs {
            if !dir.is_dir() {
                warn!("Not watching missing directory {}", dir.display());
                continue;
            }
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            debug!("Watching directory {}", dir.display());
        }
        Ok(watcher)
    }
}

/// Absolute form of `path` with its parent directory canonicalized, so it
/// compares equal to the paths notify reports. The file itself may not
/// exist yet.
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    match (absolute.parent(), absolute.file_name()) {
        (Some(dir), Some(name)) => fs::canonicalize(dir)
            .map(|dir| dir.join(name))
            .unwrap_or(absolute),
        _ => absolute,
    }
}

/// Owns the running watch loop.
#[derive(Debug)]
pub struct WatcherHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use crate::reload::Reloader;

    const ONE_TOOL: &str = r#"[{"name": "a", "type": "local", "function": "echo"}]"#;
    const TWO_TOOLS: &str = r#"[
        {"name": "a", "type": "local", "function": "echo"},
        {"name": "b", "type": "search"}
    ]"#;

    #[test]
    fn fingerprint_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        assert!(Fingerprint::of(&path).is_none());

        fs::write(&path, ONE_TOOL).unwrap();
        let a = Fingerprint::of(&path).unwrap();
        fs::write(&path, TWO_TOOLS).unwrap();
        let b = Fingerprint::of(&path).unwrap();
        assert!(!a.same_content(&b));
    }

    #[test]
    fn detect_changes_ignores_identical_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        fs::write(&path, ONE_TOOL).unwrap();

        let mut watcher = ConfigWatcher::new(WatchConfig::new(vec![path.clone()]));
        assert!(watcher.detect_changes().is_empty());

        fs::write(&path, ONE_TOOL).unwrap();
        assert!(watcher.detect_changes().is_empty());

        fs::write(&path, TWO_TOOLS).unwrap();
        assert_eq!(watcher.detect_changes().len(), 1);
        assert!(watcher.detect_changes().is_empty());
    }

    #[test]
    fn detect_changes_sees_created_and_deleted_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.yaml");
        let mut watcher = ConfigWatcher::new(WatchConfig::new(vec![path.clone()]));

        fs::write(&path, "tools: []").unwrap();
        assert_eq!(watcher.detect_changes().len(), 1);

        fs::remove_file(&path).unwrap();
        assert_eq!(watcher.detect_changes().len(), 1);
        assert!(watcher.detect_changes().is_empty());
    }

    #[tokio::test]
    async fn notifications_alone_trigger_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let other = dir.path().join("unrelated.txt");
        fs::write(&path, ONE_TOOL).unwrap();

        let registry = ToolRegistry::new();
        let reloader = Reloader::new(vec![path.clone()], registry.clone());
        reloader.reload(&ReloadReason::Startup).unwrap();
        let reloads = reloader.spawn();

        let config = WatchConfig::new(vec![path.clone()])
            .with_poll_interval(None)
            .with_debounce(Duration::from_millis(20));
        let handle = ConfigWatcher::new(config).spawn(reloads).unwrap();

        // Events for other files in the directory are filtered out.
        fs::write(&other, "noise").unwrap();
        fs::write(&path, TWO_TOOLS).unwrap();
        let mut names = registry.names();
        for _ in 0..250 {
            if names.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            names = registry.names();
        }
        assert_eq!(names, ["a", "b"]);
        let generation = registry.generation();

        // Same bytes again: the event arrives but the fingerprint matches.
        fs::write(&path, TWO_TOOLS).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(registry.generation(), generation);

        handle.shutdown().await;
    }

    #[test]
    fn resolve_matches_canonical_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let resolved = resolve(&path);
        assert_eq!(
            resolved,
            fs::canonicalize(dir.path()).unwrap().join("missing.yaml")
        );
    }

    #[tokio::test]
    async fn polling_loop_reloads_registry_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        fs::write(&path, ONE_TOOL).unwrap();

        let registry = ToolRegistry::new();
        let reloader = Reloader::new(vec![path.clone()], registry.clone());
        reloader.reload(&ReloadReason::Startup).unwrap();
        let reloads = reloader.spawn();

        let config = WatchConfig::new(vec![path.clone()])
            .with_notifications(false)
            .with_poll_interval(Some(Duration::from_millis(20)));
        let handle = ConfigWatcher::new(config).spawn(reloads).unwrap();

        fs::write(&path, TWO_TOOLS).unwrap();
        let mut names = registry.names();
        for _ in 0..250 {
            if names.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            names = registry.names();
        }
        assert_eq!(names, ["a", "b"]);

        // A broken file is reported by the reloader; the watcher keeps going.
        fs::write(&path, "[{").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.names(), ["a", "b"]);
        assert!(!handle.is_finished());

        handle.shutdown().await;
    }
}
