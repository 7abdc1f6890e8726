//! The in-memory table of active tools.
//!
//! The registry holds an `Arc` to an immutable [`Snapshot`]. Readers clone
//! the `Arc` under a momentary read lock and then work lock-free;
//! [`ToolRegistry::replace_all`] builds the next snapshot completely before
//! swapping the pointer, so a reader sees either the old set or the new set,
//! never a mix.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::spec::ToolSpec;

/// An immutable view of the registry at one generation.
#[derive(Debug, Default)]
pub struct Snapshot {
    tools: BTreeMap<String, ToolSpec>,
    generation: u64,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// Tools ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Number of successful replacements so far; `0` before the first load.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a [`ToolRegistry::replace_all`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    /// Tool count after the swap.
    pub total: usize,
    pub generation: u64,
}

impl ReloadSummary {
    /// Whether the new set is identical to the old one.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Shared handle to the current tool set. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl ToolRegistry {
    /// Create an empty registry (generation 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Use this when several reads must agree.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// All tools, ordered by name.
    pub fn list(&self) -> Vec<ToolSpec> {
        self.snapshot().iter().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<ToolSpec> {
        self.snapshot().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    /// Atomically replace the whole tool set.
    ///
    /// Duplicate names in `specs` resolve to the last occurrence.
    pub fn replace_all(&self, specs: impl IntoIterator<Item = ToolSpec>) -> ReloadSummary {
        let tools: BTreeMap<String, ToolSpec> =
            specs.into_iter().map(|s| (s.name.clone(), s)).collect();

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = &current.tools;

        let mut summary = ReloadSummary {
            total: tools.len(),
            generation: current.generation + 1,
            ..Default::default()
        };
        for (name, spec) in &tools {
            match previous.get(name) {
                None => summary.added.push(name.clone()),
                Some(old) if old != spec => summary.changed.push(name.clone()),
                Some(_) => {}
            }
        }
        summary.removed = previous
            .keys()
            .filter(|name| !tools.contains_key(*name))
            .cloned()
            .collect();

        *current = Arc::new(Snapshot {
            tools,
            generation: summary.generation,
        });
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn tool(name: &str) -> ToolSpec {
        ToolSpec::from_entry(&json!({"name": name, "type": "local", "function": "echo"})).unwrap()
    }

    #[test]
    fn starts_empty() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.generation(), 0);
        assert!(registry.get("anything").is_none());
    }

    #[test]
    fn replace_all_leaves_no_leftovers() {
        let registry = ToolRegistry::new();
        registry.replace_all([tool("a"), tool("b")]);
        let summary = registry.replace_all([tool("b"), tool("c")]);

        assert_eq!(registry.names(), ["b", "c"]);
        assert_eq!(summary.added, ["c"]);
        assert_eq!(summary.removed, ["a"]);
        assert!(summary.changed.is_empty());
        assert_eq!(summary.total, 2);
        assert_eq!(summary.generation, 2);
    }

    #[test]
    fn detects_changed_specs() {
        let registry = ToolRegistry::new();
        registry.replace_all([tool("a")]);

        let mut edited = tool("a");
        edited.description = "now documented".into();
        let summary = registry.replace_all([edited]);
        assert_eq!(summary.changed, ["a"]);
        assert_eq!(registry.get("a").unwrap().description, "now documented");

        let summary = registry.replace_all(registry.list());
        assert!(summary.is_unchanged());
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_swaps() {
        let registry = ToolRegistry::new();
        registry.replace_all([tool("old")]);
        let before = registry.snapshot();
        registry.replace_all([tool("new")]);

        assert!(before.get("old").is_some());
        assert!(before.get("new").is_none());
        assert_eq!(registry.names(), ["new"]);
    }

    #[test]
    fn concurrent_readers_never_see_a_mix() {
        let old: Vec<ToolSpec> = (0..50).map(|i| tool(&format!("old_{i:02}"))).collect();
        let new: Vec<ToolSpec> = (0..50).map(|i| tool(&format!("new_{i:02}"))).collect();

        let registry = ToolRegistry::new();
        registry.replace_all(old.clone());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let names: Vec<String> =
                            registry.list().into_iter().map(|s| s.name).collect();
                        assert_eq!(names.len(), 50);
                        let all_old = names.iter().all(|n| n.starts_with("old_"));
                        let all_new = names.iter().all(|n| n.starts_with("new_"));
                        assert!(all_old || all_new, "torn read: {names:?}");
                    }
                })
            })
            .collect();

        for i in 0..200 {
            let next = if i % 2 == 0 { new.clone() } else { old.clone() };
            registry.replace_all(next);
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
