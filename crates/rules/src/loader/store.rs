//! Loaded rules shared between the loader and its watcher callback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::rule::PatternRule;

#[derive(Debug, Default)]
pub(super) struct LoadedRules {
    /// Rules keyed by `metadata.id`.
    rules: RwLock<HashMap<String, PatternRule>>,
    /// Which file each key was loaded from.
    files: RwLock<HashMap<PathBuf, String>>,
}

impl LoadedRules {
    /// The file another path's rule already claims `key` from, if any.
    pub(super) fn owner_of(&self, key: &str, path: &Path) -> Option<PathBuf> {
        let files = self.files.read().expect("files lock poisoned");
        files
            .iter()
            .find(|(p, k)| k.as_str() == key && p.as_path() != path)
            .map(|(p, _)| p.clone())
    }

    /// Store `rule` as loaded from `path`. Returns the key this path held
    /// before when it was a different one.
    pub(super) fn insert(&self, path: &Path, rule: PatternRule) -> Option<String> {
        let key = rule.key.clone();
        let previous = self
            .files
            .write()
            .expect("files lock poisoned")
            .insert(path.to_path_buf(), key.clone())
            .filter(|old| *old != key);

        let mut rules = self.rules.write().expect("rules lock poisoned");
        if let Some(old) = &previous {
            rules.remove(old);
        }
        rules.insert(key, rule);
        previous
    }

    /// Forget whatever was loaded from `path`, returning its key.
    pub(super) fn remove_path(&self, path: &Path) -> Option<String> {
        let key = self.files.write().expect("files lock poisoned").remove(path)?;
        self.rules.write().expect("rules lock poisoned").remove(&key);
        Some(key)
    }

    pub(super) fn get(&self, key: &str) -> Option<PatternRule> {
        self.rules.read().expect("rules lock poisoned").get(key).cloned()
    }

    pub(super) fn snapshot(&self) -> Vec<PatternRule> {
        let mut rules: Vec<PatternRule> = self
            .rules
            .read()
            .expect("rules lock poisoned")
            .values()
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.key.cmp(&b.key));
        rules
    }

    pub(super) fn len(&self) -> usize {
        self.rules.read().expect("rules lock poisoned").len()
    }
}
