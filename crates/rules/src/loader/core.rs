//! Core [`RuleLoader`] struct: filesystem-backed rule loading with optional hot-reload.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::error::{Result, RuleError};
use crate::rule::PatternRule;
use crate::schema::PatternRuleDocument;

use super::status::{LoadResult, LoadStatus, RuleChange};
use super::store::LoadedRules;
use super::watcher::handle_fs_event;

pub(super) fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}

pub(super) fn is_dotfile(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Filesystem-backed rule loader with optional hot-reload.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files, parses them
/// into [`PatternRuleDocument`]s and keeps the resulting [`PatternRule`]s
/// keyed by `metadata.id`.
pub struct RuleLoader {
    /// Root directory containing rule YAML files.
    rules_dir: PathBuf,
    loaded: Arc<LoadedRules>,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl RuleLoader {
    /// Create a new loader for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(rules_dir: PathBuf) -> Self {
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self {
            rules_dir,
            loaded: Arc::new(LoadedRules::default()),
            _watcher: None,
        }
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// Dotfiles and non-YAML files are skipped. Parse errors are reported
    /// per-file but do not abort the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        self.scan_dir_recursive(&self.rules_dir, &mut results)?;
        Ok(results)
    }

    fn scan_dir_recursive(&self, dir: &Path, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        // Sorted so duplicate keys resolve the same way on every platform.
        let mut paths = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        paths.sort();

        for path in paths {
            if is_dotfile(&path) {
                if path.is_file() {
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Skipped {
                            reason: "dotfile".to_string(),
                        },
                    });
                }
                continue;
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results)?;
                continue;
            }

            if !is_yaml(&path) {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            let status = match self.load_rule(&path) {
                Ok(Some(rule)) => {
                    let rule_id = rule.key.clone();
                    info!(rule_id = %rule_id, name = %rule.name, path = %path.display(), "loaded rule");
                    self.loaded.insert(&path, rule);
                    LoadStatus::Loaded { rule_id }
                }
                Ok(None) => LoadStatus::Skipped {
                    reason: "disabled".to_string(),
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    LoadStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(LoadResult { path, status });
        }

        Ok(())
    }

    /// Parse a single YAML file into a [`PatternRuleDocument`].
    pub fn load_file(&self, path: &Path) -> Result<PatternRuleDocument> {
        let contents = fs::read_to_string(path)?;
        PatternRuleDocument::from_yaml(&contents)
    }

    /// Parse `path` into a rule. `None` for a disabled rule.
    fn load_rule(&self, path: &Path) -> Result<Option<PatternRule>> {
        let doc = self.load_file(path)?;
        if !doc.metadata.enabled {
            return Ok(None);
        }
        if let Some(owner) = self.loaded.owner_of(&doc.metadata.id, path) {
            return Err(RuleError::Validation(format!(
                "duplicate rule id '{}' (already loaded from {})",
                doc.metadata.id,
                owner.display()
            )));
        }
        doc.to_rule().map(Some)
    }

    /// Start a filesystem watcher with 500ms debounce.
    ///
    /// On file create/modify the rule is re-parsed and sent as
    /// [`RuleChange::Upserted`]; on delete (or when a rule gets disabled)
    /// [`RuleChange::Removed`] is sent. Parse errors are logged as warnings and
    /// the previous version is kept.
    pub fn watch(&mut self, changes: UnboundedSender<RuleChange>) -> Result<()> {
        let loaded = Arc::clone(&self.loaded);

        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) => handle_fs_event(&event, &loaded, &changes),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            }
        })?;

        // Watch recursively to pick up changes in subdirectories.
        watcher.watch(&self.rules_dir, RecursiveMode::Recursive)?;

        let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %self.rules_dir.display(), "watching rules directory for changes (recursive)");
        self._watcher = Some(watcher);
        Ok(())
    }

    /// Get the rules directory path.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// All loaded rules, ordered by key.
    pub fn rules(&self) -> Vec<PatternRule> {
        self.loaded.snapshot()
    }

    pub fn get(&self, key: &str) -> Option<PatternRule> {
        self.loaded.get(key)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_watching(&self) -> bool {
        self._watcher.is_some()
    }

    #[cfg(test)]
    pub(super) fn loaded(&self) -> &Arc<LoadedRules> {
        &self.loaded
    }
}
