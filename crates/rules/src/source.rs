//! Where rules come from: compiled-in sets or a directory of YAML files.

use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::builtin::builtin_rules;
use crate::error::Result;
use crate::loader::{LoadStatus, RuleChange, RuleLoader};
use crate::rule::PatternRule;

/// A provider of pattern rules.
pub trait RuleSource: Send {
    fn name(&self) -> &str;

    /// Load every currently enabled rule.
    fn load(&mut self) -> Result<Vec<PatternRule>>;

    /// Start reporting later changes to `changes`. Returns `false` when the
    /// source is static.
    fn watch(&mut self, _changes: UnboundedSender<RuleChange>) -> Result<bool> {
        Ok(false)
    }
}

/// A fixed list of rules.
pub struct StaticRuleSource {
    name: String,
    rules: Vec<PatternRule>,
}

impl StaticRuleSource {
    pub fn new(name: impl Into<String>, rules: Vec<PatternRule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// The compiled-in rule set.
    pub fn builtin() -> Self {
        Self::new("builtin", builtin_rules())
    }
}

impl RuleSource for StaticRuleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self) -> Result<Vec<PatternRule>> {
        Ok(self.rules.clone())
    }
}

/// Rules read from YAML files below a directory, with optional hot-reload.
pub struct DirectoryRuleSource {
    name: String,
    loader: RuleLoader,
}

impl DirectoryRuleSource {
    pub fn new(rules_dir: PathBuf) -> Self {
        Self {
            name: rules_dir.display().to_string(),
            loader: RuleLoader::new(rules_dir),
        }
    }

    pub fn loader(&self) -> &RuleLoader {
        &self.loader
    }
}

impl RuleSource for DirectoryRuleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self) -> Result<Vec<PatternRule>> {
        let results = self.loader.load_all()?;
        let failed = results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
            .count();
        if failed > 0 {
            warn!(source = %self.name, failed, "some rule files failed to load");
        }
        let rules = self.loader.rules();
        info!(source = %self.name, count = rules.len(), "rule directory loaded");
        Ok(rules)
    }

    fn watch(&mut self, changes: UnboundedSender<RuleChange>) -> Result<bool> {
        self.loader.watch(changes)?;
        Ok(true)
    }
}
