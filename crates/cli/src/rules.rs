//! Picks the rule source the process runs with.

use anyhow::{Context, Result};
use gpm_core::RulesConfig;
use gpm_rules::{DirectoryRuleSource, PatternRule, RuleSource, StaticRuleSource};
use tracing::{info, warn};

/// The rules directory, or the compiled-in set when asked for or when the
/// directory holds no enabled rule.
pub fn open_source(config: &RulesConfig, builtin_only: bool) -> Result<(Box<dyn RuleSource>, Vec<PatternRule>)> {
    if !builtin_only {
        let mut directory = DirectoryRuleSource::new(config.rules_dir.clone());
        let rules = directory
            .load()
            .with_context(|| format!("failed to scan rules directory {}", config.rules_dir.display()))?;
        if !rules.is_empty() {
            return Ok((Box::new(directory), rules));
        }
        warn!(path = %config.rules_dir.display(), "no rules in directory, using built-in rules");
    }

    let mut builtin = StaticRuleSource::builtin();
    let rules = builtin.load().context("failed to load built-in rules")?;
    info!(count = rules.len(), "using built-in rules");
    Ok((Box::new(builtin), rules))
}
