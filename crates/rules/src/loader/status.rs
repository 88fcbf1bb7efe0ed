//! Load outcomes and change notifications.

use std::path::PathBuf;

use crate::rule::PatternRule;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Rule was successfully loaded.
    Loaded { rule_id: String },
    /// File was skipped (dotfile, non-YAML, disabled rule).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}

/// A change to the loaded rule set observed while watching.
#[derive(Debug, Clone)]
pub enum RuleChange {
    /// A rule was added or its definition changed.
    Upserted(PatternRule),
    /// The rule with this key is gone (file deleted or rule disabled).
    Removed { key: String },
}
