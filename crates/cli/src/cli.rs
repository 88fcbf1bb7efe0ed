use std::path::PathBuf;

use clap::Parser;

/// Graph pattern matcher.
///
/// Mirrors the metadata graph of a data service, evaluates pattern rules on
/// every change and reports each new match to the rule's actions.
#[derive(Parser, Debug, Default)]
#[command(name = "gpm", about = "Continuous pattern matching over a live metadata graph")]
pub struct CliArgs {
    /// Configuration profile (keys are read as {PROFILE}_{KEY} first)
    #[arg(long, env = "GPM_PROFILE")]
    pub profile: Option<String>,

    /// Base URL of the graph data service
    #[arg(long)]
    pub dataservice_url: Option<String>,

    /// Connection name on the data service
    #[arg(long)]
    pub connection: Option<String>,

    /// Milliseconds between update checks
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Reject diffs that delete state the local graph does not have
    #[arg(long)]
    pub strict: bool,

    /// Directory holding PatternRule YAML files
    #[arg(long)]
    pub rules_dir: Option<PathBuf>,

    /// Reload rule files when they change
    #[arg(long)]
    pub watch: bool,

    /// Ignore the rules directory and use the compiled-in rules
    #[arg(long)]
    pub builtin_rules: bool,

    /// Webhook URL for the `webhook` action
    #[arg(long)]
    pub webhook_url: Option<String>,
}
