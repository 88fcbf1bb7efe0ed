use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub sync: SyncConfig,
    pub rules: RulesConfig,
    pub actions: ActionsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `GPM_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("GPM_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            sync: SyncConfig::from_env_profiled(p),
            rules: RulesConfig::from_env_profiled(p),
            actions: ActionsConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  sync:     url={}, connection={}, interval={}ms, retry={}ms, timeout={}ms, strict={}",
            self.sync.dataservice_url,
            self.sync.connection,
            self.sync.update_interval_ms,
            self.sync.retry_delay_ms,
            self.sync.fetch_timeout_ms,
            self.sync.strict_diffs,
        );
        tracing::info!(
            "  rules:    dir={}, watch={}",
            self.rules.rules_dir.display(),
            self.rules.watch
        );
        tracing::info!(
            "  actions:  webhook={}",
            if self.actions.webhook_url.is_some() { "(configured)" } else { "(none)" }
        );
    }

    /// Return a redacted view (webhook URLs may embed tokens).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "sync": {
                "dataservice_url": self.sync.dataservice_url,
                "connection": self.sync.connection,
                "raw_data": self.sync.raw_data,
                "update_interval_ms": self.sync.update_interval_ms,
                "retry_delay_ms": self.sync.retry_delay_ms,
                "fetch_timeout_ms": self.sync.fetch_timeout_ms,
                "strict_diffs": self.sync.strict_diffs,
            },
            "rules": { "rules_dir": self.rules.rules_dir, "watch": self.rules.watch },
            "actions": {
                "webhook_configured": self.actions.webhook_url.is_some(),
                "webhook_template": self.actions.webhook_template.is_some(),
            },
        })
    }
}

// ── Graph synchronization ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the graph data service.
    pub dataservice_url: String,
    /// Name of the connection on the data service whose graph is mirrored.
    pub connection: String,
    /// Ask the data service to include raw XML for identifiers and metadata.
    pub raw_data: bool,
    pub update_interval_ms: u64,
    pub retry_delay_ms: u64,
    pub fetch_timeout_ms: u64,
    /// Reject a whole diff when a delete refers to state the graph does not have.
    pub strict_diffs: bool,
}

impl SyncConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dataservice_url: profiled_env_or(p, "DATASERVICE_URL", "http://localhost:8000"),
            connection: profiled_env_or(p, "DATASERVICE_CONNECTION", "localMAPServer"),
            raw_data: profiled_env_bool(p, "DATASERVICE_RAWDATA", true),
            update_interval_ms: profiled_env_u64(p, "GPM_UPDATE_INTERVAL_MS", 1000),
            retry_delay_ms: profiled_env_u64(p, "GPM_RETRY_DELAY_MS", 5000),
            fetch_timeout_ms: profiled_env_u64(p, "GPM_FETCH_TIMEOUT_MS", 10_000),
            strict_diffs: profiled_env_bool(p, "GPM_STRICT_DIFFS", false),
        }
    }

    /// `{url}/{connection}/graph/`, the prefix every graph endpoint hangs off.
    pub fn graph_base_url(&self) -> String {
        format!(
            "{}/{}/graph/",
            self.dataservice_url.trim_end_matches('/'),
            self.connection
        )
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dataservice_url: "http://localhost:8000".to_string(),
            connection: "localMAPServer".to_string(),
            raw_data: true,
            update_interval_ms: 1000,
            retry_delay_ms: 5000,
            fetch_timeout_ms: 10_000,
            strict_diffs: false,
        }
    }
}

// ── Rules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub rules_dir: PathBuf,
    /// Hot-reload rule files on change.
    pub watch: bool,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: PathBuf::from(profiled_env_or(p, "GPM_RULES_DIR", "rules")),
            watch: profiled_env_bool(p, "GPM_RULES_WATCH", false),
        }
    }
}

// ── Actions ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionsConfig {
    pub webhook_url: Option<String>,
    /// Optional minijinja template for the webhook request body.
    pub webhook_template: Option<String>,
}

impl ActionsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "GPM_WEBHOOK_URL"),
            webhook_template: profiled_env_opt(p, "GPM_WEBHOOK_TEMPLATE"),
        }
    }
}
