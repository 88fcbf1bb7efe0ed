//! RuleAction trait definition and shared error types.

use gpm_graph::Properties;
use gpm_rules::{PatternRule, RelationTable, RuleId, RuleMatch};

/// Errors that can occur while performing an action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("match belongs to rule {found}, action was invoked for rule {expected}")]
    RuleMismatch { expected: RuleId, found: RuleId },
}

/// The identifier a match is reported against.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PublishedIdentifier {
    pub type_name: String,
    pub properties: Properties,
}

/// Everything an action reports about one novel match.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Incident {
    pub rule_id: u64,
    pub rule_key: String,
    pub rule_name: String,
    pub description: String,
    /// The recommendation with the match's bindings filled in.
    pub recommendation: String,
    pub publish_vertex: PublishedIdentifier,
    pub bindings: RelationTable,
    /// Content digest of the matched subgraph.
    pub digest: String,
    pub identifiers: usize,
    pub links: usize,
    /// RFC 3339 time the incident was built.
    pub detected_at: String,
}

impl Incident {
    /// Build the incident for `found`, refusing a match of another rule.
    pub fn new(rule: &PatternRule, found: &RuleMatch) -> Result<Self, ActionError> {
        ensure_same_rule(rule, found)?;
        let publish = found.publish_vertex();
        Ok(Self {
            rule_id: rule.id.0,
            rule_key: rule.key.clone(),
            rule_name: rule.name.clone(),
            description: rule.description.clone(),
            recommendation: rule.recommendation_for(found),
            publish_vertex: PublishedIdentifier {
                type_name: publish.type_name.clone(),
                properties: publish.properties.clone(),
            },
            bindings: found.bindings().clone(),
            digest: found.digest().to_string(),
            identifiers: found.graph().identifier_count(),
            links: found.graph().link_count(),
            detected_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

pub fn ensure_same_rule(rule: &PatternRule, found: &RuleMatch) -> Result<(), ActionError> {
    if rule.id != found.rule_id() {
        return Err(ActionError::RuleMismatch {
            expected: rule.id,
            found: found.rule_id(),
        });
    }
    Ok(())
}

/// Something to do when a rule finds a novel match.
#[async_trait::async_trait]
pub trait RuleAction: Send + Sync {
    /// Perform the action for one match of `rule`.
    ///
    /// Implementations must refuse a match whose rule id differs from
    /// `rule.id` with [`ActionError::RuleMismatch`].
    async fn perform(&self, rule: &PatternRule, found: &RuleMatch) -> Result<(), ActionError>;

    /// Name rules refer to this action by (e.g., "log", "webhook").
    fn name(&self) -> &str;
}

/// Result of running one action for one match.
#[derive(Debug)]
pub struct DispatchResult {
    pub rule_id: RuleId,
    pub action: String,
    pub digest: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
