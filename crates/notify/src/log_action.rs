//! Action that reports matches through `tracing`.

use gpm_rules::{PatternRule, RuleMatch};

use crate::traits::{ensure_same_rule, ActionError, RuleAction};

/// Logs the rendered recommendation of every novel match at `info`.
#[derive(Debug, Default)]
pub struct LogAction;

impl LogAction {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl RuleAction for LogAction {
    async fn perform(&self, rule: &PatternRule, found: &RuleMatch) -> Result<(), ActionError> {
        ensure_same_rule(rule, found)?;
        let publish = found.publish_vertex();
        tracing::info!(
            rule_id = %rule.id,
            rule = %rule.name,
            publish_type = %publish.type_name,
            digest = %found.digest(),
            "{}",
            rule.recommendation_for(found)
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
