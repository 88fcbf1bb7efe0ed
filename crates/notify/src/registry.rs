//! Name to action lookup used when wiring rules.

use std::collections::HashMap;
use std::sync::Arc;

use gpm_core::ActionsConfig;
use gpm_rules::PatternRule;

use crate::log_action::LogAction;
use crate::templating::TemplateRenderer;
use crate::traits::{ActionError, RuleAction};
use crate::webhook::WebhookAction;

/// Actions by the name rules use to refer to them.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn RuleAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `log` always, `webhook` when a URL is configured.
    pub fn from_config(config: &ActionsConfig) -> Result<Self, ActionError> {
        let mut registry = Self::new();
        registry.register(Arc::new(LogAction::new()));
        if let Some(url) = &config.webhook_url {
            let webhook = WebhookAction::from_config(
                url.clone(),
                None,
                None,
                config.webhook_template.clone(),
                Arc::new(TemplateRenderer::new()),
            )?;
            registry.register(Arc::new(webhook));
        }
        Ok(registry)
    }

    /// Register `action` under its own name, replacing any previous one.
    pub fn register(&mut self, action: Arc<dyn RuleAction>) {
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RuleAction>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The actions `rule` names. Unknown names are logged and skipped.
    pub fn resolve(&self, rule: &PatternRule) -> Vec<Arc<dyn RuleAction>> {
        rule.actions
            .iter()
            .filter_map(|name| {
                let action = self.get(name);
                if action.is_none() {
                    tracing::warn!(rule_id = %rule.id, rule = %rule.name, action = %name, "unknown action, skipping");
                }
                action
            })
            .collect()
    }
}
