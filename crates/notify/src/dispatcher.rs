//! Routes graph changes to the rules they may affect.
//!
//! The [`MatchEngine`] owns every registered rule together with its actions
//! and the set of match digests it already fired for. For each change batch
//! it picks the rules an event could complete, evaluates them concurrently
//! against the batch snapshot and runs the actions of every novel match
//! exactly once. One rule failing never blocks the others.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use gpm_graph::MetadataGraph;
use gpm_rules::{PatternRule, RuleChange, RuleId, RuleMatch};
use gpm_sync::ChangeBatch;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::registry::ActionRegistry;
use crate::traits::{DispatchResult, RuleAction};

/// A rule as the engine keeps it.
#[derive(Clone)]
struct RegisteredRule {
    rule: Arc<PatternRule>,
    actions: Vec<Arc<dyn RuleAction>>,
    /// Digests of matches whose actions already ran.
    fired: Arc<Mutex<HashSet<String>>>,
}

/// Rule table, dedup sets and action bindings in one explicit value.
pub struct MatchEngine {
    rules: BTreeMap<RuleId, RegisteredRule>,
    /// Rule definition key to the id it is registered under.
    keys: HashMap<String, RuleId>,
    registry: ActionRegistry,
}

impl MatchEngine {
    pub fn new(registry: ActionRegistry) -> Self {
        Self {
            rules: BTreeMap::new(),
            keys: HashMap::new(),
            registry,
        }
    }

    /// Create an engine with no named actions.
    pub fn empty() -> Self {
        Self::new(ActionRegistry::new())
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Register `rule` with explicit actions and return the id it got.
    ///
    /// A rule whose key is already registered replaces the old definition
    /// (and forgets its fired matches). When the requested id is taken the
    /// next free id above it is used.
    pub fn register_rule(&mut self, mut rule: PatternRule, actions: Vec<Arc<dyn RuleAction>>) -> RuleId {
        if let Some(previous) = self.keys.get(&rule.key).copied() {
            self.remove_rule(previous);
        }

        let requested = rule.id;
        let mut id = requested;
        while self.rules.contains_key(&id) {
            id = id.next();
        }
        if id != requested {
            tracing::info!(rule = %rule.name, requested = %requested, assigned = %id, "rule id taken, reassigned");
        }
        rule.id = id;

        tracing::info!(rule_id = %id, rule = %rule.name, key = %rule.key, actions = actions.len(), "rule registered");
        self.keys.insert(rule.key.clone(), id);
        self.rules.insert(
            id,
            RegisteredRule {
                rule: Arc::new(rule),
                actions,
                fired: Arc::new(Mutex::new(HashSet::new())),
            },
        );
        id
    }

    /// Register `rule` with the actions its names resolve to in the registry.
    pub fn register(&mut self, rule: PatternRule) -> RuleId {
        let actions = self.registry.resolve(&rule);
        self.register_rule(rule, actions)
    }

    pub fn remove_rule(&mut self, id: RuleId) -> Option<Arc<PatternRule>> {
        let removed = self.rules.remove(&id)?;
        self.keys.remove(&removed.rule.key);
        tracing::info!(rule_id = %id, rule = %removed.rule.name, "rule removed");
        Some(removed.rule)
    }

    pub fn remove_rule_by_key(&mut self, key: &str) -> Option<Arc<PatternRule>> {
        let id = self.keys.get(key).copied()?;
        self.remove_rule(id)
    }

    /// Apply a hot-reload notification from the rule loader.
    pub fn apply_change(&mut self, change: RuleChange) {
        match change {
            RuleChange::Upserted(rule) => {
                self.register(rule);
            }
            RuleChange::Removed { key } => {
                if self.remove_rule_by_key(&key).is_none() {
                    tracing::debug!(key = %key, "removed rule was not registered");
                }
            }
        }
    }

    pub fn has_rule_id(&self, id: RuleId) -> bool {
        self.rules.contains_key(&id)
    }

    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.rules.keys().copied().collect()
    }

    pub fn rule(&self, id: RuleId) -> Option<Arc<PatternRule>> {
        self.rules.get(&id).map(|r| Arc::clone(&r.rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether any trigger event of `batch` could complete rule `id`.
    pub fn is_rule_affected(&self, id: RuleId, batch: &ChangeBatch) -> bool {
        self.rules
            .get(&id)
            .map(|r| batch.triggers().any(|event| r.rule.is_affected_by(event, &batch.snapshot)))
            .unwrap_or(false)
    }

    /// Match rule `id` against `snapshot` and fire actions for novel matches.
    pub async fn evaluate(&self, id: RuleId, snapshot: Arc<MetadataGraph>) -> Vec<DispatchResult> {
        match self.rules.get(&id) {
            Some(registered) => evaluate_rule(registered.clone(), snapshot).await,
            None => {
                tracing::warn!(rule_id = %id, "evaluate called for unknown rule");
                Vec::new()
            }
        }
    }

    /// Evaluate every rule affected by `batch`, concurrently.
    pub async fn dispatch(&self, batch: &ChangeBatch) -> Vec<DispatchResult> {
        if !batch.has_triggers() {
            tracing::debug!(timestamp = batch.timestamp, "no trigger events in batch");
            return Vec::new();
        }

        let mut tasks = JoinSet::new();
        for (id, registered) in &self.rules {
            if !self.is_rule_affected(*id, batch) {
                continue;
            }
            tracing::debug!(rule_id = %id, timestamp = batch.timestamp, "rule affected, evaluating");
            tasks.spawn(evaluate_rule(registered.clone(), Arc::clone(&batch.snapshot)));
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(rule_results) => results.extend(rule_results),
                Err(e) => tracing::error!(error = %e, "rule evaluation task failed"),
            }
        }
        results
    }

    /// Consume change batches until the channel closes, applying rule
    /// changes as they arrive.
    pub async fn run(mut self, mut batches: UnboundedReceiver<ChangeBatch>, mut changes: UnboundedReceiver<RuleChange>) {
        let mut changes_open = true;
        tracing::info!(rules = self.len(), "match engine started");

        loop {
            tokio::select! {
                batch = batches.recv() => match batch {
                    Some(batch) => {
                        let results = self.dispatch(&batch).await;
                        let failed = results.iter().filter(|r| !r.success).count();
                        if !results.is_empty() {
                            tracing::info!(
                                timestamp = batch.timestamp,
                                actions = results.len(),
                                failed,
                                "batch dispatched"
                            );
                        }
                    }
                    None => break,
                },
                change = changes.recv(), if changes_open => match change {
                    Some(change) => self.apply_change(change),
                    None => changes_open = false,
                },
            }
        }

        tracing::info!("match engine stopped");
    }
}

async fn evaluate_rule(registered: RegisteredRule, snapshot: Arc<MetadataGraph>) -> Vec<DispatchResult> {
    let rule = Arc::clone(&registered.rule);
    let matches = match tokio::task::spawn_blocking(move || rule.find_matches(&snapshot)).await {
        Ok(matches) => matches,
        Err(e) => {
            tracing::error!(rule_id = %registered.rule.id, error = %e, "pattern matching panicked");
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    for found in matches {
        if !record_novel(&registered.fired, &found).await {
            continue;
        }
        tracing::info!(rule_id = %registered.rule.id, digest = %found.digest(), "novel match");
        results.extend(run_actions(&registered, &found).await);
    }
    results
}

/// Atomically record `found` as fired. `false` when it already was.
async fn record_novel(fired: &Mutex<HashSet<String>>, found: &RuleMatch) -> bool {
    fired.lock().await.insert(found.digest().to_string())
}

async fn run_actions(registered: &RegisteredRule, found: &RuleMatch) -> Vec<DispatchResult> {
    let rule = &registered.rule;
    let mut results = Vec::with_capacity(registered.actions.len());

    for action in &registered.actions {
        let start = Instant::now();
        let result = action.perform(rule, found).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, error) = match result {
            Ok(()) => {
                tracing::debug!(rule_id = %rule.id, action = action.name(), duration_ms, "action performed");
                (true, None)
            }
            Err(e) => {
                tracing::warn!(
                    rule_id = %rule.id,
                    action = action.name(),
                    error = %e,
                    duration_ms,
                    "action failed"
                );
                (false, Some(e.to_string()))
            }
        };

        results.push(DispatchResult {
            rule_id: rule.id,
            action: action.name().to_string(),
            digest: found.digest().to_string(),
            success,
            error,
            duration_ms,
        });
    }

    results
}
