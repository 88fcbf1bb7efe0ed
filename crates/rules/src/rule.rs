use std::fmt;
use std::sync::Arc;

use gpm_graph::{GraphEvent, MetadataGraph};
use serde::{Deserialize, Serialize};

use crate::compare::{compare_metadata, compare_vertex};
use crate::matcher::PatternMatcher;
use crate::pattern::PatternGraph;
use crate::recommendation::render_recommendation;
use crate::relation::RelationTable;
use crate::rule_match::RuleMatch;

/// Process-wide rule identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl RuleId {
    pub fn next(self) -> Self {
        RuleId(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RuleId {
    fn from(id: u64) -> Self {
        RuleId(id)
    }
}

/// A pattern plus what to do when it matches.
///
/// `key` is the stable textual identity of the rule definition (the YAML
/// `metadata.id`, or a fixed name for compiled-in rules). `id` is the numeric
/// id the engine knows it by and may be reassigned on registration.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub id: RuleId,
    pub key: String,
    pub name: String,
    pub description: String,
    /// Free text with `$variable$` placeholders.
    pub recommendation: String,
    pub pattern: Arc<PatternGraph>,
    /// Action names, resolved by the dispatcher.
    pub actions: Vec<String>,
}

impl PatternRule {
    pub fn new(id: impl Into<RuleId>, key: impl Into<String>, name: impl Into<String>, pattern: PatternGraph) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            name: name.into(),
            description: String::new(),
            recommendation: String::new(),
            pattern: Arc::new(pattern),
            actions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Every distinct embedding of this rule's pattern in `graph`.
    pub fn find_matches(&self, graph: &MetadataGraph) -> Vec<RuleMatch> {
        PatternMatcher::new(self.id, &self.pattern, graph).find_all()
    }

    /// The recommendation with this match's bindings filled in.
    pub fn recommendation_for(&self, found: &RuleMatch) -> String {
        render_recommendation(&self.recommendation, found.bindings())
    }

    /// Whether `event` could complete an embedding of this rule.
    ///
    /// Only the changed element is compared, against each pattern edge or
    /// vertex in isolation with a fresh relation table. Events other than
    /// link additions and identifier changes never affect a rule.
    pub fn is_affected_by(&self, event: &GraphEvent, snapshot: &MetadataGraph) -> bool {
        match event {
            GraphEvent::LinkAdded(link) => self
                .pattern
                .edges()
                .any(|(_, edge)| compare_metadata(&edge.metadata, &link.metadata, &mut RelationTable::new())),
            GraphEvent::IdentifierChanged(identifier) => {
                let metadata = snapshot.metadata_of(identifier);
                self.pattern
                    .vertices()
                    .any(|(_, vertex)| compare_vertex(vertex, identifier, metadata, &mut RelationTable::new()))
            }
            _ => false,
        }
    }
}

impl fmt::Display for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {} '{}' ({})", self.id, self.name, self.key)
    }
}
