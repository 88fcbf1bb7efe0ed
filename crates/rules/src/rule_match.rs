use std::hash::{Hash, Hasher};

use gpm_graph::{Identifier, MetadataGraph};

use crate::relation::RelationTable;
use crate::rule::RuleId;

/// One embedding of a rule's pattern in the live graph.
///
/// `graph` is the induced subgraph: the matched identifiers carrying only the
/// metadata some pattern vertex asked for, and the matched links. Two matches
/// are equal when their induced subgraphs have the same content digest.
#[derive(Debug, Clone)]
pub struct RuleMatch {
    rule_id: RuleId,
    graph: MetadataGraph,
    publish_vertex: Identifier,
    bindings: RelationTable,
    digest: String,
}

impl RuleMatch {
    pub fn new(rule_id: RuleId, graph: MetadataGraph, publish_vertex: Identifier, bindings: RelationTable) -> Self {
        let digest = graph.content_digest();
        Self {
            rule_id,
            graph,
            publish_vertex,
            bindings,
            digest,
        }
    }

    pub fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    pub fn graph(&self) -> &MetadataGraph {
        &self.graph
    }

    pub fn publish_vertex(&self) -> &Identifier {
        &self.publish_vertex
    }

    pub fn bindings(&self) -> &RelationTable {
        &self.bindings
    }

    /// Hex SHA-256 of the induced subgraph.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl PartialEq for RuleMatch {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for RuleMatch {}

impl Hash for RuleMatch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}
