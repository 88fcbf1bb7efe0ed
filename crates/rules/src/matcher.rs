//! Backtracking subgraph matcher.
//!
//! The search starts from the first pattern vertex against every live
//! identifier, then extends the embedding one pattern edge at a time. A
//! branch forks for every live link that could satisfy the current pattern
//! edge; a branch that cannot complete some incident edge is dropped as a
//! whole. Cycles in the pattern are closed by requiring that an already bound
//! pattern vertex is reached through the very same live identifier.
//!
//! Embeddings are not injective: two pattern edges may use the same live link
//! and two pattern vertices the same live identifier. Embeddings that induce
//! the same subgraph are reported once.

use gpm_graph::{Identifier, LinkId, MetadataGraph};
use indexmap::IndexMap;
use tracing::trace;

use crate::compare::{compare_metadata, compare_vertex};
use crate::pattern::{PatternEdgeId, PatternGraph, PatternVertexId};
use crate::relation::RelationTable;
use crate::rule::RuleId;
use crate::rule_match::RuleMatch;

/// Per-branch search state, cloned on every fork.
#[derive(Debug, Clone)]
struct SearchState<'g> {
    vertices: Vec<Option<&'g Identifier>>,
    edges: Vec<Option<LinkId>>,
    relations: RelationTable,
}

impl<'g> SearchState<'g> {
    fn new(pattern: &PatternGraph, relations: RelationTable) -> Self {
        Self {
            vertices: vec![None; pattern.vertex_count()],
            edges: vec![None; pattern.edge_count()],
            relations,
        }
    }

    fn vertex(&self, id: PatternVertexId) -> Option<&'g Identifier> {
        self.vertices[id.index()]
    }

    fn is_edge_matched(&self, id: PatternEdgeId) -> bool {
        self.edges[id.index()].is_some()
    }

    fn is_complete(&self) -> bool {
        self.vertices.iter().all(Option::is_some) && self.edges.iter().all(Option::is_some)
    }
}

pub struct PatternMatcher<'a> {
    rule_id: RuleId,
    pattern: &'a PatternGraph,
    graph: &'a MetadataGraph,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(rule_id: RuleId, pattern: &'a PatternGraph, graph: &'a MetadataGraph) -> Self {
        Self {
            rule_id,
            pattern,
            graph,
        }
    }

    /// All distinct embeddings, deduplicated by induced-subgraph digest.
    pub fn find_all(&self) -> Vec<RuleMatch> {
        let mut found = IndexMap::new();
        if self.pattern.is_empty() {
            return Vec::new();
        }
        let anchor = PatternVertexId(0);
        let start = SearchState::new(self.pattern, RelationTable::new());
        self.anchor(anchor, &start, &mut found);

        trace!(rule_id = %self.rule_id, matches = found.len(), "pattern search finished");
        found.into_values().collect()
    }

    /// Try binding the unmatched pattern vertex `v` to every live identifier.
    fn anchor(&self, v: PatternVertexId, state: &SearchState<'a>, found: &mut IndexMap<String, RuleMatch>) {
        let wanted = self.pattern.vertex(v);
        for live in self.graph.identifiers() {
            let mut relations = state.relations.clone();
            if compare_vertex(wanted, live, self.graph.metadata_of(live), &mut relations) {
                let mut next = state.clone();
                next.relations = relations;
                next.vertices[v.index()] = Some(live);
                self.traverse(v, next, found);
            }
        }
    }

    fn traverse(&self, current: PatternVertexId, state: SearchState<'a>, found: &mut IndexMap<String, RuleMatch>) {
        let Some(live_current) = state.vertex(current) else {
            return;
        };

        let open_edge = self
            .pattern
            .edges_of(current)
            .find(|e| !state.is_edge_matched(*e));

        if let Some(edge_id) = open_edge {
            let edge = self.pattern.edge(edge_id);
            let Some(pattern_opposite) = edge.opposite(current) else {
                return;
            };
            for link in self.graph.links_of(live_current) {
                let mut relations = state.relations.clone();
                if !compare_metadata(&edge.metadata, &link.metadata, &mut relations) {
                    continue;
                }
                let Some(live_opposite) = link.opposite(live_current) else {
                    continue;
                };

                match state.vertex(pattern_opposite) {
                    Some(bound) if bound == live_opposite => {}
                    Some(_) => continue,
                    None => {
                        let wanted = self.pattern.vertex(pattern_opposite);
                        if !compare_vertex(wanted, live_opposite, self.graph.metadata_of(live_opposite), &mut relations) {
                            continue;
                        }
                    }
                }

                let mut next = state.clone();
                next.relations = relations;
                next.edges[edge_id.index()] = Some(link.id);
                next.vertices[pattern_opposite.index()] = Some(live_opposite);
                self.traverse(pattern_opposite, next, found);
            }
            // Every continuation of this branch was forked above.
            return;
        }

        if state.is_complete() {
            if let Some(result) = self.build_match(&state) {
                found.entry(result.digest().to_string()).or_insert(result);
            }
            return;
        }

        // Continue from a bound vertex that still has open edges. If it cannot
        // be completed, neither can the pattern, so one candidate suffices.
        let incomplete = self.pattern.vertices().find_map(|(id, _)| {
            let open = self.pattern.edges_of(id).any(|e| !state.is_edge_matched(e));
            (state.vertex(id).is_some() && open).then_some(id)
        });
        if let Some(next) = incomplete {
            self.traverse(next, state, found);
            return;
        }

        // What is left is not reachable from anything bound: an isolated
        // pattern vertex or another component. Anchor it afresh.
        let unbound = self
            .pattern
            .vertices()
            .find_map(|(id, _)| state.vertex(id).is_none().then_some(id));
        if let Some(v) = unbound {
            self.anchor(v, &state, found);
        }
    }

    fn build_match(&self, state: &SearchState<'a>) -> Option<RuleMatch> {
        let mut result = MetadataGraph::new();
        result.set_last_updated(self.graph.last_updated());

        for (id, wanted) in self.pattern.vertices() {
            let Some(live) = state.vertex(id) else {
                continue;
            };
            result.add_identifier(live.clone());
            for metadata in self.graph.metadata_of(live) {
                let relevant = wanted
                    .metadata
                    .iter()
                    .any(|pm| compare_metadata(pm, metadata, &mut state.relations.clone()));
                if relevant {
                    result.add_metadata_to_identifier(live.clone(), metadata.clone());
                }
            }
        }

        for link in state.edges.iter().flatten().filter_map(|id| self.graph.link(*id)) {
            result.add_link(link.source.clone(), link.target.clone(), link.metadata.clone());
        }

        let publish = self
            .pattern
            .publish_vertex()
            .and_then(|id| state.vertex(id))
            .cloned()?;
        Some(RuleMatch::new(self.rule_id, result, publish, state.relations.clone()))
    }
}
