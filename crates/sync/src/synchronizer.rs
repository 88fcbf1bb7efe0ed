//! Applies diffs to the live graph.
//!
//! A diff is applied to a copy of the graph and committed only when every
//! part went through, so readers never see a half-applied diff and a failed
//! diff leaves the graph untouched.

use gpm_graph::{GraphEvent, Identifier, MetadataGraph};
use tracing::{debug, info, warn};

use crate::diff::GraphDiff;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, Default)]
pub struct Synchronizer {
    /// Fail the whole diff when a delete refers to state the graph lacks.
    strict: bool,
}

impl Synchronizer {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn lenient() -> Self {
        Self::new(false)
    }

    pub fn strict() -> Self {
        Self::new(true)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Merge partial graphs into one authoritative starting graph.
    /// The last part's timestamp wins.
    pub fn load_initial(&self, parts: Vec<MetadataGraph>) -> MetadataGraph {
        let mut graph = MetadataGraph::new();
        graph.set_last_updated(1);
        for part in &parts {
            graph.set_last_updated(part.last_updated());
            graph.merge(part);
        }
        let orphans = graph.collect_garbage();
        if !orphans.is_empty() {
            debug!(count = orphans.len(), "dropped bare identifiers from initial graph");
        }
        info!(
            identifiers = graph.identifier_count(),
            links = graph.link_count(),
            timestamp = graph.last_updated(),
            "initial graph loaded"
        );
        graph
    }

    /// Events that describe `graph` as if every piece had just been added.
    pub fn snapshot_events(graph: &MetadataGraph) -> Vec<GraphEvent> {
        let mut events = Vec::new();
        for identifier in graph.identifiers() {
            if !graph.metadata_of(identifier).is_empty() {
                events.push(GraphEvent::IdentifierChanged(identifier.clone()));
            }
        }
        events.extend(graph.links().cloned().map(GraphEvent::LinkAdded));
        events
    }

    /// Apply `diff` to `graph`: deletes first, then updates, then a garbage sweep.
    pub fn apply(&self, graph: &mut MetadataGraph, diff: &GraphDiff) -> Result<Vec<GraphEvent>> {
        if diff.from != graph.last_updated() {
            self.miss(SyncError::StaleDiff {
                diff_from: diff.from,
                graph_at: graph.last_updated(),
            })?;
        }

        let mut next = graph.clone();
        let mut events = Vec::new();

        for part in &diff.deletes {
            self.apply_delete(&mut next, part, &mut events)?;
        }
        for part in &diff.updates {
            apply_update(&mut next, part, &mut events);
        }
        events.extend(next.collect_garbage().into_iter().map(GraphEvent::IdentifierRemoved));
        next.set_last_updated(diff.to);

        for event in &events {
            debug!(%event, "graph changed");
        }
        info!(
            from = diff.from,
            to = diff.to,
            events = events.len(),
            identifiers = next.identifier_count(),
            links = next.link_count(),
            "diff applied"
        );

        *graph = next;
        Ok(events)
    }

    fn miss(&self, err: SyncError) -> Result<()> {
        if self.strict {
            return Err(err);
        }
        warn!(error = %err, "diff does not match local graph, continuing");
        Ok(())
    }

    fn apply_delete(
        &self,
        graph: &mut MetadataGraph,
        part: &MetadataGraph,
        events: &mut Vec<GraphEvent>,
    ) -> Result<()> {
        for link in part.links() {
            match graph.remove_link(&link.source, &link.target, &link.metadata) {
                Some(removed) => {
                    let mut endpoints: Vec<&Identifier> = vec![&link.source];
                    if link.source != link.target {
                        endpoints.push(&link.target);
                    }
                    events.push(GraphEvent::LinkRemoved(removed));
                    for endpoint in endpoints {
                        if !graph.contains_identifier(endpoint) {
                            events.push(GraphEvent::IdentifierRemoved(endpoint.clone()));
                        }
                    }
                }
                None => self.miss(SyncError::MissingLink(format!(
                    "{} -[{}]- {}",
                    link.source, link.metadata, link.target
                )))?,
            }
        }

        for identifier in part.identifiers() {
            for metadata in part.metadata_of(identifier) {
                if graph.remove_metadata_from_identifier(identifier, metadata).is_none() {
                    self.miss(SyncError::MissingMetadata {
                        identifier: identifier.to_string(),
                        metadata: metadata.to_string(),
                    })?;
                    continue;
                }
                if graph.contains_identifier(identifier) {
                    events.push(GraphEvent::IdentifierChanged(identifier.clone()));
                } else {
                    events.push(GraphEvent::IdentifierRemoved(identifier.clone()));
                }
            }
        }
        Ok(())
    }
}

fn apply_update(graph: &mut MetadataGraph, part: &MetadataGraph, events: &mut Vec<GraphEvent>) {
    for identifier in part.identifiers() {
        if graph.add_identifier(identifier.clone()) {
            events.push(GraphEvent::IdentifierAdded(identifier.clone()));
        }
        let mut changed = false;
        for metadata in part.metadata_of(identifier) {
            changed |= graph
                .add_metadata_to_identifier(identifier.clone(), metadata.clone())
                .changed();
        }
        if changed {
            events.push(GraphEvent::IdentifierChanged(identifier.clone()));
        }
    }

    for link in part.links() {
        let outcome = graph.add_link(link.source.clone(), link.target.clone(), link.metadata.clone());
        if outcome.changed() {
            if let Some(stored) = graph.link(outcome.id()) {
                events.push(GraphEvent::LinkAdded(stored.clone()));
            }
        }
    }
}
