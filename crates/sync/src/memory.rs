//! In-memory graph source: a scripted initial graph plus ordered diffs.
//!
//! Used to replay recorded sessions and to drive the poller in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use gpm_graph::MetadataGraph;

use crate::diff::GraphDiff;
use crate::error::SyncError;
use crate::source::{has_newer_in, next_timestamp_in, GraphSource};
use crate::synchronizer::Synchronizer;

pub struct InMemorySource {
    name: String,
    initial: MetadataGraph,
    diffs: RwLock<Vec<GraphDiff>>,
    /// Number of upcoming fetches that fail with a 503.
    failures: AtomicUsize,
    fetches: AtomicUsize,
}

impl InMemorySource {
    pub fn new(initial: MetadataGraph) -> Self {
        Self {
            name: "memory".to_string(),
            initial,
            diffs: RwLock::new(Vec::new()),
            failures: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_diff(self, diff: GraphDiff) -> Self {
        self.push_diff(diff);
        self
    }

    /// Make a new diff available. Diffs are kept ordered by their end timestamp.
    pub fn push_diff(&self, diff: GraphDiff) {
        let mut diffs = self.diffs.write().expect("diff lock poisoned");
        diffs.push(diff);
        diffs.sort_by_key(|d| d.to);
    }

    /// Let the next `n` fetches fail.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Number of fetch calls served so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn timestamps(&self) -> Vec<u64> {
        let diffs = self.diffs.read().expect("diff lock poisoned");
        diffs.iter().map(|d| d.to).collect()
    }

    fn begin_fetch(&self) -> Result<(), SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(SyncError::Status {
                status: 503,
                url: format!("{}://", self.name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GraphSource for InMemorySource {
    async fn fetch_initial(&self) -> Result<(MetadataGraph, u64), SyncError> {
        self.begin_fetch()?;
        Ok((self.initial.clone(), self.initial.last_updated()))
    }

    async fn fetch_current(&self) -> Result<(MetadataGraph, u64), SyncError> {
        self.begin_fetch()?;
        let mut graph = self.initial.clone();
        let diffs = self.diffs.read().expect("diff lock poisoned").clone();
        let sync = Synchronizer::lenient();
        for diff in &diffs {
            // Replay from wherever the previous diff left the graph.
            let mut rebased = diff.clone();
            rebased.from = graph.last_updated();
            sync.apply(&mut graph, &rebased)?;
        }
        let timestamp = graph.last_updated();
        Ok((graph, timestamp))
    }

    async fn fetch_diff(&self, from: u64, to: u64) -> Result<GraphDiff, SyncError> {
        self.begin_fetch()?;
        let diffs = self.diffs.read().expect("diff lock poisoned");
        diffs
            .iter()
            .find(|d| d.to == to)
            .map(|d| GraphDiff {
                from,
                ..d.clone()
            })
            .ok_or(SyncError::UnknownTimestamp(to))
    }

    async fn has_newer(&self, since: u64) -> Result<bool, SyncError> {
        self.begin_fetch()?;
        Ok(has_newer_in(&self.timestamps(), since))
    }

    async fn next_timestamp(&self, since: u64) -> Result<u64, SyncError> {
        self.begin_fetch()?;
        Ok(next_timestamp_in(&self.timestamps(), since))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
