//! Graph source trait: the transport boundary to the data service.

use async_trait::async_trait;
use gpm_graph::MetadataGraph;

use crate::diff::GraphDiff;
use crate::error::SyncError;

/// Trait for backends that serve graph snapshots and diffs.
///
/// Timestamps are the data service's change markers. A source knows an
/// ordered set of them; diffs are requested between two known markers.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// The authoritative starting graph and its timestamp.
    async fn fetch_initial(&self) -> Result<(MetadataGraph, u64), SyncError>;

    /// The graph as of the newest known timestamp, used to resynchronize.
    async fn fetch_current(&self) -> Result<(MetadataGraph, u64), SyncError>;

    /// The change set moving the graph from `from` to `to`.
    async fn fetch_diff(&self, from: u64, to: u64) -> Result<GraphDiff, SyncError>;

    /// Whether a timestamp newer than `since` is known.
    async fn has_newer(&self, since: u64) -> Result<bool, SyncError>;

    /// The next timestamp after `since`, or `since` itself when none is newer.
    async fn next_timestamp(&self, since: u64) -> Result<u64, SyncError>;

    /// Human-readable name for logs (e.g. the base URL).
    fn name(&self) -> &str;
}

/// Whether any of `timestamps` is newer than `since`.
pub fn has_newer_in(timestamps: &[u64], since: u64) -> bool {
    timestamps.iter().any(|t| *t > since)
}

/// Smallest of `timestamps` greater than `since`, or `since` when there is none.
pub fn next_timestamp_in(timestamps: &[u64], since: u64) -> u64 {
    timestamps
        .iter()
        .copied()
        .filter(|t| *t > since)
        .min()
        .unwrap_or(since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_timestamp_walks_forward() {
        let ts = [10, 20, 30];
        assert_eq!(next_timestamp_in(&ts, 10), 20);
        assert_eq!(next_timestamp_in(&ts, 20), 30);
        assert_eq!(next_timestamp_in(&ts, 30), 30);
    }

    #[test]
    fn unknown_since_goes_to_first_newer() {
        let ts = [10, 20, 30];
        assert_eq!(next_timestamp_in(&ts, 1), 10);
        assert_eq!(next_timestamp_in(&ts, 15), 20);
        assert!(has_newer_in(&ts, 15));
        assert!(!has_newer_in(&ts, 31));
    }

    #[test]
    fn empty_set_has_nothing_newer() {
        assert!(!has_newer_in(&[], 0));
        assert_eq!(next_timestamp_in(&[], 7), 7);
    }
}
