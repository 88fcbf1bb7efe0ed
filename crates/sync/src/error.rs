//! Synchronization error types.

use gpm_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("data service returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("graph decode error: {0}")]
    Graph(#[from] GraphError),

    #[error("diff deletes {0}, which is not in the graph")]
    MissingLink(String),

    #[error("diff deletes {metadata} from {identifier}, which does not carry it")]
    MissingMetadata { identifier: String, metadata: String },

    #[error("diff starts at {diff_from} but the graph is at {graph_at}")]
    StaleDiff { diff_from: u64, graph_at: u64 },

    #[error("no diff ending at timestamp {0}")]
    UnknownTimestamp(u64),

    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl SyncError {
    /// The diff disagrees with the local graph; retrying the same diff will not help.
    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            SyncError::MissingLink(_) | SyncError::MissingMetadata { .. } | SyncError::StaleDiff { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
