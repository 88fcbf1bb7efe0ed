//! HTTP graph source for the data service REST API.
//!
//! Endpoints hang off `{url}/{connection}/graph/`:
//! - `initial` and `current` return arrays of partial graphs
//! - `changes` returns an object keyed by change timestamps
//! - `{from}/{to}` returns `{updates, deletes}`
//!
//! Every request carries `?rawData=true|false`.

use std::time::Duration;

use async_trait::async_trait;
use gpm_core::SyncConfig;
use gpm_graph::wire::documents_from_json_array;
use gpm_graph::{DiffDocument, MetadataGraph};

use crate::diff::GraphDiff;
use crate::error::SyncError;
use crate::source::{has_newer_in, next_timestamp_in, GraphSource};
use crate::synchronizer::Synchronizer;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct HttpGraphSource {
    /// Base URL ending in `/graph/`.
    base_url: String,
    raw_data: bool,
    client: reqwest::Client,
}

impl HttpGraphSource {
    pub fn new(base_url: impl Into<String>, raw_data: bool) -> Result<Self, SyncError> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url,
            raw_data,
            client,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        Self::new(config.graph_base_url(), config.raw_data)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}?rawData={}", self.base_url, path, self.raw_data)
    }

    async fn get(&self, path: &str) -> Result<String, SyncError> {
        let url = self.url(path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        tracing::trace!(url = %url, bytes = body.len(), "fetched");
        Ok(body)
    }

    async fn fetch_parts(&self, path: &str) -> Result<(MetadataGraph, u64), SyncError> {
        let body = self.get(path).await?;
        let parts = documents_from_json_array(&body)?;
        let graph = Synchronizer::lenient().load_initial(parts);
        let timestamp = graph.last_updated();
        Ok((graph, timestamp))
    }

    /// Sorted change timestamps known to the data service.
    async fn changes(&self) -> Result<Vec<u64>, SyncError> {
        let body = self.get("changes").await?;
        parse_changes(&body)
    }
}

/// Parse the `changes` body: an object whose keys are timestamps.
pub(crate) fn parse_changes(body: &str) -> Result<Vec<u64>, SyncError> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(body)?;
    let mut timestamps: Vec<u64> = map
        .keys()
        .filter_map(|k| match k.parse::<u64>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                tracing::warn!(key = %k, "ignoring non-numeric change timestamp");
                None
            }
        })
        .collect();
    timestamps.sort_unstable();
    Ok(timestamps)
}

#[async_trait]
impl GraphSource for HttpGraphSource {
    async fn fetch_initial(&self) -> Result<(MetadataGraph, u64), SyncError> {
        self.fetch_parts("initial").await
    }

    async fn fetch_current(&self) -> Result<(MetadataGraph, u64), SyncError> {
        self.fetch_parts("current").await
    }

    async fn fetch_diff(&self, from: u64, to: u64) -> Result<GraphDiff, SyncError> {
        let body = self.get(&format!("{from}/{to}")).await?;
        let doc: DiffDocument = serde_json::from_str(&body)?;
        GraphDiff::from_document(from, to, doc)
    }

    async fn has_newer(&self, since: u64) -> Result<bool, SyncError> {
        Ok(has_newer_in(&self.changes().await?, since))
    }

    async fn next_timestamp(&self, since: u64) -> Result<u64, SyncError> {
        Ok(next_timestamp_in(&self.changes().await?, since))
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_carry_raw_data_flag() {
        let source = HttpGraphSource::new("http://localhost:8000/default/graph", false).unwrap();
        assert_eq!(
            source.url("initial"),
            "http://localhost:8000/default/graph/initial?rawData=false"
        );
        assert_eq!(
            source.url("10/20"),
            "http://localhost:8000/default/graph/10/20?rawData=false"
        );
    }

    #[test]
    fn from_config_uses_connection() {
        let config = SyncConfig::default();
        let source = HttpGraphSource::from_config(&config).unwrap();
        assert_eq!(source.name(), "http://localhost:8000/localMAPServer/graph/");
    }

    #[test]
    fn changes_are_sorted_numerically() {
        let body = r#"{"1409833398907": 3, "900": 1, "1409833390000": 2, "bogus": 0}"#;
        assert_eq!(
            parse_changes(body).unwrap(),
            vec![900, 1409833390000, 1409833398907]
        );
    }
}
