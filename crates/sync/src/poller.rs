//! Periodic polling loop that keeps the live graph current.
//!
//! The poller is the only writer of the live graph. After every applied diff
//! it publishes a [`ChangeBatch`] carrying an immutable snapshot, so readers
//! never observe a graph in the middle of an update.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use gpm_core::SyncConfig;
use gpm_graph::{GraphEvent, MetadataGraph};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::source::GraphSource;
use crate::synchronizer::Synchronizer;

/// Changes from one applied diff plus the graph right after it.
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    pub timestamp: u64,
    pub snapshot: Arc<MetadataGraph>,
    pub events: Vec<GraphEvent>,
}

impl ChangeBatch {
    pub fn triggers(&self) -> impl Iterator<Item = &GraphEvent> {
        self.events.iter().filter(|e| e.is_trigger())
    }

    pub fn has_triggers(&self) -> bool {
        self.triggers().next().is_some()
    }
}

pub struct Poller {
    source: Arc<dyn GraphSource>,
    synchronizer: Synchronizer,
    graph: Arc<RwLock<MetadataGraph>>,
    sender: mpsc::UnboundedSender<ChangeBatch>,
    interval: Duration,
    retry_delay: Duration,
    fetch_timeout: Duration,
}

impl Poller {
    pub fn new(source: Arc<dyn GraphSource>, sender: mpsc::UnboundedSender<ChangeBatch>) -> Self {
        Self::from_config(source, &SyncConfig::default(), sender)
    }

    pub fn from_config(
        source: Arc<dyn GraphSource>,
        config: &SyncConfig,
        sender: mpsc::UnboundedSender<ChangeBatch>,
    ) -> Self {
        Self {
            source,
            synchronizer: Synchronizer::new(config.strict_diffs),
            graph: Arc::new(RwLock::new(MetadataGraph::new())),
            sender,
            interval: config.update_interval(),
            retry_delay: config.retry_delay(),
            fetch_timeout: config.fetch_timeout(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_synchronizer(mut self, synchronizer: Synchronizer) -> Self {
        self.synchronizer = synchronizer;
        self
    }

    /// Shared handle to the live graph.
    pub fn graph(&self) -> Arc<RwLock<MetadataGraph>> {
        self.graph.clone()
    }

    fn current_timestamp(&self) -> u64 {
        self.graph.read().expect("graph lock poisoned").last_updated()
    }

    async fn bounded<T>(
        &self,
        fetch: impl Future<Output = Result<T, SyncError>>,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.fetch_timeout.as_millis() as u64)),
        }
    }

    fn publish(&self, batch: ChangeBatch) {
        if self.sender.send(batch).is_err() {
            debug!("no dispatcher listening, change batch dropped");
        }
    }

    /// Replace the live graph wholesale and publish it as one batch.
    fn install(&self, mut graph: MetadataGraph, timestamp: u64) {
        graph.set_last_updated(timestamp);
        let events = Synchronizer::snapshot_events(&graph);
        let snapshot = Arc::new(graph.clone());
        *self.graph.write().expect("graph lock poisoned") = graph;
        self.publish(ChangeBatch {
            timestamp,
            snapshot,
            events,
        });
    }

    /// Sleep for `duration` unless a stop is signalled first.
    /// Returns `false` when the loop should stop.
    async fn pause(&self, duration: Duration, stop: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => !*stop.borrow(),
            changed = stop.changed() => changed.is_ok() && !*stop.borrow(),
        }
    }

    /// Fetch the initial graph, retrying with the fixed retry delay until it
    /// arrives. Returns `false` if stopped first.
    pub async fn initialize(&self, stop: &mut watch::Receiver<bool>) -> bool {
        loop {
            if *stop.borrow() {
                return false;
            }
            match self.bounded(self.source.fetch_initial()).await {
                Ok((graph, timestamp)) => {
                    info!(
                        source = self.source.name(),
                        timestamp,
                        identifiers = graph.identifier_count(),
                        links = graph.link_count(),
                        "initial graph received"
                    );
                    self.install(graph, timestamp);
                    return true;
                }
                Err(e) => {
                    warn!(
                        source = self.source.name(),
                        error = %e,
                        retry_ms = self.retry_delay.as_millis() as u64,
                        "initial graph fetch failed, retrying"
                    );
                    if !self.pause(self.retry_delay, stop).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Apply every diff newer than the live graph. Returns how many were applied.
    pub async fn poll_once(&self) -> Result<usize, SyncError> {
        let mut applied = 0;
        loop {
            let since = self.current_timestamp();
            if !self.bounded(self.source.has_newer(since)).await? {
                break;
            }
            let next = self.bounded(self.source.next_timestamp(since)).await?;
            if next <= since {
                break;
            }
            let diff = self.bounded(self.source.fetch_diff(since, next)).await?;

            let batch = {
                let mut graph = self.graph.write().expect("graph lock poisoned");
                let events = self.synchronizer.apply(&mut graph, &diff)?;
                ChangeBatch {
                    timestamp: graph.last_updated(),
                    snapshot: Arc::new(graph.clone()),
                    events,
                }
            };
            self.publish(batch);
            applied += 1;
        }
        Ok(applied)
    }

    /// Throw the local graph away and load the source's current graph.
    pub async fn resync(&self) -> Result<(), SyncError> {
        let (graph, timestamp) = self.bounded(self.source.fetch_current()).await?;
        warn!(timestamp, "resynchronized from current graph");
        self.install(graph, timestamp);
        Ok(())
    }

    /// Run until `stop` flips to `true` (or its sender is dropped).
    ///
    /// The flag is checked once per iteration; a diff that is being applied
    /// always completes.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        info!(source = self.source.name(), "establishing initial connection");
        if !self.initialize(&mut stop).await {
            info!("stopped before the initial graph was loaded");
            return;
        }

        loop {
            if *stop.borrow() {
                break;
            }
            match self.poll_once().await {
                Ok(0) => {}
                Ok(diffs) => debug!(diffs, timestamp = self.current_timestamp(), "graph updated"),
                Err(e) if e.is_divergence() => {
                    warn!(error = %e, "diff rejected, resynchronizing");
                    if let Err(e) = self.resync().await {
                        warn!(error = %e, "resynchronization failed");
                    }
                }
                Err(e) => {
                    warn!(
                        source = self.source.name(),
                        error = %e,
                        retry_ms = self.retry_delay.as_millis() as u64,
                        "graph update failed, retrying"
                    );
                    if !self.pause(self.retry_delay, &mut stop).await {
                        break;
                    }
                    continue;
                }
            }
            if !self.pause(self.interval, &mut stop).await {
                break;
            }
        }
        info!("graph update loop ended");
    }
}
