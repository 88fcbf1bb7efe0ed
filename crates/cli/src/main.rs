mod cli;
mod config;
mod rules;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use gpm_core::load_dotenv;
use gpm_notify::{ActionRegistry, MatchEngine};
use gpm_sync::{HttpGraphSource, Poller};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = config::resolve(&args);
    config.log_summary();

    // Rules and their actions
    let registry = ActionRegistry::from_config(&config.actions).context("failed to configure actions")?;
    info!(actions = ?registry.names(), "actions available");
    let mut engine = MatchEngine::new(registry);

    let (mut source, loaded) = rules::open_source(&config.rules, args.builtin_rules)?;
    for rule in loaded {
        engine.register(rule);
    }

    let (change_tx, change_rx) = mpsc::unbounded_channel();
    if config.rules.watch {
        let watching = source
            .watch(change_tx)
            .with_context(|| format!("failed to watch rule source {}", source.name()))?;
        if !watching {
            warn!(source = source.name(), "rule source cannot be watched, hot reload disabled");
        }
    } else {
        drop(change_tx);
    }

    // Graph synchronization
    let graph_source = HttpGraphSource::from_config(&config.sync).context("failed to build data service client")?;
    let (batch_tx, batch_rx) = mpsc::unbounded_channel();
    let poller = Poller::from_config(Arc::new(graph_source), &config.sync, batch_tx);
    let (stop_tx, stop_rx) = watch::channel(false);

    let poller_handle = tokio::spawn(poller.run(stop_rx));
    let engine_handle = tokio::spawn(engine.run(batch_rx, change_rx));

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("shutdown requested, finishing current update");

    let _ = stop_tx.send(true);
    poller_handle.await.context("graph update task failed")?;
    // The poller dropped its batch sender, so the engine drains and returns.
    engine_handle.await.context("match engine task failed")?;

    drop(source);
    info!("stopped");
    Ok(())
}
