//! # Tessera Gossip Devnet
//!
//! Starts one gossip node per genesis validator in this process, links
//! them in a full mesh and runs them until Ctrl+C.
//!
//! ## Environment
//!
//! - `TS_CONFIG` - JSON `GossipConfig` file (also accepted as first argument)
//! - `TS_VALIDATORS` - number of genesis validators, default 4
//! - `TS_LOG_*` / `TS_METRICS_*` - telemetry settings

use anyhow::{Context, Result};
use node_runtime::{GenesisConfig, GossipConfig, GossipNode, NodeDeps};
use shared_types::{NodeId, SnapshotCell, SystemTimeSource, TimeSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tessera_telemetry::{init_telemetry, MetricsHandle, TelemetryConfig};
use tokio::sync::watch;
use tracing::{error, info, warn};
use ts_03_emitter::LocalKeySigner;

fn load_config() -> Result<GossipConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TS_CONFIG").ok())
        .map(PathBuf::from);
    let config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading gossip configuration");
            GossipConfig::load(&path)?
        }
        None => GossipConfig::default(),
    };
    config.validate().context("Refusing to start")?;
    Ok(config)
}

fn validators() -> u32 {
    match std::env::var("TS_VALIDATORS") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(value = %raw, "TS_VALIDATORS is not a number, using 4");
            4
        }),
        Err(_) => 4,
    }
}

async fn export_loop(
    nodes: Vec<Arc<GossipNode>>,
    metrics: MetricsHandle,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let scoped: Vec<_> = nodes
        .iter()
        .map(|node| metrics.scoped(node.id().to_string()))
        .collect();
    let mut tick = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                for (node, handle) in nodes.iter().zip(&scoped) {
                    node.export_metrics(handle);
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = init_telemetry(TelemetryConfig::from_env())?;
    let config = load_config()?;

    let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
    let genesis = GenesisConfig::with_validators(validators())
        .build(time.now())
        .context("Failed to build genesis")?;
    let epochs = Arc::new(SnapshotCell::new(genesis.snapshot.clone()));

    let mut nodes = Vec::with_capacity(genesis.secrets.len());
    for (validator, secret) in &genesis.secrets {
        let mut node_config = config.clone();
        node_config.emitter.validator = *validator;
        let id = NodeId(LocalKeySigner::from_secret(secret).public_key());
        let node = GossipNode::new(
            node_config,
            NodeDeps {
                id,
                epochs: epochs.clone(),
                time: time.clone(),
                secret: Some(*secret),
            },
        )
        .with_context(|| format!("Failed to build node of validator {validator}"))?;
        nodes.push(node);
    }
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            GossipNode::connect(a, b);
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut running = Vec::with_capacity(nodes.len());
    for node in &nodes {
        running.push(node.run(shutdown_rx.clone())?);
    }
    let exporter = tokio::spawn(export_loop(
        nodes.clone(),
        telemetry.metrics().clone(),
        Duration::from_secs(telemetry.config().metrics_interval_secs.max(1)),
        shutdown_rx,
    ));

    info!(
        nodes = nodes.len(),
        epoch = %genesis.snapshot.epoch,
        "Devnet running. Press Ctrl+C to stop."
    );
    tokio::signal::ctrl_c().await?;

    info!("Initiating graceful shutdown...");
    if let Err(e) = shutdown_tx.send(true) {
        error!(error = %e, "Failed to send shutdown signal");
    }
    for mut set in running {
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Node task failed");
            }
        }
    }
    if let Err(e) = exporter.await {
        error!(error = %e, "Metrics export task failed");
    }
    for node in &nodes {
        node.export_metrics(&telemetry.metrics().scoped(node.id().to_string()));
    }

    info!("Shutdown complete");
    Ok(())
}
