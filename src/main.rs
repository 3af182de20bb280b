//! FTC Chain Node
//!
//! Loads the checkpoints for the selected network, merges any stored ones,
//! and serves checkpoint and sync status over JSON-RPC until Ctrl-C.

use anyhow::Context;
use clap::Parser;
use ftc_core::checkpoints::{CheckpointRegistry, CheckpointStore};
use ftc_core::config::{Cli, NodeConfig};
use ftc_core::constants::{CHAIN_NAME, COIN_NAME};
use ftc_core::rpc::{start_rpc_server, RpcState};
use ftc_core::storage::{ChainIndex, CheckpointDB, StorageError};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // An unknown network stops the node here, before anything is bound to it.
    let config = NodeConfig::load(&cli)?;

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let params = config.network.params();
    info!(
        chain = CHAIN_NAME,
        coin = COIN_NAME,
        network = %config.network,
        genesis = %params.genesis_hash,
        "node starting up"
    );

    let checkpoints = Arc::new(CheckpointRegistry::with_enabled(config.network, config.checkpoints));
    if !config.checkpoints {
        warn!("checkpoint enforcement disabled by configuration");
    }

    let store = open_and_load(&config, &checkpoints)?;

    info!(
        checkpoints = checkpoints.len(),
        total_blocks_estimate = checkpoints.total_blocks_estimate(),
        "checkpoints ready"
    );

    let chain = Arc::new(RwLock::new(ChainIndex::new(params)));
    let state = Arc::new(RpcState {
        params,
        checkpoints: Arc::clone(&checkpoints),
        chain,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.rpc_port));

    tokio::select! {
        result = start_rpc_server(state, addr) => {
            result.with_context(|| format!("RPC server on {} failed", addr))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, stopping node");
        }
    }

    if let Some(store) = store {
        if let Err(e) = store.flush() {
            warn!("failed to flush checkpoint database: {}", e);
        }
    }

    Ok(())
}

/// Open the checkpoint database and merge its entries into `checkpoints`.
///
/// Storage problems only cost us the stored checkpoints and are logged. A
/// stored entry that contradicts a known checkpoint means the data can't be
/// trusted, so startup stops.
fn open_and_load(
    config: &NodeConfig,
    checkpoints: &CheckpointRegistry,
) -> anyhow::Result<Option<CheckpointDB>> {
    let path = config.checkpoint_db_path();

    let store = match CheckpointDB::open(&path) {
        Ok(store) => store,
        Err(e) => {
            warn!(path = %path.display(), "continuing with compiled-in checkpoints: {}", e);
            return Ok(None);
        }
    };

    match store.load_into(checkpoints) {
        Ok(summary) => {
            info!(read = summary.read, added = summary.added, "loaded stored checkpoints");
        }
        Err(StorageError::Checkpoint(conflict)) => {
            error!(path = %path.display(), "stored checkpoints conflict with known ones");
            return Err(conflict).context("refusing to start with conflicting checkpoints");
        }
        Err(e) => {
            warn!(path = %path.display(), "checkpoint load incomplete, continuing: {}", e);
        }
    }

    Ok(Some(store))
}
