use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use log::info;
use tokio::sync::mpsc;

use spv_core::bootstrap::bootstrap_from_snapshot;
use spv_core::ingest::{Announcement, IngestLoop, TipObserver};

mod config;
mod mock_peer;

use config::Config;
use mock_peer::{generate_chain, MockPeer};

struct LoggingObserver;

impl TipObserver for LoggingObserver {
    fn new_blockchain_height(&self, height: u64, peer_id: &str) {
        info!(target: "spv-node", "new tip: height {height} (from {peer_id})");
    }
}

#[derive(Parser)]
struct CliArgs {
    /// Path to the configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = CliArgs::parse();
    let config = Config::load(&args.config)?;
    info!(target: "spv-node", "configuration loaded: {config:?}");

    let store = match &config.snapshot_url {
        Some(url) => bootstrap_from_snapshot(&config.store_path, url).await,
        None => spv_core::HeaderStore::open(&config.store_path)?,
    };
    info!(target: "spv-node", "store opened at {:?}, tip = {}", store.path(), store.tip_height());

    let (tx, rx) = mpsc::channel(config.announcement_queue_capacity);
    let observer = Arc::new(LoggingObserver);
    let running = Arc::new(AtomicBool::new(true));
    let mut ingest_loop = IngestLoop::new(store, rx, observer, running.clone());

    let chain = generate_chain(config.mock_chain_length);
    let peer = Arc::new(MockPeer::new("mock-peer-0", chain.clone()));
    if let Some(tip) = peer.tip() {
        tx.send(Announcement {
            peer: peer.clone(),
            header: tip.clone(),
        })
        .await?;
    }
    drop(tx);

    ingest_loop.run().await;
    info!(target: "spv-node", "final tip height: {}", ingest_loop.store().tip_height());

    running.store(false, std::sync::atomic::Ordering::Release);
    Ok(())
}
