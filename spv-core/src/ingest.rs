use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use header_types::Header;
use tokio::sync::mpsc;

use crate::chain::verify_chain;
use crate::chunk::verify_and_store_chunk;
use crate::peer::Peer;
use crate::resolver::resolve_catchup;
use crate::store::HeaderStore;

/// Announcements straddling this many headers past the tip are served
/// by bulk chunk fetches instead of the one-header-at-a-time resolver.
const CATCHUP_THRESHOLD: u64 = 50;

/// Notifies the enclosing network layer that the store's tip moved.
pub trait TipObserver: Send + Sync {
    fn new_blockchain_height(&self, height: u64, peer_id: &str);
}

/// An incoming candidate-tip announcement from a connected peer.
pub struct Announcement {
    pub peer: Arc<dyn Peer>,
    pub header: Header,
}

/// Drives the IDLE → CLASSIFY → {BULK, CATCHUP} → PERSIST state machine
/// over a stream of peer announcements.
pub struct IngestLoop {
    store: HeaderStore,
    queue: mpsc::Receiver<Announcement>,
    observer: Arc<dyn TipObserver>,
    running: Arc<AtomicBool>,
}

impl IngestLoop {
    pub fn new(
        store: HeaderStore,
        queue: mpsc::Receiver<Announcement>,
        observer: Arc<dyn TipObserver>,
        running: Arc<AtomicBool>,
    ) -> Self {
        IngestLoop {
            store,
            queue,
            observer,
            running,
        }
    }

    pub fn store(&self) -> &HeaderStore {
        &self.store
    }

    /// Consumes announcements until the queue closes or `running` is
    /// cleared. A failure processing one announcement never aborts the
    /// loop; it is logged and the worker moves on.
    pub async fn run(&mut self) {
        while self.running.load(Ordering::Acquire) {
            let announcement = match self.queue.recv().await {
                Some(a) => a,
                None => break,
            };
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            self.process(announcement).await;
        }
    }

    async fn process(&self, announcement: Announcement) {
        let Announcement { peer, header } = announcement;
        let target_height = header.block_height;
        let target_i64 = target_height as i64;

        if target_i64 <= self.store.tip_height() {
            return;
        }

        if target_i64 > self.store.tip_height() + CATCHUP_THRESHOLD as i64 {
            if let Err(err) = self.run_bulk(peer.as_ref(), target_height).await {
                log::warn!(target: "ingest", "bulk ingest from {} failed: {err}", peer.id());
                return;
            }
        }

        if target_i64 > self.store.tip_height() {
            match self.run_catchup(peer.as_ref(), header).await {
                Ok(new_tip) => {
                    self.observer.new_blockchain_height(new_tip, peer.id());
                }
                Err(err) => {
                    log::warn!(target: "ingest", "catch-up from {} failed: {err}", peer.id());
                }
            }
        } else {
            self.observer
                .new_blockchain_height(self.store.tip_height().max(0) as u64, peer.id());
        }
    }

    /// Fetches and verifies consecutive 2016-header epochs from the
    /// current tip's epoch up to and including the announced tip's
    /// epoch. A chunk that fails verification is retried once at
    /// `n - 1`, to absorb a peer's claimed tip straddling an epoch
    /// boundary; each epoch number gets at most one such retry, tracked
    /// in `retried`, so a peer that deterministically fails the same
    /// epoch (while happily serving `n - 1`) can't resurrect `n` and
    /// loop forever — the second failure at `n` aborts the peer for
    /// this announcement instead of retrying again.
    async fn run_bulk(&self, peer: &dyn Peer, target_height: u64) -> Result<(), String> {
        let start_epoch = (self.store.tip_height() + 1).max(0) as u64 / 2016;
        let end_epoch = (target_height + 1) / 2016;

        let mut retried: std::collections::HashSet<u64> = std::collections::HashSet::new();
        let mut epoch = start_epoch;
        while epoch <= end_epoch {
            match self.fetch_and_verify_chunk(peer, epoch).await {
                Ok(()) => {
                    epoch += 1;
                }
                Err(err) => {
                    if !retried.insert(epoch) {
                        return Err(format!(
                            "epoch {epoch} failed again after its one retry: {err}"
                        ));
                    }
                    log::debug!(target: "ingest", "epoch {epoch} failed ({err}), retrying at {epoch}-1");
                    let Some(retry_epoch) = epoch.checked_sub(1) else {
                        return Err(format!("epoch {epoch} failed and cannot retry below zero: {err}"));
                    };
                    self.fetch_and_verify_chunk(peer, retry_epoch)
                        .await
                        .map_err(|retry_err| {
                            format!("epoch {epoch} failed ({err}), retry at {retry_epoch} also failed: {retry_err}")
                        })?;
                    epoch = retry_epoch + 1;
                }
            }
        }
        Ok(())
    }

    async fn fetch_and_verify_chunk(&self, peer: &dyn Peer, epoch: u64) -> Result<(), String> {
        let bytes = tokio::time::timeout(
            crate::resolver::REQUEST_TIMEOUT,
            peer.request_chunk(epoch),
        )
        .await
        .map_err(|_| "timed out".to_string())?
        .ok_or_else(|| "peer had no reply".to_string())?;

        verify_and_store_chunk(&self.store, epoch, &bytes).map_err(|err| err.to_string())
    }

    /// Resolves and verifies the remaining gap one header at a time,
    /// then persists the result in order. Returns the new tip height.
    async fn run_catchup(&self, peer: &dyn Peer, candidate_tip: Header) -> Result<u64, String> {
        let chain = resolve_catchup(&self.store, peer, candidate_tip)
            .await
            .map_err(|err| err.to_string())?;

        verify_chain(&self.store, &chain).map_err(|err| err.to_string())?;

        for header in &chain {
            self.store
                .write_header(header.block_height, header)
                .map_err(|err| err.to_string())?;
        }

        Ok(self.store.tip_height().max(0) as u64)
    }
}
