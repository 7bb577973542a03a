use std::time::Duration;

use header_types::Header;

use crate::error::{CoreError, CoreResult};
use crate::peer::Peer;
use crate::store::HeaderStore;

/// Per-request budget for a single header fetch during catch-up.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Walks backward from a peer-announced candidate tip, one header at a
/// time, until the chain reconnects to the local store.
///
/// Returns the ordered ancestor-to-tip chain (oldest first) once the
/// predecessor of its first element is confirmed present and
/// hash-linked in `store`. There is no explicit maximum depth; callers
/// bound it in practice via the bulk-mode threshold below which
/// catch-up is attempted at all, rather than falling back to a chunk
/// request.
pub async fn resolve_catchup(
    store: &HeaderStore,
    peer: &dyn Peer,
    candidate_tip: Header,
) -> CoreResult<Vec<Header>> {
    let mut cursor = candidate_tip.clone();
    let mut chain = vec![candidate_tip];

    loop {
        let Some(prev_height) = cursor.block_height.checked_sub(1) else {
            // Height 0 has no predecessor to reconcile against.
            return Ok(chain);
        };

        match store.read(prev_height)? {
            Some(prev) if prev.hash() == cursor.prev_block_hash => {
                return Ok(chain);
            }
            Some(_) => {
                // Local copy disagrees with the peer's chain: reorg.
                // Request the peer's version of this height instead.
                log::debug!(target: "resolver", "reorg detected at height {prev_height}");
                cursor = fetch_header(peer, prev_height).await?;
                chain.insert(0, cursor.clone());
            }
            None => {
                cursor = fetch_header(peer, prev_height).await?;
                chain.insert(0, cursor.clone());
            }
        }
    }
}

async fn fetch_header(peer: &dyn Peer, height: u64) -> CoreResult<Header> {
    let reply = tokio::time::timeout(REQUEST_TIMEOUT, peer.request_header(height))
        .await
        .map_err(|_| CoreError::RequestTimeout)?;
    reply.ok_or(CoreError::RequestTimeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use header_types::H256;
    use std::sync::Mutex;

    fn header(height: u64, prev: H256) -> Header {
        Header {
            version: 1,
            prev_block_hash: prev,
            merkle_root: H256::ZERO,
            timestamp: 1_600_000_000 + height as u32,
            bits: 0x1e0f_ffff,
            nonce: 0,
            block_height: height,
        }
    }

    struct ScriptedPeer {
        headers_by_height: Mutex<std::collections::HashMap<u64, Header>>,
    }

    #[async_trait::async_trait]
    impl Peer for ScriptedPeer {
        fn id(&self) -> &str {
            "scripted"
        }
        async fn request_header(&self, height: u64) -> Option<Header> {
            self.headers_by_height.lock().unwrap().get(&height).cloned()
        }
        async fn request_chunk(&self, _epoch_index: u64) -> Option<Vec<u8>> {
            None
        }
    }

    #[tokio::test]
    async fn connects_immediately_when_predecessor_already_in_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::open(dir.path().join("headers")).unwrap();
        let h0 = header(0, H256::ZERO);
        store.write_header(0, &h0).unwrap();

        let h1 = header(1, h0.hash());
        let peer = ScriptedPeer {
            headers_by_height: Mutex::new(std::collections::HashMap::new()),
        };

        let chain = resolve_catchup(&store, &peer, h1.clone()).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].hash(), h1.hash());
    }

    #[tokio::test]
    async fn walks_back_through_missing_headers() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::open(dir.path().join("headers")).unwrap();
        let h0 = header(0, H256::ZERO);
        store.write_header(0, &h0).unwrap();

        let h1 = header(1, h0.hash());
        let h2 = header(2, h1.hash());
        let mut map = std::collections::HashMap::new();
        map.insert(1, h1.clone());
        let peer = ScriptedPeer {
            headers_by_height: Mutex::new(map),
        };

        let chain = resolve_catchup(&store, &peer, h2.clone()).await.unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].hash(), h1.hash());
        assert_eq!(chain[1].hash(), h2.hash());
    }

    #[tokio::test]
    async fn reorg_requests_peers_version_of_disagreeing_height() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::open(dir.path().join("headers")).unwrap();
        let h0 = header(0, H256::ZERO);
        let stale_h1 = header(1, h0.hash());
        store.write_header(0, &h0).unwrap();
        store.write_header(1, &stale_h1).unwrap();

        // Peer's chain disagrees at height 1.
        let mut fork_h1 = header(1, h0.hash());
        fork_h1.nonce = 999;
        let fork_h2 = header(2, fork_h1.hash());
        let mut map = std::collections::HashMap::new();
        map.insert(1, fork_h1.clone());
        let peer = ScriptedPeer {
            headers_by_height: Mutex::new(map),
        };

        let chain = resolve_catchup(&store, &peer, fork_h2.clone()).await.unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].hash(), fork_h1.hash());
        assert_eq!(chain[1].hash(), fork_h2.hash());
    }

    #[tokio::test]
    async fn timeout_when_peer_never_answers() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::open(dir.path().join("headers")).unwrap();
        let h0 = header(0, H256::ZERO);
        store.write_header(0, &h0).unwrap();
        let h1 = header(1, h0.hash());
        let h2 = header(2, h1.hash());

        let peer = ScriptedPeer {
            headers_by_height: Mutex::new(std::collections::HashMap::new()),
        };

        tokio::time::pause();
        let fut = resolve_catchup(&store, &peer, h2.clone());
        tokio::pin!(fut);
        tokio::time::advance(Duration::from_secs(11)).await;
        let result = fut.await;
        assert!(matches!(result, Err(CoreError::RequestTimeout)));
    }
}
