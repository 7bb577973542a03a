use header_types::{Header, H256};
use spv_core::Peer;

/// An in-memory stand-in for a network peer, used only to exercise
/// `spv-core`'s ingestion loop end to end without a real P2P stack.
///
/// Holds a complete, internally-consistent RubyCoin-style header chain
/// generated at startup and answers `get_header`/`get_chunk` by slicing
/// into it, the way a real peer's RPC handler would slice into its own
/// on-disk chain.
pub struct MockPeer {
    id: String,
    chain: Vec<Header>,
}

impl MockPeer {
    pub fn new(id: impl Into<String>, chain: Vec<Header>) -> Self {
        MockPeer {
            id: id.into(),
            chain,
        }
    }

    pub fn tip(&self) -> Option<&Header> {
        self.chain.last()
    }
}

#[async_trait::async_trait]
impl Peer for MockPeer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn request_header(&self, height: u64) -> Option<Header> {
        log::debug!(target: "mock_peer", "{}: get_header({height})", self.id);
        self.chain.get(height as usize).cloned()
    }

    async fn request_chunk(&self, epoch_index: u64) -> Option<Vec<u8>> {
        log::debug!(target: "mock_peer", "{}: get_chunk({epoch_index})", self.id);
        let start = (epoch_index * 2016) as usize;
        if start >= self.chain.len() {
            return None;
        }
        let end = (start + 2016).min(self.chain.len());
        let mut bytes = Vec::with_capacity((end - start) * Header::SIZE);
        for header in &self.chain[start..end] {
            bytes.extend_from_slice(&header.serialize());
        }
        Some(bytes)
    }
}

/// Builds a valid max-difficulty chain of `len` headers for the
/// demonstration harness to announce and serve.
pub fn generate_chain(len: u64) -> Vec<Header> {
    use header_types::consensus::{MAX_TARGET_BITS, TARGET_TIMESPAN_SECS};

    let genesis_ts: u32 = 1_600_000_000;
    let mut chain = Vec::with_capacity(len as usize);
    let mut prev = H256::ZERO;
    for height in 0..len {
        // Keep every retarget boundary a no-op by spacing the epoch's
        // first and last header exactly one target timespan apart.
        let ts = if height % 2016 == 2015 {
            genesis_ts + ((height / 2016) as u32 + 1) * (TARGET_TIMESPAN_SECS as u32)
        } else {
            genesis_ts + height as u32
        };
        let mut header = Header {
            version: 1,
            prev_block_hash: prev,
            merkle_root: H256::ZERO,
            timestamp: ts,
            bits: MAX_TARGET_BITS,
            nonce: 0,
            block_height: height,
        };
        mine(&mut header);
        prev = header.hash();
        chain.push(header);
    }
    chain
}

/// Brute-forces a nonce satisfying the header's own target. At
/// `MAX_TARGET_BITS` this takes on the order of a million attempts per
/// header, same as any other proof-of-work search.
fn mine(header: &mut Header) {
    let target = header.target();
    for nonce in 0..u32::MAX {
        header.nonce = nonce;
        if header.numeric_hash() < target {
            return;
        }
    }
    panic!("exhausted the nonce space without finding a valid header");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generated_chain_links_and_serves_headers_and_chunks() {
        let chain = generate_chain(2500);
        let peer = MockPeer::new("mock-1", chain.clone());

        let h10 = peer.request_header(10).await.unwrap();
        assert_eq!(h10.block_height, 10);

        let chunk0 = peer.request_chunk(0).await.unwrap();
        assert_eq!(chunk0.len(), 2016 * Header::SIZE);

        let chunk1 = peer.request_chunk(1).await.unwrap();
        assert_eq!(chunk1.len(), (2500 - 2016) * Header::SIZE);

        assert!(peer.request_header(5000).await.is_none());
        assert!(peer.request_chunk(5).await.is_none());
    }
}
