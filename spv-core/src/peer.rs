use header_types::Header;

/// The capability a peer-pool member must offer the engine: a
/// single-header fetch and a bulk-chunk fetch, both addressed by the
/// untyped `get_header`/`get_chunk` RPC pair the reference Electrum
/// protocol exposes as `blockchain.block.get_header` /
/// `blockchain.block.get_chunk`.
///
/// Implementations own their own request/response plumbing (per-request
/// channels, retries, wire encoding); the engine only needs the two
/// async calls below plus an `id()` for diagnostics and dismissal
/// decisions. Expressed as a capability trait rather than a
/// connection-object hierarchy so the engine stays agnostic to
/// transport.
#[async_trait::async_trait]
pub trait Peer: Send + Sync {
    /// Opaque identifier used in logs (e.g. the peer's address).
    fn id(&self) -> &str;

    /// Requests the single header at `height`. Implementations should
    /// resolve (or hang until the caller's timeout fires) rather than
    /// returning a local error for "no reply yet".
    async fn request_header(&self, height: u64) -> Option<Header>;

    /// Requests the raw 80-byte-record bytes of epoch `epoch_index`
    /// (nominally 2016 headers / 161 280 bytes, but the last chunk of a
    /// chain may be shorter).
    async fn request_chunk(&self, epoch_index: u64) -> Option<Vec<u8>>;
}
