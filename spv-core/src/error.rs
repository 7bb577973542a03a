/// Error taxonomy for the header-chain engine.
///
/// Every verification-path variant is recovered locally by the
/// ingestion loop; only [`CoreError::StoreIo`] is allowed to escape and
/// bring the worker down.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("malformed header: {0}")]
    MalformedHeader(#[from] header_types::MalformedHeader),

    #[error("chunk {epoch} invalid: {reason}")]
    ChunkInvalid { epoch: u64, reason: String },

    #[error("chain invalid: {0}")]
    ChainInvalid(String),

    #[error("peer request timed out")]
    RequestTimeout,

    #[error("store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    #[error("bootstrap snapshot download failed: {0}")]
    BootstrapFailed(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
