use serde::{Deserialize, Serialize};

use crate::compact::target_from_bits;
use crate::hash::{double_sha256, H256};
use crate::u256::U256;

/// Raised when an 80-byte header record fails to parse.
#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum MalformedHeader {
    #[error("expected an 80-byte header record, got {0} bytes")]
    WrongLength(usize),
}

/// The canonical 80-byte RubyCoin block header record.
///
/// `block_height` is carried alongside the wire fields for convenience
/// (it is supplied by a peer or inferred from store position) but is
/// never part of the 80-byte serialization.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub prev_block_hash: H256,
    pub merkle_root: H256,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    #[serde(default)]
    pub block_height: u64,
}

impl Header {
    /// Wire length of the serialized record.
    pub const SIZE: usize = 4 + 32 + 32 + 4 + 4 + 4;

    /// Serializes the header fields (not `block_height`) to their
    /// exact 80-byte wire form.
    #[must_use]
    pub fn serialize(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.prev_block_hash.0);
        out[36..68].copy_from_slice(&self.merkle_root.0);
        out[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Parses an 80-byte wire record. `block_height` is set to `0` and
    /// must be filled in by the caller from context (store position or
    /// a peer-supplied value), since it is not part of the wire form.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, MalformedHeader> {
        if bytes.len() != Self::SIZE {
            return Err(MalformedHeader::WrongLength(bytes.len()));
        }

        let mut prev_block_hash = [0u8; 32];
        prev_block_hash.copy_from_slice(&bytes[4..36]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&bytes[36..68]);

        Ok(Header {
            version: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            prev_block_hash: H256(prev_block_hash),
            merkle_root: H256(merkle_root),
            timestamp: u32::from_le_bytes(bytes[68..72].try_into().unwrap()),
            bits: u32::from_le_bytes(bytes[72..76].try_into().unwrap()),
            nonce: u32::from_le_bytes(bytes[76..80].try_into().unwrap()),
            block_height: 0,
        })
    }

    /// Raw (wire-order) double-SHA-256 of the serialized header.
    #[must_use]
    pub fn hash(&self) -> H256 {
        double_sha256(&self.serialize())
    }

    /// 64-hex-digit display form of [`Header::hash`].
    #[must_use]
    pub fn hash_hex(&self) -> String {
        self.hash().display_hex()
    }

    /// The 256-bit value a valid hash of this header must be below.
    #[must_use]
    pub fn target(&self) -> U256 {
        target_from_bits(self.bits)
    }

    /// The big-integer value of this header's hash, for comparison
    /// against a target. Equivalent to parsing the display-hex hash as
    /// a big-endian integer; computed directly from the raw digest's
    /// little-endian interpretation instead of round-tripping through
    /// hex.
    #[must_use]
    pub fn numeric_hash(&self) -> U256 {
        U256::from_le_bytes(&self.hash().0)
    }

    /// `true` if this header's proof of work satisfies its own `bits`.
    #[must_use]
    pub fn meets_target(&self) -> bool {
        self.numeric_hash() < self.target()
    }
}
