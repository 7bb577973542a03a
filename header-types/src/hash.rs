use serde::de::{self, Visitor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte hash in wire/internal byte order (little-endian, the order
/// headers are serialized and SHA-256 digests come out in). The
/// human-facing "display" form used by RPC and logs is the
/// byte-reversed hex encoding; see [`H256::display_hex`].
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct H256(pub [u8; 32]);

impl H256 {
    pub const ZERO: H256 = H256([0u8; 32]);

    /// Byte-reversed lowercase hex, the conventional display form of a
    /// block hash (and of `prev_block_hash`/`merkle_root` when a peer
    /// hands them to us as RPC fields).
    #[must_use]
    pub fn display_hex(&self) -> String {
        let mut reversed = self.0;
        reversed.reverse();
        hex::encode(reversed)
    }

    /// Parses a display-hex hash back into wire/internal byte order.
    pub fn from_display_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        bytes.reverse();
        Ok(H256(bytes))
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_hex())
    }
}

impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HexVisitor;

        impl<'de> Visitor<'de> for HexVisitor {
            type Value = H256;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a display-order hex hash")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                H256::from_display_hex(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

impl Serialize for H256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.display_hex())
    }
}

/// `reverse_bytes(SHA256(SHA256(input)))`'s non-reversed half: the raw
/// double-SHA-256 digest, in the wire byte order headers use. Callers
/// that want the display form call `.display_hex()` on the result.
#[must_use]
pub fn double_sha256(input: &[u8]) -> H256 {
    H256(Sha256::digest(Sha256::digest(input)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_hex_reverses_wire_bytes() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let h = H256(bytes);
        let hex = h.display_hex();
        assert!(hex.starts_with("01"));
        assert!(hex.ends_with("ab"));
    }

    #[test]
    fn display_roundtrip() {
        let bytes: [u8; 32] = core::array::from_fn(|i| i as u8);
        let h = H256(bytes);
        let back = H256::from_display_hex(&h.display_hex()).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn double_sha256_is_deterministic_and_distinguishes_input() {
        let a = double_sha256(b"rubycoin-a");
        let b = double_sha256(b"rubycoin-a");
        let c = double_sha256(b"rubycoin-b");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
