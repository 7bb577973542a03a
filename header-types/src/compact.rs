//! Compact ("bits") ↔ 256-bit target conversion.
//!
//! The decode keeps the reference chain's `a < 0x8000 → a *= 256`
//! normalization branch without touching the exponent — this looks like
//! a bug relative to the textbook compact-int encoding, but it is
//! load-bearing: RubyCoin's retarget chain was produced by exactly this
//! arithmetic, so "fixing" it would desync from every header after the
//! first epoch that exercises it.

use crate::u256::U256;

/// Decodes a compact `bits` value into its 256-bit target.
#[must_use]
pub fn target_from_bits(bits: u32) -> U256 {
    let exp = i64::from(bits >> 24);
    let mut mant = bits & 0x00FF_FFFF;
    if mant < 0x8000 {
        mant <<= 8;
    }

    let shift = 8 * (exp - 3);
    let base = U256::from(mant);
    if shift >= 0 {
        base << (shift as u32)
    } else {
        base >> ((-shift) as u32)
    }
}

/// Encodes a 256-bit target into its compact `bits` form.
#[must_use]
pub fn bits_from_target(target: U256) -> u32 {
    let bytes = target.to_be_bytes();
    // The reference encoder always drops the top byte before looking
    // for further leading zero bytes (its `("%064X" % target)[2:]`
    // slice); every valid RubyCoin target is well under 2^248, so that
    // top byte is always zero and this is a no-op in practice, but we
    // preserve the unconditional drop to stay bit-exact.
    let mut rest: &[u8] = &bytes[1..];
    let mut size: i64 = 31;
    while !rest.is_empty() && rest[0] == 0 {
        rest = &rest[1..];
        size -= 1;
    }

    let take = rest.len().min(3);
    let mut mant: u32 = 0;
    for &byte in &rest[..take] {
        mant = (mant << 8) | u32::from(byte);
    }

    if mant >= 0x0080_0000 {
        mant /= 256;
        size += 1;
    }

    mant.wrapping_add(0x0100_0000u32.wrapping_mul(size as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::MAX_TARGET_BITS;

    #[test]
    fn max_target_bits_roundtrip() {
        let target = target_from_bits(MAX_TARGET_BITS);
        assert_eq!(bits_from_target(target), MAX_TARGET_BITS);
    }

    #[test]
    fn max_target_matches_known_genesis_difficulty_hex() {
        let target = target_from_bits(MAX_TARGET_BITS);
        let hex = hex::encode(target.to_be_bytes());
        let expected = format!("00000ffff0{}", "00".repeat(27));
        assert_eq!(hex, expected);
        assert_eq!(hex.len(), 64);
    }

    #[test]
    fn small_and_large_bits_roundtrip() {
        for bits in [0x1d00_ffffu32, 0x1c00_8000, 0x1b0f_ffff, 0x1e0f_ffff] {
            let target = target_from_bits(bits);
            assert_eq!(bits_from_target(target), bits);
        }
    }
}
