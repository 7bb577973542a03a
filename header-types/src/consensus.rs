//! RubyCoin consensus parameters, bit-exact with the reference chain.

/// Headers per retarget epoch.
pub const BLOCKS_PER_ADJUSTMENT: u64 = 2016;

/// Retarget window, in seconds. RubyCoin-specific: 3.5 days, not
/// Bitcoin's 14. Do not "correct" this back to Bitcoin's value.
pub const TARGET_TIMESPAN_SECS: i64 = 84 * 3600;

/// Compact-bits encoding of the genesis/epoch-0 difficulty floor.
pub const MAX_TARGET_BITS: u32 = 0x1e0f_fff0;
