use header_types::consensus::{MAX_TARGET_BITS, TARGET_TIMESPAN_SECS};
use header_types::{bits_from_target, target_from_bits, Header, U256};

use crate::error::{CoreError, CoreResult};
use crate::store::HeaderStore;

/// Computes the expected `(bits, target)` for `epoch_index`.
///
/// Looks up the epoch boundary headers from `store` first, falling
/// back to `in_flight` (headers not yet persisted, e.g. the tail of a
/// chunk or catch-up chain currently being verified) — this lets the
/// chunk verifier and chain verifier share one retarget path instead of
/// each special-casing "not on disk yet".
///
/// Preserves the reference chain's asymmetric retarget window: the
/// timespan is measured across the *entire previous* epoch
/// (`first_of_prev_epoch` to `last_of_prev_epoch`), not Bitcoin's usual
/// `first_of_current` to `last_of_previous`. This is RubyCoin-specific
/// and must not be "corrected" to match upstream Bitcoin.
pub fn target_for(
    epoch_index: u64,
    store: &HeaderStore,
    in_flight: &[Header],
) -> CoreResult<(u32, U256)> {
    if epoch_index == 0 {
        return Ok((MAX_TARGET_BITS, target_from_bits(MAX_TARGET_BITS)));
    }

    let first_height = if epoch_index == 1 {
        0
    } else {
        (epoch_index - 1) * 2016 - 1
    };
    let last_height = epoch_index * 2016 - 1;

    let first = resolve_header(first_height, store, in_flight)?;
    let last = resolve_header(last_height, store, in_flight)?;

    let mut actual = i64::from(last.timestamp) - i64::from(first.timestamp);
    actual = actual.max(TARGET_TIMESPAN_SECS / 4);
    actual = actual.min(TARGET_TIMESPAN_SECS * 4);

    let target_prev = target_from_bits(last.bits);
    #[allow(clippy::cast_sign_loss)]
    let new_target = target_prev
        .mul_div_small(actual as u64, TARGET_TIMESPAN_SECS as u64)
        .min(target_from_bits(MAX_TARGET_BITS));

    Ok((bits_from_target(new_target), new_target))
}

fn resolve_header(height: u64, store: &HeaderStore, in_flight: &[Header]) -> CoreResult<Header> {
    if let Some(header) = store.read(height)? {
        return Ok(header);
    }
    in_flight
        .iter()
        .find(|h| h.block_height == height)
        .cloned()
        .ok_or_else(|| {
            CoreError::ChainInvalid(format!(
                "retarget: header at height {height} not found in store or in-flight chain"
            ))
        })
}
