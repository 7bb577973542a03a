use header_types::Header;

use crate::error::{CoreError, CoreResult};
use crate::retarget::target_for;
use crate::store::HeaderStore;

/// Validates a small in-flight chain (oldest first) produced by the
/// catch-up resolver, without persisting anything.
///
/// Each header must link to its predecessor (the previous element, or
/// the stored header at `chain[0].block_height - 1` for the first
/// element), meet the target for its own epoch, and carry the bits
/// that epoch's retarget actually produces. Callers persist the chain
/// themselves once this returns `Ok`.
pub fn verify_chain(store: &HeaderStore, chain: &[Header]) -> CoreResult<()> {
    if chain.is_empty() {
        return Ok(());
    }

    let first = &chain[0];
    let mut prev_hash = match first.block_height.checked_sub(1) {
        Some(prev_height) => {
            let prev = store.read(prev_height)?.ok_or_else(|| {
                CoreError::ChainInvalid(format!(
                    "predecessor header at height {prev_height} not found in store"
                ))
            })?;
            Some(prev.hash())
        }
        None => None,
    };

    for header in chain {
        if let Some(expected_prev) = prev_hash {
            if header.prev_block_hash != expected_prev {
                return Err(CoreError::ChainInvalid(format!(
                    "header at height {} does not link to its predecessor",
                    header.block_height
                )));
            }
        }

        let epoch_index = header.block_height / 2016;
        let (expected_bits, _expected_target) = target_for(epoch_index, store, chain)?;
        if header.bits != expected_bits {
            return Err(CoreError::ChainInvalid(format!(
                "header at height {} carries bits {:#010x}, expected {:#010x}",
                header.block_height, header.bits, expected_bits
            )));
        }
        if !header.meets_target() {
            return Err(CoreError::ChainInvalid(format!(
                "header at height {} does not meet its target",
                header.block_height
            )));
        }

        prev_hash = Some(header.hash());
    }

    Ok(())
}
