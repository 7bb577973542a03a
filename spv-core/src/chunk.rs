use header_types::Header;

use crate::error::{CoreError, CoreResult};
use crate::retarget::target_for;
use crate::store::HeaderStore;

/// Validates and persists one 2016-header epoch fetched in bulk.
///
/// `raw` is the flat 80-byte-record concatenation for the epoch
/// (nominally `2016 * 80` bytes; the final epoch of a chain may be
/// shorter). Every header is checked against the epoch's single
/// expected `(bits, target)` pair, its own proof of work, and its link
/// to the previous header before anything is written; a failure midway
/// through the epoch discards the whole batch rather than persisting a
/// partially-verified prefix.
pub fn verify_and_store_chunk(
    store: &HeaderStore,
    epoch_index: u64,
    raw: &[u8],
) -> CoreResult<()> {
    if raw.len() % Header::SIZE != 0 {
        return Err(CoreError::ChunkInvalid {
            epoch: epoch_index,
            reason: format!("length {} is not a multiple of {}", raw.len(), Header::SIZE),
        });
    }
    let count = raw.len() / Header::SIZE;
    if count == 0 {
        return Err(CoreError::ChunkInvalid {
            epoch: epoch_index,
            reason: "empty chunk".to_string(),
        });
    }

    let base_height = epoch_index * 2016;
    let mut headers = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * Header::SIZE;
        let mut header = Header::deserialize(&raw[start..start + Header::SIZE])
            .map_err(CoreError::MalformedHeader)?;
        header.block_height = base_height + i as u64;
        headers.push(header);
    }

    let (expected_bits, _expected_target) = target_for(epoch_index, store, &headers)?;

    let mut prev_hash = if base_height == 0 {
        None
    } else {
        let prev = store.read(base_height - 1)?.ok_or_else(|| CoreError::ChunkInvalid {
            epoch: epoch_index,
            reason: format!("predecessor header at height {} missing", base_height - 1),
        })?;
        Some(prev.hash())
    };

    for header in &headers {
        if header.bits != expected_bits {
            return Err(CoreError::ChunkInvalid {
                epoch: epoch_index,
                reason: format!(
                    "header at height {} carries bits {:#010x}, expected {:#010x}",
                    header.block_height, header.bits, expected_bits
                ),
            });
        }
        if !header.meets_target() {
            return Err(CoreError::ChunkInvalid {
                epoch: epoch_index,
                reason: format!(
                    "header at height {} does not meet its target",
                    header.block_height
                ),
            });
        }
        if let Some(expected_prev) = prev_hash {
            if header.prev_block_hash != expected_prev {
                return Err(CoreError::ChunkInvalid {
                    epoch: epoch_index,
                    reason: format!(
                        "header at height {} does not link to its predecessor",
                        header.block_height
                    ),
                });
            }
        }
        prev_hash = Some(header.hash());
    }

    store.write_chunk(epoch_index, raw)?;
    log::info!(
        target: "chunk",
        "stored epoch {epoch_index} ({count} headers, bits {expected_bits:#010x})"
    );
    Ok(())
}
