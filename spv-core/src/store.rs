use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use header_types::Header;

use crate::error::{CoreError, CoreResult};

/// Append-indexed flat-file store of 80-byte headers.
///
/// Record at offset `height * 80` is the header at that height; the
/// file's length *is* the chain height (`tip_height = len/80 - 1`).
/// Single-writer: callers are expected to funnel all writes through
/// one ingestion worker. The file handle is held open for the store's
/// lifetime rather than reopened per call, the way the teacher's own
/// long-lived client handles favor.
pub struct HeaderStore {
    path: PathBuf,
    file: Mutex<File>,
    tip_height: AtomicI64,
}

impl HeaderStore {
    /// Opens (creating if absent) the flat file at `path` and primes
    /// the cached tip height from its current length.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let tip_height = tip_from_len(file.metadata()?.len());
        Ok(HeaderStore {
            path,
            file: Mutex::new(file),
            tip_height: AtomicI64::new(tip_height),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest stored height, or `-1` if the store is empty.
    pub fn tip_height(&self) -> i64 {
        self.tip_height.load(Ordering::Acquire)
    }

    /// Reads the header at `height`, or `None` if the store is shorter
    /// than that (including a torn trailing record after a crash).
    pub fn read(&self, height: u64) -> CoreResult<Option<Header>> {
        let offset = height
            .checked_mul(Header::SIZE as u64)
            .ok_or_else(|| CoreError::ChainInvalid("height overflow".to_string()))?;

        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;

        let mut buf = [0u8; Header::SIZE];
        let mut read_total = 0usize;
        loop {
            match file.read(&mut buf[read_total..])? {
                0 => break,
                n => read_total += n,
            }
        }
        if read_total != Header::SIZE {
            return Ok(None);
        }

        let mut header = Header::deserialize(&buf)?;
        header.block_height = height;
        Ok(Some(header))
    }

    /// Overwrites (or appends) a single header at `height`. Writes at
    /// `height <= tip_height()` are the reorg-repair path; writes past
    /// the current tip are the common monotonic-append case.
    pub fn write_header(&self, height: u64, header: &Header) -> CoreResult<()> {
        let offset = height * Header::SIZE as u64;
        let bytes = header.serialize();

        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&bytes)?;
        file.flush()?;
        self.refresh_tip(&file)?;
        Ok(())
    }

    /// Writes a whole 2016-header epoch in one positioned write.
    ///
    /// # Panics
    /// If `bytes.len()` is not a multiple of [`Header::SIZE`].
    pub fn write_chunk(&self, epoch_index: u64, bytes: &[u8]) -> CoreResult<()> {
        assert_eq!(
            bytes.len() % Header::SIZE,
            0,
            "chunk length must be a multiple of {}",
            Header::SIZE
        );
        let offset = epoch_index * 2016 * Header::SIZE as u64;

        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.flush()?;
        self.refresh_tip(&file)?;
        Ok(())
    }

    fn refresh_tip(&self, file: &File) -> CoreResult<()> {
        let len = file.metadata()?.len();
        self.tip_height.store(tip_from_len(len), Ordering::Release);
        Ok(())
    }
}

fn tip_from_len(len: u64) -> i64 {
    (len / Header::SIZE as u64) as i64 - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use header_types::H256;

    fn sample(height: u64, prev: H256) -> Header {
        Header {
            version: 1,
            prev_block_hash: prev,
            merkle_root: H256([0u8; 32]),
            timestamp: 1_600_000_000 + height as u32,
            bits: 0x1e0f_ffff,
            nonce: 0,
            block_height: height,
        }
    }

    #[test]
    fn empty_store_has_no_tip() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::open(dir.path().join("headers")).unwrap();
        assert_eq!(store.tip_height(), -1);
        assert!(store.read(0).unwrap().is_none());
    }

    #[test]
    fn write_then_read_roundtrips_and_advances_tip() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::open(dir.path().join("headers")).unwrap();
        let h0 = sample(0, H256::ZERO);
        store.write_header(0, &h0).unwrap();

        assert_eq!(store.tip_height(), 0);
        let read_back = store.read(0).unwrap().unwrap();
        assert_eq!(read_back.hash(), h0.hash());
        assert_eq!(read_back.block_height, 0);
    }

    #[test]
    fn reorg_overwrite_at_or_below_tip_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::open(dir.path().join("headers")).unwrap();
        let h0 = sample(0, H256::ZERO);
        let h1 = sample(1, h0.hash());
        store.write_header(0, &h0).unwrap();
        store.write_header(1, &h1).unwrap();
        assert_eq!(store.tip_height(), 1);

        let h1_alt = sample(1, h0.hash());
        store.write_header(1, &h1_alt).unwrap();
        assert_eq!(store.tip_height(), 1);
        assert_eq!(store.read(1).unwrap().unwrap().hash(), h1_alt.hash());
    }

    #[test]
    fn write_chunk_places_headers_at_the_right_offset() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeaderStore::open(dir.path().join("headers")).unwrap();
        let headers: Vec<Header> = (0..5).map(|h| sample(h, H256::ZERO)).collect();
        let mut bytes = Vec::new();
        for h in &headers {
            bytes.extend_from_slice(&h.serialize());
        }
        store.write_chunk(0, &bytes).unwrap();

        assert_eq!(store.tip_height(), 4);
        for (i, h) in headers.iter().enumerate() {
            let read_back = store.read(i as u64).unwrap().unwrap();
            assert_eq!(read_back.hash(), h.hash());
        }
    }
}
