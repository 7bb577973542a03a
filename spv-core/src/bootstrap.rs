use std::path::Path;
use std::time::Duration;

use crate::store::HeaderStore;

/// Budget for the whole snapshot download, not per-chunk.
const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(30);

/// Seeds a fresh store from a pre-built header snapshot before the
/// ingestion loop starts pulling from peers.
///
/// A snapshot is a flat concatenation of 80-byte records starting at
/// height 0, identical in shape to what [`HeaderStore::write_chunk`]
/// accepts. Failure to fetch or parse one is not fatal: the loop can
/// always rebuild history from peers alone, just slower, so this opens
/// (creating if absent) an empty store on any error rather than
/// propagating it.
pub async fn bootstrap_from_snapshot(store_path: impl AsRef<Path>, snapshot_url: &str) -> HeaderStore {
    match try_fetch_snapshot(snapshot_url).await {
        Ok(bytes) => match HeaderStore::open(&store_path) {
            Ok(store) if store.tip_height() < 0 => {
                if let Err(err) = write_snapshot(&store, &bytes) {
                    log::warn!(target: "bootstrap", "snapshot at {snapshot_url} rejected: {err}");
                }
                store
            }
            Ok(store) => {
                log::debug!(target: "bootstrap", "store already has headers, ignoring snapshot");
                store
            }
            Err(err) => {
                log::warn!(target: "bootstrap", "could not open header store: {err}");
                empty_store(&store_path)
            }
        },
        Err(err) => {
            log::info!(target: "bootstrap", "snapshot fetch from {snapshot_url} failed, starting from genesis: {err}");
            empty_store(&store_path)
        }
    }
}

fn write_snapshot(store: &HeaderStore, bytes: &[u8]) -> Result<(), String> {
    use header_types::Header;
    if bytes.len() % Header::SIZE != 0 {
        return Err(format!(
            "snapshot length {} is not a multiple of {}",
            bytes.len(),
            Header::SIZE
        ));
    }
    store
        .write_chunk(0, bytes)
        .map_err(|err| err.to_string())
}

async fn try_fetch_snapshot(url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(BOOTSTRAP_TIMEOUT)
        .build()?;
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}

fn empty_store(path: impl AsRef<Path>) -> HeaderStore {
    HeaderStore::open(path).expect("creating an empty header store file must not fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_url_falls_back_to_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("headers");
        let store = bootstrap_from_snapshot(&store_path, "http://127.0.0.1:1/snapshot").await;
        assert_eq!(store.tip_height(), -1);
    }
}
