use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

/// Configuration for the demonstration harness: where the local header
/// file lives, where to fetch a bootstrap snapshot from, and how the
/// mock peer should behave. Loaded from `config.toml` next to the
/// executable, with `SPV_NODE_*` environment variables overriding any
/// field, the same override layering `relayer/src/config.rs` applies.
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub store_path: String,
    #[serde(default)]
    pub snapshot_url: Option<String>,
    #[serde(default = "default_queue_capacity")]
    pub announcement_queue_capacity: usize,
    #[serde(default = "default_mock_chain_length")]
    pub mock_chain_length: u64,
}

fn default_queue_capacity() -> usize {
    32
}

fn default_mock_chain_length() -> u64 {
    2_200
}

impl Config {
    /// Parses `path`, falling back to built-in defaults for any field
    /// the file omits, then lets `SPV_NODE_*` env vars win over both.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SPV_NODE_"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"store_path = "headers.dat""#).unwrap();
        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.store_path, "headers.dat");
        assert_eq!(config.announcement_queue_capacity, 32);
        assert_eq!(config.mock_chain_length, 2_200);
        assert!(config.snapshot_url.is_none());
    }
}
