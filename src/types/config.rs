use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Pipeline configuration, loaded from `config/config.json` when present.
///
/// Every knob has a default, so a missing config file is not an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Env var holding the websocket URL of an archive node.
    pub network_url_env_var: String,
    /// Fallback URL when the env var is unset.
    pub default_network_url: String,
    /// Capacity of the hotkey → coldkey ownership cache.
    pub ownership_cache_capacity: usize,
    /// Capacity of the per-block result cache.
    pub block_cache_capacity: usize,
    /// Capacity of the raw-identifier → SS58 address memo cache.
    pub address_cache_capacity: usize,
    /// Max in-flight ownership lookups across all blocks.
    pub resolver_concurrency: usize,
    /// Blocks dispatched per concurrency wave.
    pub wave_size: usize,
    /// Retry attempts for transient chain lookup failures.
    pub max_retries: u32,
    /// Rate limit applied to chain storage lookups.
    pub lookups_per_second: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            network_url_env_var: "PATROL_NETWORK_URL".to_string(),
            default_network_url: "wss://archive.chain.opentensor.ai:443".to_string(),
            ownership_cache_capacity: 10_000,
            block_cache_capacity: 1_000,
            address_cache_capacity: 100_000,
            resolver_concurrency: 50,
            wave_size: 20,
            max_retries: 3,
            lookups_per_second: 25,
        }
    }
}

impl IndexerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file at {}", path.display()))
    }
}
