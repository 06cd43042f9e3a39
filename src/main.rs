mod cache;
mod chain;
mod decoding;
mod processing;
mod types;

use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use chain::client::{RetryConfig, SubtensorClient};
use decoding::address::AddressCodec;
use processing::balance::BalanceEventNormalizer;
use processing::batch::BatchCoordinator;
use processing::block::BlockEventProcessor;
use processing::resolver::OwnershipResolver;
use processing::stake::StakeEventNormalizer;
use types::config::IndexerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let input_path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("raw_event_data.json");
    let output_path = args.get(2).map(String::as_str);

    let config = IndexerConfig::load(Path::new("config/config.json"))?;
    let network_url = network_url(&config);

    let raw = std::fs::read_to_string(input_path)
        .with_context(|| format!("failed to read raw event data from {input_path}"))?;
    let event_data: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("{input_path} is not valid JSON"))?;

    tracing::info!("connecting to {network_url}");
    let client = SubtensorClient::connect(
        &network_url,
        config.lookups_per_second,
        RetryConfig::new(config.max_retries),
    )
    .await
    .context("failed to connect to the chain")?;

    let codec = Arc::new(AddressCodec::new(config.address_cache_capacity));
    let resolver = Arc::new(OwnershipResolver::new(
        Arc::new(client),
        config.ownership_cache_capacity,
        config.resolver_concurrency,
    ));
    let processor = Arc::new(BlockEventProcessor::new(
        BalanceEventNormalizer::new(codec.clone()),
        StakeEventNormalizer::new(codec, resolver),
        config.block_cache_capacity,
    ));
    let coordinator = BatchCoordinator::new(processor, config.wave_size);

    let corpus = coordinator.process_all(event_data).await;

    match output_path {
        Some(path) => {
            let json = serde_json::to_string_pretty(&corpus)?;
            std::fs::write(path, json)
                .with_context(|| format!("failed to write corpus to {path}"))?;
            tracing::info!("wrote canonical event corpus to {path}");
        }
        None => println!("{}", serde_json::to_string_pretty(&corpus)?),
    }
    Ok(())
}

/// Resolve the archive node URL: env var first, then .env, then the default.
fn network_url(config: &IndexerConfig) -> String {
    if let Ok(url) = env::var(&config.network_url_env_var) {
        return url;
    }
    let _ = dotenvy::dotenv();
    env::var(&config.network_url_env_var).unwrap_or_else(|_| config.default_network_url.clone())
}
