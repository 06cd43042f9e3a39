//! Chain client backed by a subxt websocket connection.
//!
//! Storage lookups are rate limited and retried with exponential backoff on
//! transient transport failures. The pipeline itself never retries; all retry
//! policy lives here.

use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use subxt::dynamic::Value as ScaleValue;
use subxt::utils::AccountId32;
use subxt::{OnlineClient, SubstrateConfig};

use super::query::{ChainQuery, ChainQueryError};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        std::cmp::min(Duration::from_millis(delay_ms as u64), self.max_delay)
    }
}

/// Rate-limited, retrying storage client for a Subtensor archive node.
pub struct SubtensorClient {
    client: OnlineClient<SubstrateConfig>,
    limiter: DefaultDirectRateLimiter,
    retry: RetryConfig,
}

impl SubtensorClient {
    pub async fn connect(
        url: &str,
        lookups_per_second: u32,
        retry: RetryConfig,
    ) -> Result<Self, ChainQueryError> {
        let client = OnlineClient::<SubstrateConfig>::from_url(url)
            .await
            .map_err(|e| ChainQueryError::Transport(e.to_string()))?;
        let quota =
            NonZeroU32::new(lookups_per_second).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            client,
            limiter: RateLimiter::direct(Quota::per_second(quota)),
            retry,
        })
    }

    async fn fetch_owner(
        &self,
        module: &str,
        storage_item: &str,
        key: &str,
        account: &AccountId32,
    ) -> Result<String, ChainQueryError> {
        self.limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let address = subxt::dynamic::storage(
            module.to_string(),
            storage_item.to_string(),
            vec![ScaleValue::from_bytes(account.0)],
        );
        let storage = self
            .client
            .storage()
            .at_latest()
            .await
            .map_err(|e| ChainQueryError::Transport(e.to_string()))?;
        let value = storage
            .fetch(&address)
            .await
            .map_err(|e| ChainQueryError::Transport(e.to_string()))?
            .ok_or_else(|| ChainQueryError::Missing {
                module: module.to_string(),
                storage_item: storage_item.to_string(),
                key: key.to_string(),
            })?;
        let owner: AccountId32 = value
            .as_type()
            .map_err(|e| ChainQueryError::Decode(e.to_string()))?;
        Ok(owner.to_string())
    }
}

#[async_trait]
impl ChainQuery for SubtensorClient {
    async fn query(
        &self,
        module: &str,
        storage_item: &str,
        key: &str,
    ) -> Result<String, ChainQueryError> {
        let account =
            AccountId32::from_str(key).map_err(|e| ChainQueryError::InvalidKey {
                key: key.to_string(),
                reason: format!("{e:?}"),
            })?;

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let delay = self.retry.delay_for_attempt(attempt);
                tracing::warn!(
                    "retrying {module}::{storage_item} lookup for {key} ({attempt}/{}) in {delay:?}",
                    self.retry.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            match self.fetch_owner(module, storage_item, key, &account).await {
                Ok(owner) => return Ok(owner),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(retry.delay_for_attempt(20), Duration::from_secs(10));
    }
}
