//! Hotkey → coldkey ownership resolution.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};

use crate::cache::BoundedCache;
use crate::chain::query::{ChainQuery, ChainQueryError};
use crate::types::events::Address;

const OWNER_MODULE: &str = "SubtensorModule";
const OWNER_STORAGE_ITEM: &str = "Owner";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("ownership lookup failed for hotkey {hotkey}: {source}")]
    Lookup {
        hotkey: String,
        #[source]
        source: ChainQueryError,
    },

    #[error("resolver gate closed")]
    GateClosed,
}

/// Resolves the owning coldkey of a hotkey through the chain, with a bounded
/// cache and a shared semaphore gate bounding concurrent in-flight lookups
/// across every call site.
///
/// Two concurrent misses for the same uncached hotkey can both issue a remote
/// lookup; both converge on the same cached value, so the stampede is a
/// bounded inefficiency rather than a correctness problem.
pub struct OwnershipResolver {
    client: Arc<dyn ChainQuery>,
    gate: Arc<Semaphore>,
    cache: Mutex<BoundedCache<Address, Address>>,
}

impl OwnershipResolver {
    pub fn new(client: Arc<dyn ChainQuery>, cache_capacity: usize, concurrency: usize) -> Self {
        Self {
            client,
            gate: Arc::new(Semaphore::new(concurrency.max(1))),
            cache: Mutex::new(BoundedCache::new(cache_capacity)),
        }
    }

    /// Resolve a hotkey to its owning coldkey.
    ///
    /// A cache hit returns without touching the chain. A miss issues exactly
    /// one lookup under the concurrency gate and caches the result. Failures
    /// are not retried here; retry policy belongs to the chain client.
    pub async fn resolve(&self, hotkey: &str) -> Result<Address, ResolveError> {
        if let Some(hit) = self.cache.lock().await.get(hotkey) {
            return Ok(hit.clone());
        }

        let owner = {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| ResolveError::GateClosed)?;
            self.client
                .query(OWNER_MODULE, OWNER_STORAGE_ITEM, hotkey)
                .await
                .map_err(|source| ResolveError::Lookup {
                    hotkey: hotkey.to_string(),
                    source,
                })?
        };

        self.cache
            .lock()
            .await
            .insert(hotkey.to_string(), owner.clone());
        Ok(owner)
    }
}
