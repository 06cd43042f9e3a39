//! In-memory `ChainQuery` used by pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::query::{ChainQuery, ChainQueryError};

/// A fixed hotkey → coldkey table with call counting and per-key failure
/// injection. Keys registered as panicking unwind mid-lookup, standing in for
/// a defect deep inside block processing.
#[derive(Default)]
pub struct MockChainQuery {
    owners: HashMap<String, String>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    calls: AtomicUsize,
}

impl MockChainQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, hotkey: &str, coldkey: &str) -> Self {
        self.owners.insert(hotkey.to_string(), coldkey.to_string());
        self
    }

    pub fn failing_for(mut self, hotkey: &str) -> Self {
        self.failing.insert(hotkey.to_string());
        self
    }

    pub fn panicking_for(mut self, hotkey: &str) -> Self {
        self.panicking.insert(hotkey.to_string());
        self
    }

    /// Number of remote lookups issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainQuery for MockChainQuery {
    async fn query(
        &self,
        module: &str,
        storage_item: &str,
        key: &str,
    ) -> Result<String, ChainQueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(key) {
            panic!("simulated lookup panic for {key}");
        }
        if self.failing.contains(key) {
            return Err(ChainQueryError::Transport(
                "simulated lookup failure".to_string(),
            ));
        }
        self.owners
            .get(key)
            .cloned()
            .ok_or_else(|| ChainQueryError::Missing {
                module: module.to_string(),
                storage_item: storage_item.to_string(),
                key: key.to_string(),
            })
    }
}
