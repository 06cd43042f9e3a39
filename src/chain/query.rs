//! The chain lookup capability consumed by the pipeline.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainQueryError {
    #[error("chain transport error: {0}")]
    Transport(String),

    #[error("invalid storage key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("no value at {module}::{storage_item} for {key}")]
    Missing {
        module: String,
        storage_item: String,
        key: String,
    },

    #[error("failed to decode storage value: {0}")]
    Decode(String),
}

impl ChainQueryError {
    /// Check if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChainQueryError::Transport(msg) => Self::is_retryable_message(msg),
            ChainQueryError::InvalidKey { .. } => false,
            ChainQueryError::Missing { .. } => false,
            ChainQueryError::Decode(_) => false,
        }
    }

    fn is_retryable_message(msg: &str) -> bool {
        let msg_lower = msg.to_lowercase();
        msg_lower.contains("connection")
            || msg_lower.contains("timeout")
            || msg_lower.contains("timed out")
            || msg_lower.contains("reset")
            || msg_lower.contains("broken pipe")
            || msg_lower.contains("network")
            || msg_lower.contains("eof")
            || msg_lower.contains("rate limit")
            || msg_lower.contains("too many requests")
            || msg_lower.contains("429")
            || msg_lower.contains("503")
            || msg_lower.contains("service unavailable")
            || msg_lower.contains("try again")
            // websocket transports surface generic "rpc error" strings on
            // dropped connections, so treat unclassified transport noise
            // as retryable too
            || msg_lower.contains("rpc error")
    }
}

/// A storage lookup against the chain: `query(module, storage_item, key)`.
///
/// May fail or time out; failures surface as [`ChainQueryError`]s that the
/// caller treats as per-key resolution failures, never as fatal errors.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    async fn query(
        &self,
        module: &str,
        storage_item: &str,
        key: &str,
    ) -> Result<String, ChainQueryError>;
}
