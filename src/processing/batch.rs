//! Wave-partitioned batch processing across blocks.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;

use crate::types::events::{BlockResult, ChainEvent};

use super::block::BlockEventProcessor;

/// Dispatches block processing in bounded waves and aggregates the canonical
/// event corpus.
///
/// Wave size bounds how many blocks are in flight at once; the resolver's
/// semaphore independently bounds total concurrent chain lookups, so the two
/// caps compose. A failing block contributes nothing and never cancels its
/// siblings.
pub struct BatchCoordinator {
    processor: Arc<BlockEventProcessor>,
    wave_size: usize,
}

impl BatchCoordinator {
    pub fn new(processor: Arc<BlockEventProcessor>, wave_size: usize) -> Self {
        Self {
            processor,
            wave_size: wave_size.max(1),
        }
    }

    /// Process a mapping of block number → raw event records into the
    /// flattened corpus, ordered by ascending block number with balance
    /// events before stake events before legacy events within a block.
    ///
    /// Malformed input degrades rather than fails: a non-mapping payload
    /// yields an empty corpus, non-integer block keys and non-list block
    /// payloads are skipped with a warning.
    pub async fn process_all(&self, event_data: Value) -> Vec<ChainEvent> {
        let blocks = match event_data {
            Value::Object(blocks) => blocks,
            other => {
                tracing::error!("expected a mapping of block number to events, got: {other}");
                return Vec::new();
            }
        };
        let total_blocks = blocks.len();

        let mut results: Vec<(u64, BlockResult)> = Vec::new();
        let mut uncached: Vec<(u64, Vec<Value>)> = Vec::new();
        for (key, payload) in blocks {
            let Ok(block_number) = key.parse::<u64>() else {
                tracing::warn!("block key {key} is not an integer, skipping");
                continue;
            };
            if let Some(hit) = self.processor.cached(block_number).await {
                results.push((block_number, hit));
                continue;
            }
            match payload {
                Value::Array(records) => uncached.push((block_number, records)),
                _ => tracing::warn!("block {block_number} events are not a list, skipping"),
            }
        }

        if uncached.is_empty() {
            tracing::info!("all {total_blocks} blocks served from cache");
        } else {
            tracing::info!(
                "processing {} uncached blocks out of {total_blocks}",
                uncached.len()
            );
            uncached.sort_by_key(|(block_number, _)| *block_number);

            let total = uncached.len();
            let mut completed = 0usize;
            let mut queue = uncached.into_iter();
            loop {
                let wave: Vec<_> = queue.by_ref().take(self.wave_size).collect();
                if wave.is_empty() {
                    break;
                }

                let mut tasks: JoinSet<(u64, BlockResult)> = JoinSet::new();
                for (block_number, records) in wave {
                    let processor = self.processor.clone();
                    tasks.spawn(async move {
                        (block_number, processor.process(&records, block_number).await)
                    });
                }
                while let Some(joined) = tasks.join_next().await {
                    completed += 1;
                    match joined {
                        Ok((block_number, result)) => results.push((block_number, result)),
                        Err(e) => tracing::error!("block processing task failed: {e}"),
                    }
                }

                if total > 100 {
                    tracing::info!(
                        "processing progress: {}% complete",
                        completed * 100 / total
                    );
                }
            }
        }

        results.sort_by_key(|(block_number, _)| *block_number);
        let corpus: Vec<ChainEvent> = results
            .into_iter()
            .flat_map(|(_, result)| result.into_events())
            .collect();
        tracing::info!(
            "normalized {} canonical events from {total_blocks} blocks",
            corpus.len()
        );
        corpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChainQuery;
    use crate::decoding::address::AddressCodec;
    use crate::processing::balance::BalanceEventNormalizer;
    use crate::processing::resolver::OwnershipResolver;
    use crate::processing::stake::StakeEventNormalizer;
    use serde_json::json;
    use subxt::utils::AccountId32;

    fn raw_account(byte: u8) -> Value {
        Value::Array(vec![Value::Array(
            (0..32).map(|_| Value::from(byte)).collect(),
        )])
    }

    fn address(byte: u8) -> String {
        AccountId32([byte; 32]).to_string()
    }

    fn coordinator(client: Arc<MockChainQuery>) -> BatchCoordinator {
        let codec = Arc::new(AddressCodec::new(64));
        let resolver = Arc::new(OwnershipResolver::new(client, 100, 8));
        let processor = Arc::new(BlockEventProcessor::new(
            BalanceEventNormalizer::new(codec.clone()),
            StakeEventNormalizer::new(codec, resolver),
            16,
        ));
        BatchCoordinator::new(processor, 2)
    }

    fn transfer_record(from: u8, to: u8, amount: u64) -> Value {
        json!({
            "event": {"Balances": [
                {"Transfer": {"from": raw_account(from), "to": raw_account(to), "amount": amount}}
            ]}
        })
    }

    #[tokio::test]
    async fn non_mapping_input_yields_empty_corpus() {
        let coordinator = coordinator(Arc::new(MockChainQuery::new()));
        assert!(coordinator.process_all(json!([1, 2, 3])).await.is_empty());
        assert!(coordinator.process_all(json!("blocks")).await.is_empty());
    }

    #[tokio::test]
    async fn bad_keys_and_payloads_are_skipped() {
        let coordinator = coordinator(Arc::new(MockChainQuery::new()));
        let corpus = coordinator
            .process_all(json!({
                "not-a-number": [transfer_record(1, 2, 10)],
                "11": "malformed",
                "10": [transfer_record(1, 2, 1000)],
            }))
            .await;

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].block_number(), 10);
    }

    #[tokio::test]
    async fn panicking_block_does_not_cancel_siblings() {
        let client = Arc::new(MockChainQuery::new().panicking_for(&address(7)));
        let coordinator = coordinator(client);
        let corpus = coordinator
            .process_all(json!({
                "10": [transfer_record(1, 2, 1000)],
                "11": [{"event": {"SubtensorModule": [{"StakeAdded": [raw_account(7), 500]}]}}],
            }))
            .await;

        // Block 11's task unwinds mid-lookup; block 10 is unaffected.
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].block_number(), 10);
    }

    #[tokio::test]
    async fn corpus_is_ordered_by_ascending_block() {
        let coordinator = coordinator(Arc::new(MockChainQuery::new()));
        let corpus = coordinator
            .process_all(json!({
                "30": [transfer_record(1, 2, 3)],
                "10": [transfer_record(3, 4, 1)],
                "20": [transfer_record(5, 6, 2)],
            }))
            .await;

        let blocks: Vec<u64> = corpus.iter().map(ChainEvent::block_number).collect();
        assert_eq!(blocks, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn balance_precedes_stake_precedes_legacy_within_a_block() {
        let coldkey = address(9);
        let client = Arc::new(MockChainQuery::new().with_owner(&address(1), &coldkey));
        let coordinator = coordinator(client);

        let corpus = coordinator
            .process_all(json!({
                "5": [{
                    "event": {
                        "Balances": [
                            {"Withdraw": {"who": [coldkey], "amount": 500}}
                        ],
                        "SubtensorModule": [
                            {"StakeAdded": [raw_account(1), 500]}
                        ]
                    }
                }]
            }))
            .await;

        assert_eq!(corpus.len(), 3);
        assert!(matches!(corpus[0], ChainEvent::Balance(_)));
        assert!(matches!(corpus[1], ChainEvent::Stake(_)));
        assert!(matches!(corpus[2], ChainEvent::LegacyStake(_)));
    }

    #[tokio::test]
    async fn cached_blocks_bypass_dispatch_on_reprocessing() {
        let client = Arc::new(MockChainQuery::new().with_owner(&address(1), "cold"));
        let coordinator = coordinator(client.clone());
        let data = json!({
            "5": [{"event": {"SubtensorModule": [{"StakeAdded": [raw_account(1), 500]}]}}]
        });

        let first = coordinator.process_all(data.clone()).await;
        let calls_after_first = client.calls();
        let second = coordinator.process_all(data).await;

        assert_eq!(first, second);
        assert_eq!(client.calls(), calls_after_first);
    }

    #[tokio::test]
    async fn end_to_end_transfer_example() {
        let coordinator = coordinator(Arc::new(MockChainQuery::new()));
        let corpus = coordinator
            .process_all(json!({"42": [transfer_record(1, 2, 1000)]}))
            .await;

        assert_eq!(corpus.len(), 1);
        let ChainEvent::Balance(ref event) = corpus[0] else {
            panic!("expected a balance event");
        };
        assert_eq!(event.coldkey_source, Some(address(1)));
        assert_eq!(event.coldkey_destination, Some(address(2)));
        assert_eq!(event.rao_amount, 1000);
        assert_eq!(event.block_number, 42);
    }
}
