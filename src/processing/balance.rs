//! Balance-module event normalization.

use std::sync::Arc;

use serde_json::Value;

use crate::decoding::address::AddressCodec;
use crate::decoding::events::{balance_events, RawBalanceEvent};
use crate::types::events::{TransferCategory, TransferEvent};

/// Converts raw balance-module events into canonical transfer records.
/// Purely CPU-bound; no chain lookups.
pub struct BalanceEventNormalizer {
    codec: Arc<AddressCodec>,
}

impl BalanceEventNormalizer {
    pub fn new(codec: Arc<AddressCodec>) -> Self {
        Self { codec }
    }

    pub fn normalize(&self, record: &Value, block_number: u64) -> Vec<TransferEvent> {
        balance_events(record, &self.codec)
            .into_iter()
            .map(|event| match event {
                RawBalanceEvent::Transfer {
                    from,
                    to,
                    rao_amount,
                } => TransferEvent {
                    coldkey_source: Some(from),
                    coldkey_destination: Some(to),
                    category: TransferCategory::Transfer,
                    rao_amount,
                    block_number,
                },
                // A withdrawal models funds leaving the free balance pool, so
                // `who` takes the destination role and there is no source.
                RawBalanceEvent::Withdraw { who, rao_amount } => TransferEvent {
                    coldkey_source: None,
                    coldkey_destination: Some(who),
                    category: TransferCategory::Withdrawal,
                    rao_amount,
                    block_number,
                },
                RawBalanceEvent::Deposit { who, rao_amount } => TransferEvent {
                    coldkey_source: Some(who),
                    coldkey_destination: None,
                    category: TransferCategory::Deposit,
                    rao_amount,
                    block_number,
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn normalizer() -> BalanceEventNormalizer {
        BalanceEventNormalizer::new(Arc::new(AddressCodec::new(64)))
    }

    #[test]
    fn transfer_at_block_42() {
        let record = json!({
            "event": {
                "Balances": [
                    {"Transfer": {"from": raw_account(1), "to": raw_account(2), "amount": 1000}}
                ]
            }
        });
        let events = normalizer().normalize(&record, 42);
        assert_eq!(
            events,
            vec![TransferEvent {
                coldkey_source: Some(address(1)),
                coldkey_destination: Some(address(2)),
                category: TransferCategory::Transfer,
                rao_amount: 1000,
                block_number: 42,
            }]
        );
    }

    #[test]
    fn withdraw_and_deposit_roles() {
        let record = json!({
            "event": {
                "Balances": [
                    {"Withdraw": {"who": raw_account(1), "amount": 10}},
                    {"Deposit": {"who": raw_account(2), "amount": 20}}
                ]
            }
        });
        let events = normalizer().normalize(&record, 7);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category, TransferCategory::Withdrawal);
        assert_eq!(events[0].coldkey_source, None);
        assert_eq!(events[0].coldkey_destination, Some(address(1)));
        assert_eq!(events[1].category, TransferCategory::Deposit);
        assert_eq!(events[1].coldkey_source, Some(address(2)));
        assert_eq!(events[1].coldkey_destination, None);
    }

    #[test]
    fn non_balance_records_produce_nothing() {
        let record = json!({"event": {"SubtensorModule": [{"StakeAdded": [raw_account(1), 5]}]}});
        assert!(normalizer().normalize(&record, 1).is_empty());
    }
}
