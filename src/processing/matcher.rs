//! Reconciles legacy-format stake records against same-block balance events.
//!
//! The legacy encoding carries no amount. A legacy `add` withdrew the staked
//! amount from the staker's free balance in the same block, and a legacy
//! `remove` deposited it back, so the amount is recovered from the first
//! balance movement whose coldkey matches. Unmatched records are dropped:
//! without an amount they carry no meaning.

use crate::types::events::{
    LegacyStakeEvent, PendingLegacyStake, StakeAction, TransferCategory, TransferEvent,
};

/// Match legacy stake records against the block's balance events. Matching is
/// by coldkey equality only; ties break on input order.
pub fn match_legacy_stakes(
    pending: Vec<PendingLegacyStake>,
    balance_events: &[TransferEvent],
) -> Vec<LegacyStakeEvent> {
    pending
        .into_iter()
        .filter_map(|record| {
            let amount = match record.action {
                StakeAction::Add => balance_events
                    .iter()
                    .find(|ev| {
                        ev.category == TransferCategory::Withdrawal
                            && ev.coldkey_destination.as_deref() == Some(record.coldkey.as_str())
                    })
                    .map(|ev| ev.rao_amount),
                StakeAction::Remove => balance_events
                    .iter()
                    .find(|ev| {
                        ev.category == TransferCategory::Deposit
                            && ev.coldkey_source.as_deref() == Some(record.coldkey.as_str())
                    })
                    .map(|ev| ev.rao_amount),
                StakeAction::Move => None,
            };
            match amount {
                Some(rao_amount) => Some(LegacyStakeEvent {
                    action: record.action,
                    coldkey: record.coldkey,
                    delegate_hotkey: record.delegate_hotkey,
                    rao_amount,
                    block_number: record.block_number,
                }),
                None => {
                    tracing::debug!(
                        "dropping unmatched legacy stake for {} in block {}",
                        record.coldkey,
                        record.block_number
                    );
                    None
                }
            }
        })
        .collect()
}
