//! Staking-module event normalization.
//!
//! Every staking event needs at least one hotkey → coldkey resolution, so the
//! per-event work is scheduled concurrently and joined; block latency tracks
//! the slowest lookup rather than their sum. A failed resolution drops that
//! one event and nothing else.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::decoding::address::AddressCodec;
use crate::decoding::events::{stake_events, RawStakeEvent};
use crate::types::events::{Address, PendingLegacyStake, StakeAction, StakeEvent};

use super::resolver::OwnershipResolver;

pub struct StakeEventNormalizer {
    codec: Arc<AddressCodec>,
    resolver: Arc<OwnershipResolver>,
}

impl StakeEventNormalizer {
    pub fn new(codec: Arc<AddressCodec>, resolver: Arc<OwnershipResolver>) -> Self {
        Self { codec, resolver }
    }

    /// Normalize one raw event record into new-format and legacy-format
    /// records. The legacy records still lack amounts; the matcher fills
    /// those in against the block's balance events.
    pub async fn normalize(
        &self,
        record: &Value,
        block_number: u64,
    ) -> (Vec<StakeEvent>, Vec<PendingLegacyStake>) {
        let raw = stake_events(record, &self.codec);
        let outcomes = join_all(
            raw.into_iter()
                .map(|event| self.normalize_one(event, block_number)),
        )
        .await;

        let mut new_format = Vec::new();
        let mut legacy = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            let (event, pending) = outcome;
            new_format.push(event);
            if let Some(pending) = pending {
                legacy.push(pending);
            }
        }
        (new_format, legacy)
    }

    async fn normalize_one(
        &self,
        event: RawStakeEvent,
        block_number: u64,
    ) -> Option<(StakeEvent, Option<PendingLegacyStake>)> {
        match event {
            RawStakeEvent::AddShort {
                delegate_hotkey,
                rao_amount,
            } => {
                let owner = self.resolve_or_skip(&delegate_hotkey, block_number).await?;
                let mut new = base_event(StakeAction::Add, rao_amount, block_number);
                new.coldkey_destination = Some(owner.clone());
                new.delegate_hotkey_destination = Some(delegate_hotkey.clone());
                Some((
                    new,
                    Some(PendingLegacyStake {
                        action: StakeAction::Add,
                        coldkey: owner,
                        delegate_hotkey,
                        block_number,
                    }),
                ))
            }
            RawStakeEvent::AddLong {
                source,
                delegate_hotkey,
                rao_amount,
                alpha_amount,
                net_uid,
            } => {
                let owner = self.resolve_or_skip(&delegate_hotkey, block_number).await?;
                let mut new = base_event(StakeAction::Add, rao_amount, block_number);
                new.alpha_amount = Some(alpha_amount);
                new.coldkey_source = Some(source);
                new.coldkey_destination = Some(owner.clone());
                new.delegate_hotkey_destination = Some(delegate_hotkey.clone());
                new.destination_net_uid = Some(net_uid);
                Some((
                    new,
                    Some(PendingLegacyStake {
                        action: StakeAction::Add,
                        coldkey: owner,
                        delegate_hotkey,
                        block_number,
                    }),
                ))
            }
            RawStakeEvent::RemoveShort {
                delegate_hotkey,
                rao_amount,
            } => {
                let owner = self.resolve_or_skip(&delegate_hotkey, block_number).await?;
                let mut new = base_event(StakeAction::Remove, rao_amount, block_number);
                new.coldkey_source = Some(owner.clone());
                new.delegate_hotkey_source = Some(delegate_hotkey.clone());
                Some((
                    new,
                    Some(PendingLegacyStake {
                        action: StakeAction::Remove,
                        coldkey: owner,
                        delegate_hotkey,
                        block_number,
                    }),
                ))
            }
            RawStakeEvent::RemoveLong {
                destination,
                delegate_hotkey,
                rao_amount,
                alpha_amount,
                net_uid,
            } => {
                let owner = self.resolve_or_skip(&delegate_hotkey, block_number).await?;
                let mut new = base_event(StakeAction::Remove, rao_amount, block_number);
                new.alpha_amount = Some(alpha_amount);
                new.coldkey_source = Some(owner.clone());
                new.coldkey_destination = Some(destination);
                new.delegate_hotkey_source = Some(delegate_hotkey.clone());
                new.source_net_uid = Some(net_uid);
                Some((
                    new,
                    Some(PendingLegacyStake {
                        action: StakeAction::Remove,
                        coldkey: owner,
                        delegate_hotkey,
                        block_number,
                    }),
                ))
            }
            // Intra-stake moves have no legacy representation.
            RawStakeEvent::Move {
                owner,
                source_hotkey,
                source_net_uid,
                destination_hotkey,
                destination_net_uid,
                rao_amount,
            } => {
                let source_owner = self.resolve_or_skip(&source_hotkey, block_number).await?;
                let destination_owner = self
                    .resolve_or_skip(&destination_hotkey, block_number)
                    .await?;
                let mut new = base_event(StakeAction::Move, rao_amount, block_number);
                new.coldkey_owner = Some(owner);
                new.coldkey_source = Some(source_owner);
                new.coldkey_destination = Some(destination_owner);
                new.delegate_hotkey_source = Some(source_hotkey);
                new.delegate_hotkey_destination = Some(destination_hotkey);
                new.source_net_uid = Some(source_net_uid);
                new.destination_net_uid = Some(destination_net_uid);
                Some((new, None))
            }
        }
    }

    async fn resolve_or_skip(&self, hotkey: &str, block_number: u64) -> Option<Address> {
        match self.resolver.resolve(hotkey).await {
            Ok(coldkey) => Some(coldkey),
            Err(e) => {
                tracing::warn!("skipping stake event in block {block_number}: {e}");
                None
            }
        }
    }
}

fn base_event(action: StakeAction, rao_amount: u64, block_number: u64) -> StakeEvent {
    StakeEvent {
        action,
        rao_amount,
        alpha_amount: None,
        coldkey_source: None,
        coldkey_destination: None,
        coldkey_owner: None,
        delegate_hotkey_source: None,
        delegate_hotkey_destination: None,
        source_net_uid: None,
        destination_net_uid: None,
        block_number,
    }
}
