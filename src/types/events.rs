//! Canonical event records produced by the normalization pipeline.
//!
//! Raw wire shapes are converted into these types at the decode boundary and
//! nothing ambiguous survives past it. The corpus handed downstream is a flat
//! list of [`ChainEvent`]s ordered by block number.

use serde::{Deserialize, Serialize};

/// SS58-encoded account address. The empty string is the "unknown" sentinel
/// produced when a raw identifier is absent.
pub type Address = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferCategory {
    Transfer,
    Withdrawal,
    Deposit,
}

/// A balance movement: a peer-to-peer transfer, or funds leaving/entering the
/// free balance pool.
///
/// `Withdraw` carries only a destination (the withdrawing party) and `Deposit`
/// only a source; neither models a peer-to-peer move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub coldkey_source: Option<Address>,
    pub coldkey_destination: Option<Address>,
    pub category: TransferCategory,
    pub rao_amount: u64,
    pub block_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeAction {
    Add,
    Remove,
    Move,
}

/// A stake mutation in the current (self-describing) event format.
///
/// Which optional fields are populated depends on the action and on the wire
/// arity the event arrived in; see the staking normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEvent {
    pub action: StakeAction,
    pub rao_amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coldkey_source: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coldkey_destination: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coldkey_owner: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate_hotkey_source: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate_hotkey_destination: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_net_uid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_net_uid: Option<u16>,
    pub block_number: u64,
}

/// A legacy-format stake record before amount reconciliation.
///
/// The legacy wire encoding carries no amount, so there is deliberately no
/// amount field here: the matcher either recovers one from a same-block
/// balance movement and produces a [`LegacyStakeEvent`], or drops the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLegacyStake {
    pub action: StakeAction,
    /// Resolved owner of the involved delegate hotkey.
    pub coldkey: Address,
    pub delegate_hotkey: Address,
    pub block_number: u64,
}

/// A legacy-format stake record with its amount recovered by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyStakeEvent {
    pub action: StakeAction,
    pub coldkey: Address,
    pub delegate_hotkey: Address,
    pub rao_amount: u64,
    pub block_number: u64,
}

/// One record of the canonical event corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainEvent {
    Balance(TransferEvent),
    Stake(StakeEvent),
    LegacyStake(LegacyStakeEvent),
}

impl ChainEvent {
    pub fn block_number(&self) -> u64 {
        match self {
            ChainEvent::Balance(ev) => ev.block_number,
            ChainEvent::Stake(ev) => ev.block_number,
            ChainEvent::LegacyStake(ev) => ev.block_number,
        }
    }
}

/// Everything normalized out of a single block. Cached write-once per block
/// number: finalized chain history never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockResult {
    pub balance: Vec<TransferEvent>,
    pub stake: Vec<StakeEvent>,
    pub legacy: Vec<LegacyStakeEvent>,
}

impl BlockResult {
    pub fn is_empty(&self) -> bool {
        self.balance.is_empty() && self.stake.is_empty() && self.legacy.is_empty()
    }

    /// Flatten into corpus order: balance, then stake, then legacy records.
    pub fn into_events(self) -> impl Iterator<Item = ChainEvent> {
        self.balance
            .into_iter()
            .map(ChainEvent::Balance)
            .chain(self.stake.into_iter().map(ChainEvent::Stake))
            .chain(self.legacy.into_iter().map(ChainEvent::LegacyStake))
    }
}
