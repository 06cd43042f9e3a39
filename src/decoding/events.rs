//! Typed views over the raw per-block event payload.
//!
//! A block's payload arrives as `{"event": {module: [ {EventName: fields} ]}}`
//! with positional staking fields and one event name overloaded across two
//! arities. Dispatch on field count happens here, converting each item into a
//! closed set of typed variants; the ambiguous raw shape never crosses this
//! boundary.

use serde_json::Value;

use super::address::AddressCodec;
use crate::types::events::Address;

pub const BALANCES_MODULE: &str = "Balances";
pub const STAKING_MODULE: &str = "SubtensorModule";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBalanceEvent {
    Transfer {
        from: Address,
        to: Address,
        rao_amount: u64,
    },
    Withdraw {
        who: Address,
        rao_amount: u64,
    },
    Deposit {
        who: Address,
        rao_amount: u64,
    },
}

/// A staking event with its wire arity already resolved.
///
/// `StakeAdded`/`StakeRemoved` arrive either in the short historical arity
/// `(delegate_hotkey, rao_amount)` or the long current arity
/// `(coldkey, delegate_hotkey, rao_amount, alpha_amount, net_uid)`.
/// `StakeMoved` is always
/// `(owner, source_hotkey, source_net_uid, destination_hotkey,
/// destination_net_uid, rao_amount)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStakeEvent {
    AddShort {
        delegate_hotkey: Address,
        rao_amount: u64,
    },
    AddLong {
        source: Address,
        delegate_hotkey: Address,
        rao_amount: u64,
        alpha_amount: u64,
        net_uid: u16,
    },
    RemoveShort {
        delegate_hotkey: Address,
        rao_amount: u64,
    },
    RemoveLong {
        destination: Address,
        delegate_hotkey: Address,
        rao_amount: u64,
        alpha_amount: u64,
        net_uid: u16,
    },
    Move {
        owner: Address,
        source_hotkey: Address,
        source_net_uid: u16,
        destination_hotkey: Address,
        destination_net_uid: u16,
        rao_amount: u64,
    },
}

/// Extract the balance-module events from one raw event record. Items from
/// other modules and unrecognized event types are ignored; malformed items are
/// logged and skipped.
pub fn balance_events(record: &Value, codec: &AddressCodec) -> Vec<RawBalanceEvent> {
    let mut events = Vec::new();
    for (event_type, details) in module_items(record, BALANCES_MODULE) {
        let parsed = match event_type {
            "Transfer" => named_amount(details).map(|rao_amount| RawBalanceEvent::Transfer {
                from: codec.decode(field(details, "from")),
                to: codec.decode(field(details, "to")),
                rao_amount,
            }),
            "Withdraw" => named_amount(details).map(|rao_amount| RawBalanceEvent::Withdraw {
                who: codec.decode(field(details, "who")),
                rao_amount,
            }),
            "Deposit" => named_amount(details).map(|rao_amount| RawBalanceEvent::Deposit {
                who: codec.decode(field(details, "who")),
                rao_amount,
            }),
            _ => continue,
        };
        match parsed {
            Some(event) => events.push(event),
            None => tracing::warn!("skipping malformed {event_type} event: {details}"),
        }
    }
    events
}

/// Extract the staking-module events from one raw event record, dispatching
/// on field count. Unknown arities and malformed fields are logged and
/// skipped.
pub fn stake_events(record: &Value, codec: &AddressCodec) -> Vec<RawStakeEvent> {
    let mut events = Vec::new();
    for (event_type, details) in module_items(record, STAKING_MODULE) {
        let Some(fields) = details.as_array() else {
            tracing::warn!("skipping {event_type} event with non-positional fields: {details}");
            continue;
        };
        let parsed = match (event_type, fields.len()) {
            ("StakeAdded", 2) => positional_amount(fields, 1).map(|rao_amount| {
                RawStakeEvent::AddShort {
                    delegate_hotkey: positional_address(fields, 0, codec),
                    rao_amount,
                }
            }),
            ("StakeAdded", n) if n >= 5 => long_stake(fields, codec).map(
                |(coldkey, delegate_hotkey, rao_amount, alpha_amount, net_uid)| {
                    RawStakeEvent::AddLong {
                        source: coldkey,
                        delegate_hotkey,
                        rao_amount,
                        alpha_amount,
                        net_uid,
                    }
                },
            ),
            ("StakeRemoved", 2) => positional_amount(fields, 1).map(|rao_amount| {
                RawStakeEvent::RemoveShort {
                    delegate_hotkey: positional_address(fields, 0, codec),
                    rao_amount,
                }
            }),
            ("StakeRemoved", n) if n >= 5 => long_stake(fields, codec).map(
                |(coldkey, delegate_hotkey, rao_amount, alpha_amount, net_uid)| {
                    RawStakeEvent::RemoveLong {
                        destination: coldkey,
                        delegate_hotkey,
                        rao_amount,
                        alpha_amount,
                        net_uid,
                    }
                },
            ),
            ("StakeMoved", 6) => {
                match (
                    positional_net_uid(fields, 2),
                    positional_net_uid(fields, 4),
                    positional_amount(fields, 5),
                ) {
                    (Some(source_net_uid), Some(destination_net_uid), Some(rao_amount)) => {
                        Some(RawStakeEvent::Move {
                            owner: positional_address(fields, 0, codec),
                            source_hotkey: positional_address(fields, 1, codec),
                            source_net_uid,
                            destination_hotkey: positional_address(fields, 3, codec),
                            destination_net_uid,
                            rao_amount,
                        })
                    }
                    _ => None,
                }
            }
            ("StakeAdded" | "StakeRemoved" | "StakeMoved", _) => {
                tracing::warn!(
                    "skipping {event_type} event with unrecognized arity {}",
                    fields.len()
                );
                continue;
            }
            _ => continue,
        };
        match parsed {
            Some(event) => events.push(event),
            None => tracing::warn!("skipping malformed {event_type} event: {details}"),
        }
    }
    events
}

/// Iterate the `(event_type, details)` pairs of one module within a record.
fn module_items<'a>(
    record: &'a Value,
    module: &'a str,
) -> impl Iterator<Item = (&'a str, &'a Value)> {
    record
        .get("event")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(move |modules| {
            modules
                .iter()
                .filter(move |(name, _)| name.as_str() == module)
        })
        .filter_map(|(_, items)| items.as_array())
        .flatten()
        .filter_map(Value::as_object)
        .flat_map(|item| item.iter().map(|(k, v)| (k.as_str(), v)))
}

fn field<'a>(details: &'a Value, name: &str) -> &'a Value {
    details.get(name).unwrap_or(&Value::Null)
}

fn named_amount(details: &Value) -> Option<u64> {
    details.get("amount")?.as_u64()
}

fn positional_amount(fields: &[Value], index: usize) -> Option<u64> {
    fields.get(index)?.as_u64()
}

fn positional_net_uid(fields: &[Value], index: usize) -> Option<u16> {
    fields
        .get(index)?
        .as_u64()
        .and_then(|n| u16::try_from(n).ok())
}

fn positional_address(fields: &[Value], index: usize, codec: &AddressCodec) -> Address {
    codec.decode(fields.get(index).unwrap_or(&Value::Null))
}

fn long_stake(
    fields: &[Value],
    codec: &AddressCodec,
) -> Option<(Address, Address, u64, u64, u16)> {
    Some((
        positional_address(fields, 0, codec),
        positional_address(fields, 1, codec),
        positional_amount(fields, 2)?,
        positional_amount(fields, 3)?,
        positional_net_uid(fields, 4)?,
    ))
}
