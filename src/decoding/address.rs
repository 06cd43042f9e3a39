//! SS58 address decoding with memoization.
//!
//! The wire nests the real account id one level deep: a raw identifier is an
//! array whose first element is the 32-byte account id. Decoding is permissive
//! on purpose: a malformed identifier degrades to a best-effort rendering so a
//! single bad field never fails a whole block.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use subxt::utils::AccountId32;

use crate::cache::BoundedCache;
use crate::types::events::Address;

pub struct AddressCodec {
    cache: Mutex<BoundedCache<String, Address>>,
}

impl AddressCodec {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(BoundedCache::new(capacity)),
        }
    }

    /// Decode a raw account identifier into its SS58 address.
    ///
    /// Empty or null input yields the empty-string sentinel. Results are
    /// memoized under the stringified payload, including fallback renderings,
    /// so repeated bad identifiers do not log repeatedly.
    pub fn decode(&self, raw: &Value) -> Address {
        let Some(payload) = first_element(raw) else {
            return Address::new();
        };
        let cache_key = payload.to_string();

        {
            let cache = self
                .cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(&cache_key) {
                return hit.clone();
            }
        }

        let decoded = match decode_account_id(payload) {
            Ok(address) => address,
            Err(reason) => {
                tracing::warn!("failed to decode account id from {cache_key}: {reason}");
                fallback_render(payload)
            }
        };

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cache_key, decoded.clone());
        decoded
    }
}

fn first_element(raw: &Value) -> Option<&Value> {
    match raw.as_array()?.first()? {
        Value::Null => None,
        payload => Some(payload),
    }
}

fn decode_account_id(payload: &Value) -> Result<Address, String> {
    match payload {
        Value::Array(_) => {
            let bytes = byte_array(payload).ok_or("expected an array of bytes")?;
            let account: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| format!("expected 32 bytes, got {}", bytes.len()))?;
            Ok(AccountId32(account).to_string())
        }
        Value::String(s) => {
            if let Some(hex_str) = s.strip_prefix("0x") {
                let bytes = hex::decode(hex_str).map_err(|e| e.to_string())?;
                let account: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| format!("expected 32 bytes, got {}", bytes.len()))?;
                return Ok(AccountId32(account).to_string());
            }
            // Already SS58 text.
            s.parse::<AccountId32>()
                .map(|_| s.clone())
                .map_err(|e| format!("{e:?}"))
        }
        other => Err(format!("unsupported identifier shape: {other}")),
    }
}

fn byte_array(payload: &Value) -> Option<Vec<u8>> {
    payload
        .as_array()?
        .iter()
        .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

fn fallback_render(payload: &Value) -> Address {
    match payload {
        Value::String(s) => s.clone(),
        Value::Array(_) => match byte_array(payload) {
            Some(bytes) => format!("0x{}", hex::encode(bytes)),
            None => payload.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_account(byte: u8) -> Value {
        Value::Array(vec![Value::Array(
            (0..32).map(|_| Value::from(byte)).collect(),
        )])
    }

    #[test]
    fn decodes_nested_account_id() {
        let codec = AddressCodec::new(16);
        let expected = AccountId32([7u8; 32]).to_string();
        assert_eq!(codec.decode(&raw_account(7)), expected);
    }

    #[test]
    fn empty_and_null_yield_sentinel() {
        let codec = AddressCodec::new(16);
        assert_eq!(codec.decode(&json!([])), "");
        assert_eq!(codec.decode(&json!(null)), "");
        assert_eq!(codec.decode(&json!([null])), "");
    }

    #[test]
    fn memoizes_decoded_addresses() {
        let codec = AddressCodec::new(16);
        let first = codec.decode(&raw_account(3));
        let second = codec.decode(&raw_account(3));
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_bytes_fall_back_to_hex() {
        let codec = AddressCodec::new(16);
        // Three bytes cannot be an account id.
        assert_eq!(codec.decode(&json!([[1, 2, 3]])), "0x010203");
    }

    #[test]
    fn ss58_strings_pass_through() {
        let codec = AddressCodec::new(16);
        let address = AccountId32([9u8; 32]).to_string();
        assert_eq!(codec.decode(&json!([address.clone()])), address);
    }

    #[test]
    fn hex_strings_decode_to_ss58() {
        let codec = AddressCodec::new(16);
        let hex_id = format!("0x{}", hex::encode([5u8; 32]));
        let expected = AccountId32([5u8; 32]).to_string();
        assert_eq!(codec.decode(&json!([hex_id])), expected);
    }
}
