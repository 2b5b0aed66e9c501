//! Queue message encoding.
//!
//! Order messages are stored as base64-encoded UTF-8 JSON. Decoding also
//! accepts bare JSON, which is what other producers (and older messages)
//! may have written.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Serialize, de::DeserializeOwned};

use cloud_retail_core::StorageError;

/// Serialize `value` to JSON and base64-encode it.
///
/// # Errors
///
/// Returns `StorageError::Codec` if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    let json = serde_json::to_vec(value).map_err(|e| StorageError::Codec(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

/// Decode a queue message written by [`encode`] or as bare JSON.
///
/// # Errors
///
/// Returns `StorageError::Codec` if the text is neither valid base64 JSON nor
/// valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, StorageError> {
    let trimmed = text.trim();
    if let Ok(bytes) = STANDARD.decode(trimmed)
        && let Ok(value) = serde_json::from_slice(&bytes)
    {
        return Ok(value);
    }
    serde_json::from_str(trimmed).map_err(|e| StorageError::Codec(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use cloud_retail_core::{OrderId, OrderMessage, OrderStatus, UserId};

    use super::*;

    fn message() -> OrderMessage {
        OrderMessage {
            order_id: OrderId::new(5),
            user_id: UserId::new(9),
            items: Vec::new(),
            total_amount: Decimal::new(1000, 2),
            order_date: Utc::now(),
            status: OrderStatus::Pending,
        }
    }

    #[test]
    fn test_encoded_text_is_base64_json() {
        let text = encode(&message()).unwrap();
        let raw = STANDARD.decode(&text).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["OrderId"], 5);
    }

    #[test]
    fn test_decode_accepts_bare_json() {
        let json = serde_json::to_string(&message()).unwrap();
        let decoded: OrderMessage = decode(&json).unwrap();
        assert_eq!(decoded.user_id, UserId::new(9));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode::<OrderMessage>("not a message"),
            Err(StorageError::Codec(_))
        ));
    }
}
