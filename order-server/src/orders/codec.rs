//! Order payload encoding
//!
//! Orders are stored as UTF-8 JSON documents. Decoding is schema-checked
//! and fails closed: unknown fields, missing fields (including a missing
//! timestamp key), negative quantities or prices and truncated input are
//! all [`CodecError::Decode`] rather than silently defaulted.

use shared::Order;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode order: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode order: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode(order: &Order) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(order).map_err(CodecError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Order, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}
