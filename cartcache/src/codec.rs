use crate::domain::CartItem;
use shared::{Error, Result};

pub fn encode_item(item: &CartItem) -> Result<String> {
    serde_json::to_string(item).map_err(|e| Error::Encoding(e.to_string()))
}

pub fn decode_item(raw: &str) -> Result<CartItem> {
    serde_json::from_str(raw).map_err(|e| Error::Decoding(e.to_string()))
}

/// Decode every element, failing the whole batch on the first bad one.
pub fn decode_items(raw: &[String]) -> Result<Vec<CartItem>> {
    raw.iter().map(String::as_str).map(decode_item).collect()
}
