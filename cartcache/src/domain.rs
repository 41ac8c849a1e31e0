use serde::{Deserialize, Serialize};

/// A single line item in a cart.
///
/// Stored as one JSON object per list element, e.g.
/// `{"ProductID":"OLJCESPC7Z","Quantity":2}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "ProductID")]
    pub product_id: String,
    #[serde(rename = "Quantity")]
    pub quantity: i32,
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}
