//! Holding: a user's quantity of one asset.

use crate::domain::{Decimal, Symbol};
use serde::{Deserialize, Serialize};

/// One holding per (account, symbol) pair with non-zero quantity.
///
/// A holding whose quantity would reach zero or below is deleted from the
/// store, never persisted at zero. `display_name` and `icon_ref` are
/// denormalized display metadata and carry no invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: Symbol,
    pub quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
}

impl Holding {
    pub fn new(symbol: Symbol, quantity: Decimal) -> Self {
        Holding {
            symbol,
            quantity,
            display_name: None,
            icon_ref: None,
        }
    }

    pub fn with_metadata(mut self, display_name: Option<String>, icon_ref: Option<String>) -> Self {
        self.display_name = display_name;
        self.icon_ref = icon_ref;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holding_metadata_optional() {
        let holding = Holding::new(
            Symbol::new("BTC"),
            Decimal::from_str_canonical("0.01").unwrap(),
        );
        assert!(holding.display_name.is_none());

        let holding = holding.with_metadata(Some("Bitcoin".to_string()), None);
        assert_eq!(holding.display_name.as_deref(), Some("Bitcoin"));
        let json = serde_json::to_value(&holding).unwrap();
        assert!(json.get("icon_ref").is_none());
    }
}
