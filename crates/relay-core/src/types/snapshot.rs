//! The message pushed to subscribers on every tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::quote::Quote;

/// Full copy of the quote mapping, keyed by symbol (alphabetical order).
pub type QuoteSnapshot = BTreeMap<String, Quote>;

/// `{"timestamp": <ms since epoch>, "prices": {...}}`
///
/// Built fresh on each tick and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub timestamp: i64,
    pub prices: QuoteSnapshot,
}

impl SnapshotMessage {
    pub fn new(timestamp: i64, prices: QuoteSnapshot) -> Self {
        Self { timestamp, prices }
    }

    /// Serialize to the subscriber wire format.
    ///
    /// Non-finite prices are written as JSON `null`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape() {
        let mut prices = QuoteSnapshot::new();
        prices.insert("BTCUSDT".into(), Quote { bid: 1.5, ask: 2.5 });
        prices.insert("ADAUSDT".into(), Quote::default());
        let json = SnapshotMessage::new(1_716_400_000_123, prices).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":1716400000123,"prices":{"ADAUSDT":{"bid":0.0,"ask":0.0},"BTCUSDT":{"bid":1.5,"ask":2.5}}}"#
        );
    }

    #[test]
    fn nan_serializes_as_null() {
        let mut prices = QuoteSnapshot::new();
        prices.insert("X".into(), Quote { bid: f64::NAN, ask: f64::NAN });
        let json = SnapshotMessage::new(0, prices).to_json().unwrap();
        assert!(json.contains(r#""X":{"bid":null,"ask":null}"#));
    }
}
