//! Synthesized bid/ask quote.

use serde::{Deserialize, Serialize};

/// Spread applied to the last traded price when none is configured (0.1%).
pub const DEFAULT_SPREAD: f64 = 0.001;

/// A bid/ask pair derived from a single last-traded price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    /// Build a quote centred on `price` with a relative `spread`.
    ///
    /// `ask - bid == price * spread`. Non-finite and negative prices are
    /// passed through unchanged.
    #[inline]
    pub fn from_last_price(price: f64, spread: f64) -> Self {
        let half = price * spread / 2.0;
        Self { bid: price - half, ask: price + half }
    }

    /// Midpoint of the quote, i.e. the price it was built from.
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_scenario() {
        let q = Quote::from_last_price(3500.0, DEFAULT_SPREAD);
        assert!((q.bid - 3498.25).abs() < 1e-9);
        assert!((q.ask - 3501.75).abs() < 1e-9);
    }

    #[test]
    fn spread_width_and_ordering() {
        for p in [0.0001, 0.5, 1.0, 42.42, 67_500.0, 1e9] {
            let q = Quote::from_last_price(p, DEFAULT_SPREAD);
            assert!(((q.ask - q.bid) - p * DEFAULT_SPREAD).abs() <= p * 1e-12);
            assert!(q.bid < p && p < q.ask, "p={p} q={q:?}");
            assert!((q.mid() - p).abs() <= p * 1e-12);
        }
    }

    #[test]
    fn nan_passes_through() {
        let q = Quote::from_last_price(f64::NAN, DEFAULT_SPREAD);
        assert!(q.bid.is_nan() && q.ask.is_nan());
    }

    #[test]
    fn zero_spread_collapses() {
        let q = Quote::from_last_price(100.0, 0.0);
        assert_eq!(q, Quote { bid: 100.0, ask: 100.0 });
    }
}
