//! Shared symbol → quote cache.
//!
//! The symbol set is fixed at construction. Lookups go through an immutable
//! `ahash` index into a quote vector guarded by a `parking_lot::RwLock`:
//!
//! - `update()` holds the write lock for exactly one entry,
//! - `snapshot()` holds the read lock while copying every entry.
//!
//! A snapshot therefore never observes a half-written quote, while different
//! symbols may come from different upstream messages (last-write-wins).

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::types::{Quote, QuoteSnapshot, normalize_symbols};

/// Thread-safe quote cache for a fixed set of symbols.
#[derive(Debug)]
pub struct QuoteStore {
    symbols: Vec<String>,
    index: AHashMap<String, usize>,
    quotes: RwLock<Vec<Quote>>,
    spread: f64,
}

impl QuoteStore {
    /// Create a store with every symbol at `{bid: 0, ask: 0}`.
    ///
    /// Symbols are upper-cased and de-duplicated.
    pub fn new<I, S>(symbols: I, spread: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = normalize_symbols(symbols);
        let index = symbols.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();
        let quotes = RwLock::new(vec![Quote::default(); symbols.len()]);
        Self { symbols, index, quotes, spread }
    }

    /// Apply a last-traded price to `symbol`.
    ///
    /// Returns `false` (and changes nothing) if the symbol is not configured.
    /// The price is not validated.
    #[inline]
    pub fn update(&self, symbol: &str, last_price: f64) -> bool {
        let Some(&idx) = self.index.get(symbol) else {
            return false;
        };
        let quote = Quote::from_last_price(last_price, self.spread);
        self.quotes.write()[idx] = quote;
        true
    }

    /// Independent copy of every configured symbol's current quote.
    pub fn snapshot(&self) -> QuoteSnapshot {
        let quotes = self.quotes.read();
        self.symbols.iter().cloned().zip(quotes.iter().copied()).collect()
    }

    /// Current quote for one symbol.
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        let idx = *self.index.get(symbol)?;
        Some(self.quotes.read()[idx])
    }

    /// Configured symbols in configuration order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }
}
