//! Symbol normalization.
//!
//! Symbols are compared in upper case (`BTCUSDT`), which is how the upstream
//! reports them in trade events. Subscription channels use the lower-case form.

/// Upper-case a symbol and strip surrounding whitespace.
#[inline]
pub fn normalize_symbol(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Normalize a symbol list, dropping empties and duplicates while keeping the
/// first-seen order.
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for s in symbols {
        let sym = normalize_symbol(s.as_ref());
        if !sym.is_empty() && !out.contains(&sym) {
            out.push(sym);
        }
    }
    out
}

/// Upstream stream name for one symbol, e.g. `btcusdt@trade`.
#[inline]
pub fn stream_name(symbol: &str, channel: &str) -> String {
    format!("{}@{channel}", symbol.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_dedups() {
        let syms = normalize_symbols([" btcusdt", "ETHUSDT", "", "BtcUsdt", "solusdt "]);
        assert_eq!(syms, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    }

    #[test]
    fn stream_names_are_lowercase() {
        assert_eq!(stream_name("DOGEUSDT", "trade"), "dogeusdt@trade");
    }
}
