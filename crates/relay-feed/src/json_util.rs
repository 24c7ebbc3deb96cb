//! JSON parsing helpers for upstream frames.

/// Parse a JSON value (string or number) as `f64`.
///
/// Exchanges encode prices as JSON strings (`"30000.5"`); native numbers are
/// accepted too. Returns `None` for anything else or an unparseable string.
#[inline]
pub fn parse_str_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        fast_float2::parse(s.trim()).ok()
    } else {
        v.as_f64()
    }
}

/// Parse a named field on a JSON object as `f64` (string or number).
#[inline]
pub fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    parse_str_f64(v.get(key))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_and_number_prices() {
        let v = json!({"a": "3500.00", "b": 12.5, "c": " 7 ", "d": "abc", "e": true});
        assert_eq!(parse_f64_field(&v, "a"), Some(3500.0));
        assert_eq!(parse_f64_field(&v, "b"), Some(12.5));
        assert_eq!(parse_f64_field(&v, "c"), Some(7.0));
        assert_eq!(parse_f64_field(&v, "d"), None);
        assert_eq!(parse_f64_field(&v, "e"), None);
        assert_eq!(parse_f64_field(&v, "missing"), None);
    }
}
