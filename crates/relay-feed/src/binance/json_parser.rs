//! Binance JSON trade-event parser.
//!
//! Only two fields of a trade event matter to the relay:
//!
//! ```json
//! {"e":"trade","E":1672515782136,"s":"BNBBTC","t":12345,"p":"0.001","q":"100", ...}
//! ```
//!
//! `s` is the symbol and `p` the last traded price. Frames without both
//! fields (subscription acks, other event types) are not trades and are
//! ignored. A frame that is not JSON, or whose `p` is not a number, is a
//! decode error.

use relay_core::error::RelayError;

use crate::json_util::parse_str_f64;

/// Symbol and last price extracted from a trade event.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeTick {
    pub symbol: String,
    pub price: f64,
}

/// Parse one upstream text frame.
///
/// Returns `Ok(None)` for frames that carry no trade.
pub fn parse_trade(text: &str) -> Result<Option<TradeTick>, RelayError> {
    let v: serde_json::Value =
        serde_json::from_str(text).map_err(|e| RelayError::UpstreamDecode(format!("invalid json: {e}")))?;

    let (Some(sym), Some(raw_price)) = (v.get("s"), v.get("p")) else {
        return Ok(None);
    };

    let symbol = sym
        .as_str()
        .ok_or_else(|| RelayError::UpstreamDecode(format!("non-string symbol: {sym}")))?;
    let price = parse_str_f64(Some(raw_price))
        .ok_or_else(|| RelayError::UpstreamDecode(format!("bad price for {symbol}: {raw_price}")))?;

    Ok(Some(TradeTick { symbol: symbol.to_string(), price }))
}

/// Build the SUBSCRIBE request for `symbols` on `channel`.
///
/// `{"method":"SUBSCRIBE","params":["btcusdt@trade",...],"id":1}`
pub fn build_subscribe(symbols: &[String], channel: &str, id: u64) -> String {
    let params: Vec<String> = symbols.iter().map(|s| relay_core::stream_name(s, channel)).collect();
    serde_json::json!({
        "method": "SUBSCRIBE",
        "params": params,
        "id": id
    })
    .to_string()
}
