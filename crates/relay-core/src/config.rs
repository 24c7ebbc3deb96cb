//! Configuration parsing for the quote relay.
//!
//! The runner reads a single JSON file. Every field is optional; missing
//! values fall back to the defaults of the original deployment (Binance spot
//! trade streams in, port 8085 out).
//!
//! # Example config
//!
//! ```json
//! {
//!   "module_name": "quote-relay",
//!   "log_path": "/tmp/log",
//!   "symbols": ["BTCUSDT", "ETHUSDT"],
//!   "spread": 0.001,
//!   "upstream": { "url": "wss://stream.binance.com:9443/ws", "reconnect_delay_ms": 5000 },
//!   "broadcast": { "port": 8085, "tick_interval_ms": 100 }
//! }
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::RelayError;
use crate::types::{DEFAULT_SPREAD, normalize_symbols};

/// Symbols relayed when the config does not name any.
pub const DEFAULT_SYMBOLS: [&str; 15] = [
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "ADAUSDT", "DOGEUSDT", "XRPUSDT", "DOTUSDT", "UNIUSDT",
    "LTCUSDT", "LINKUSDT", "SOLUSDT", "MATICUSDT", "AVAXUSDT", "FILUSDT", "ATOMUSDT",
];

pub const DEFAULT_UPSTREAM_URL: &str = "wss://stream.binance.com:9443/ws";
pub const DEFAULT_PORT: u16 = 8085;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Used as the log file prefix.
    pub module_name: Option<String>,
    /// Directory for daily-rotating log files.
    pub log_path: Option<String>,
    /// Symbols to subscribe and relay.
    pub symbols: Option<Vec<String>>,
    /// Relative bid/ask spread applied around the last price.
    pub spread: Option<f64>,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

/// What the upstream connection does when a frame cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    /// Drop the connection and go through the reconnect cycle.
    #[default]
    Reconnect,
    /// Log the frame and keep reading on the same connection.
    Skip,
}

/// Upstream trade feed settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamConfig {
    /// WebSocket endpoint (`ws://` or `wss://`).
    pub url: Option<String>,
    /// Stream suffix appended to each lower-cased symbol (default `trade`).
    pub channel: Option<String>,
    /// Correlation id of the SUBSCRIBE request.
    pub request_id: Option<u64>,
    /// Delay before reconnecting after any failure (default 5000 ms).
    pub reconnect_delay_ms: Option<u64>,
    /// If set, the delay doubles on consecutive failures up to this cap.
    pub max_reconnect_delay_ms: Option<u64>,
    pub decode_error_policy: Option<DecodeErrorPolicy>,
    /// Extra HTTP headers for the WebSocket handshake.
    pub extra_headers: Option<HashMap<String, String>>,
}

impl UpstreamConfig {
    pub fn effective_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string())
    }

    pub fn effective_channel(&self) -> String {
        self.channel.clone().unwrap_or_else(|| "trade".to_string())
    }

    pub fn effective_request_id(&self) -> u64 {
        self.request_id.unwrap_or(1)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms.unwrap_or(5_000))
    }

    pub fn max_reconnect_delay(&self) -> Option<Duration> {
        self.max_reconnect_delay_ms.map(Duration::from_millis)
    }

    pub fn effective_decode_policy(&self) -> DecodeErrorPolicy {
        self.decode_error_policy.unwrap_or_default()
    }
}

/// Subscriber-facing listener settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastConfig {
    /// Interface to bind (default all interfaces).
    pub bind_ip: Option<String>,
    pub port: Option<u16>,
    /// Snapshot cadence per subscriber (default 100 ms).
    pub tick_interval_ms: Option<u64>,
    /// A subscriber that cannot take one tick within this window is dropped.
    pub send_timeout_ms: Option<u64>,
}

impl BroadcastConfig {
    /// Returns the socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, RelayError> {
        let ip = self.bind_ip.as_deref().unwrap_or("0.0.0.0");
        let port = self.port.unwrap_or(DEFAULT_PORT);
        format!("{ip}:{port}")
            .parse()
            .map_err(|e| RelayError::Config(format!("invalid bind address {ip}:{port}: {e}")))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.unwrap_or(100))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms.unwrap_or(1_000))
    }
}

impl AppConfig {
    /// Returns the normalized symbol list, falling back to [`DEFAULT_SYMBOLS`].
    pub fn effective_symbols(&self) -> Vec<String> {
        match &self.symbols {
            Some(list) => normalize_symbols(list),
            None => normalize_symbols(DEFAULT_SYMBOLS),
        }
    }

    pub fn effective_spread(&self) -> f64 {
        self.spread.unwrap_or(DEFAULT_SPREAD)
    }

    pub fn module_name(&self) -> String {
        self.module_name.clone().unwrap_or_else(|| "quote-relay".to_string())
    }

    /// Check the config for values the relay cannot run with.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.effective_symbols().is_empty() {
            return Err(RelayError::Config("symbol list is empty".into()));
        }

        let spread = self.effective_spread();
        if !spread.is_finite() || !(0.0..1.0).contains(&spread) {
            return Err(RelayError::Config(format!("spread must be in [0, 1), got {spread}")));
        }

        let raw_url = self.upstream.effective_url();
        let url = url::Url::parse(&raw_url)
            .map_err(|e| RelayError::Config(format!("invalid upstream url {raw_url}: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(RelayError::Config(format!(
                "upstream url must use ws:// or wss://, got {}",
                url.scheme()
            )));
        }

        if self.upstream.reconnect_delay().is_zero() {
            return Err(RelayError::Config("reconnect_delay_ms must be > 0".into()));
        }
        if let Some(max) = self.upstream.max_reconnect_delay() {
            if max < self.upstream.reconnect_delay() {
                return Err(RelayError::Config(
                    "max_reconnect_delay_ms must be >= reconnect_delay_ms".into(),
                ));
            }
        }

        if self.broadcast.tick_interval().is_zero() {
            return Err(RelayError::Config("tick_interval_ms must be > 0".into()));
        }
        if self.broadcast.send_timeout().is_zero() {
            return Err(RelayError::Config("send_timeout_ms must be > 0".into()));
        }
        self.broadcast.bind_addr()?;

        Ok(())
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_deployment() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.effective_symbols().len(), 15);
        assert_eq!(cfg.effective_symbols()[0], "BTCUSDT");
        assert_eq!(cfg.effective_spread(), 0.001);
        assert_eq!(cfg.upstream.effective_url(), DEFAULT_UPSTREAM_URL);
        assert_eq!(cfg.upstream.effective_channel(), "trade");
        assert_eq!(cfg.upstream.effective_request_id(), 1);
        assert_eq!(cfg.upstream.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(cfg.upstream.max_reconnect_delay(), None);
        assert_eq!(cfg.upstream.effective_decode_policy(), DecodeErrorPolicy::Reconnect);
        assert_eq!(cfg.broadcast.bind_addr().unwrap(), "0.0.0.0:8085".parse().unwrap());
        assert_eq!(cfg.broadcast.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn parses_partial_json() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{
                "symbols": ["btcusdt", "ETHUSDT"],
                "upstream": { "reconnect_delay_ms": 250, "decode_error_policy": "skip" },
                "broadcast": { "port": 9000 }
            }"#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.effective_symbols(), vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(cfg.upstream.reconnect_delay(), Duration::from_millis(250));
        assert_eq!(cfg.upstream.effective_decode_policy(), DecodeErrorPolicy::Skip);
        assert_eq!(cfg.broadcast.bind_addr().unwrap().port(), 9000);
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            r#"{"symbols": []}"#,
            r#"{"spread": 1.5}"#,
            r#"{"spread": -0.1}"#,
            r#"{"upstream": {"url": "https://example.com"}}"#,
            r#"{"upstream": {"url": "not a url"}}"#,
            r#"{"upstream": {"reconnect_delay_ms": 0}}"#,
            r#"{"upstream": {"reconnect_delay_ms": 500, "max_reconnect_delay_ms": 100}}"#,
            r#"{"broadcast": {"tick_interval_ms": 0}}"#,
            r#"{"broadcast": {"bind_ip": "nowhere"}}"#,
        ];
        for json in bad {
            let cfg: AppConfig = serde_json::from_str(json).unwrap();
            assert!(matches!(cfg.validate(), Err(RelayError::Config(_))), "{json}");
        }
    }
}
