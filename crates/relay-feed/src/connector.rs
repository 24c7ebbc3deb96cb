//! Upstream feed connector.
//!
//! Wraps a reconnecting [`WsConnection`] subscribed to every configured
//! symbol and applies each trade to the shared [`QuoteStore`].
//!
//! ```text
//! Binance ──► WsConnection ──► parse_trade ──► QuoteStore::update
//!               │  (on failure: log, wait, reconnect, resubscribe)
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use relay_core::config::AppConfig;
use relay_core::service::RelayService;
use relay_core::store::QuoteStore;
use relay_core::ws::{ConnState, OnMessageCallback, WsConnection};
use tokio::sync::watch;
use tracing::{info, trace};

use crate::binance::{self, json_parser};

/// Keeps the quote store fed from the upstream trade stream.
///
/// The store is the only state shared with the rest of the process; the
/// connector is its single writer.
pub struct UpstreamFeedConnector {
    conn: WsConnection,
    store: Arc<QuoteStore>,
}

impl UpstreamFeedConnector {
    /// Create a connector. Nothing connects until [`RelayService::start`].
    pub fn new(config: &AppConfig, store: Arc<QuoteStore>) -> Self {
        Self { conn: WsConnection::new(binance::build_conn_config(config)), store }
    }

    /// Current upstream connection state.
    pub fn state(&self) -> ConnState {
        self.conn.state()
    }

    /// Subscribe to connection state changes. `None` before start.
    pub fn watch_state(&self) -> Option<watch::Receiver<ConnState>> {
        self.conn.watch_state()
    }

    /// Frame handler: parse, then write through to the store.
    fn on_message(store: Arc<QuoteStore>) -> OnMessageCallback {
        Arc::new(move |text: &str| {
            if let Some(tick) = json_parser::parse_trade(text)? {
                if !store.update(&tick.symbol, tick.price) {
                    trace!("[upstream] ignoring unconfigured symbol {}", tick.symbol);
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl RelayService for UpstreamFeedConnector {
    fn name(&self) -> &str {
        "upstream"
    }

    async fn start(&mut self) -> Result<()> {
        info!(
            "[upstream] starting feed for {} symbol(s) from {}",
            self.store.len(),
            self.conn.config.url
        );
        self.conn.start(Self::on_message(self.store.clone()));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.conn.stop().await;
        info!("[upstream] stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use futures_util::{SinkExt, StreamExt};
    use relay_core::config::UpstreamConfig;
    use relay_core::types::DEFAULT_SPREAD;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;

    fn config(url: String, reconnect_delay_ms: u64) -> AppConfig {
        AppConfig {
            symbols: Some(vec!["BTCUSDT".into(), "ETHUSDT".into()]),
            upstream: UpstreamConfig {
                url: Some(url),
                reconnect_delay_ms: Some(reconnect_delay_ms),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn handler_updates_store_and_ignores_noise() {
        let store = Arc::new(QuoteStore::new(["ETHUSDT"], DEFAULT_SPREAD));
        let on_msg = UpstreamFeedConnector::on_message(store.clone());

        on_msg(r#"{"result":null,"id":1}"#).unwrap();
        on_msg(r#"{"s":"PEPEUSDT","p":"0.00001"}"#).unwrap();
        on_msg(r#"{"e":"trade","s":"ETHUSDT","p":"3500.00","q":"1"}"#).unwrap();
        assert!(on_msg("{oops").unwrap_err().is_decode());

        let q = store.get("ETHUSDT").unwrap();
        assert!((q.bid - 3498.25).abs() < 1e-9);
        assert!((q.ask - 3501.75).abs() < 1e-9);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn reconnects_and_resubscribes_after_drop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let delay = Duration::from_millis(200);

        let server = tokio::spawn(async move {
            // First session: one trade, then the socket vanishes mid-stream.
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let first_sub = ws.next().await.unwrap().unwrap().into_text().unwrap().as_str().to_string();
            ws.send(Message::Text(r#"{"s":"ETHUSDT","p":"3500.00"}"#.into())).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(ws);
            let dropped_at = Instant::now();

            // Second session: the connector must come back and subscribe again.
            let (stream, _) = listener.accept().await.unwrap();
            let reconnect_gap = dropped_at.elapsed();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let second_sub = ws.next().await.unwrap().unwrap().into_text().unwrap().as_str().to_string();
            ws.send(Message::Text(r#"{"s":"BTCUSDT","p":"100"}"#.into())).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            (first_sub, second_sub, reconnect_gap)
        });

        let store = Arc::new(QuoteStore::new(["BTCUSDT", "ETHUSDT"], DEFAULT_SPREAD));
        let mut connector = UpstreamFeedConnector::new(&config(url, delay.as_millis() as u64), store.clone());
        connector.start().await.unwrap();

        let (first_sub, second_sub, gap) =
            tokio::time::timeout(Duration::from_secs(10), server).await.unwrap().unwrap();
        connector.stop().await.unwrap();

        let sub: serde_json::Value = serde_json::from_str(&first_sub).unwrap();
        assert_eq!(sub["method"], "SUBSCRIBE");
        assert_eq!(sub["params"], serde_json::json!(["btcusdt@trade", "ethusdt@trade"]));
        assert_eq!(sub["id"], 1);
        assert_eq!(first_sub, second_sub);
        assert!(gap >= delay - Duration::from_millis(20), "reconnected after {gap:?}");

        let eth = store.get("ETHUSDT").unwrap();
        assert!((eth.bid - 3498.25).abs() < 1e-9);
        let btc = store.get("BTCUSDT").unwrap();
        assert!((btc.mid() - 100.0).abs() < 1e-9);
        assert_eq!(connector.state(), ConnState::Disconnected);
    }
}
