//! Single upstream WebSocket connection with auto-reconnect.
//!
//! Each `WsConnection` runs as a tokio task that:
//! 1. Connects to the upstream WebSocket endpoint (TLS for `wss://`).
//! 2. Sends the subscription message.
//! 3. Reads text frames and hands them to a callback.
//! 4. On any failure, waits the reconnect delay and starts again from 1.
//!
//! The task never gives up; only [`WsConnection::stop`] ends it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{
    Message,
    client::IntoClientRequest,
    http::{HeaderName, HeaderValue},
};
use tracing::{debug, error, info, warn};

use crate::config::DecodeErrorPolicy;
use crate::error::RelayError;

/// Callback invoked for each received text frame.
///
/// Returning [`RelayError::UpstreamDecode`] lets the connection apply its
/// decode-error policy; any other error drops the connection.
pub type OnMessageCallback = Arc<dyn Fn(&str) -> Result<(), RelayError> + Send + Sync>;

/// Connection lifecycle, published on a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    /// Handshake done and subscription request sent.
    Subscribed,
    /// At least one frame received since subscribing.
    Receiving,
}

/// Delay between connection attempts.
///
/// With `max_delay == None` the delay is fixed. Otherwise it doubles after
/// every failed cycle up to `max_delay`, and resets once a frame is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Option<Duration>,
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { base_delay: delay, max_delay: None }
    }

    /// Delay to use after `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        match self.max_delay {
            Some(max) => (current * 2).min(max),
            None => self.base_delay,
        }
    }
}

/// Configuration for a single WebSocket connection.
#[derive(Debug, Clone)]
pub struct WsConnConfig {
    /// Full WebSocket URL (e.g. `wss://stream.binance.com:9443/ws`).
    pub url: String,
    /// Message sent after every successful connect (subscription request).
    pub subscribe_msg: Option<String>,
    /// Extra HTTP headers for the handshake.
    pub extra_headers: HashMap<String, String>,
    pub reconnect: ReconnectPolicy,
    pub decode_error_policy: DecodeErrorPolicy,
    /// Log prefix (e.g. `upstream`).
    pub label: String,
}

/// A single WebSocket connection managed by a background tokio task.
pub struct WsConnection {
    /// Connection configuration.
    pub config: WsConnConfig,
    /// Shutdown signal sender.
    shutdown_tx: Option<watch::Sender<bool>>,
    state_rx: Option<watch::Receiver<ConnState>>,
    /// Task join handle.
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WsConnection {
    /// Create a new (not yet started) connection.
    pub fn new(config: WsConnConfig) -> Self {
        Self { config, shutdown_tx: None, state_rx: None, task: None }
    }

    /// Start the connection task. Text frames are forwarded to `on_text`.
    pub fn start(&mut self, on_text: OnMessageCallback) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ConnState::Disconnected);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            connection_loop(config, on_text, state_tx, shutdown_rx).await;
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.state_rx = Some(state_rx);
        self.task = Some(task);
    }

    /// Current lifecycle state (`Disconnected` before `start`).
    pub fn state(&self) -> ConnState {
        self.state_rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(ConnState::Disconnected)
    }

    /// Subscribe to lifecycle changes. `None` before `start`.
    pub fn watch_state(&self) -> Option<watch::Receiver<ConnState>> {
        self.state_rx.clone()
    }

    /// Stop the connection and wait for the task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Main connection loop: connect, subscribe, read, reconnect.
async fn connection_loop(
    config: WsConnConfig,
    on_text: OnMessageCallback,
    state_tx: watch::Sender<ConnState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let label = &config.label;
    let mut delay = config.reconnect.base_delay;
    let mut attempt: u64 = 0;

    loop {
        if *shutdown_rx.borrow() {
            info!("[{label}] shutdown requested");
            break;
        }

        attempt += 1;
        state_tx.send_replace(ConnState::Connecting);
        info!("[{label}] connecting to {} (attempt {attempt})", config.url);

        let session = tokio::select! {
            res = run_session(&config, &on_text, &state_tx, &mut delay) => Some(res),
            _ = shutdown_rx.changed() => None,
        };

        state_tx.send_replace(ConnState::Disconnected);

        match session {
            None => {
                info!("[{label}] shutdown signal received");
                break;
            }
            Some(Ok(())) => warn!("[{label}] stream ended, reconnecting in {delay:?}"),
            Some(Err(e)) => error!("[{label}] {e}, reconnecting in {delay:?}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {},
            _ = shutdown_rx.changed() => {
                info!("[{label}] shutdown signal received");
                break;
            }
        }
        delay = config.reconnect.next_delay(delay);
    }
}

/// One connect-subscribe-receive cycle.
///
/// Returns `Ok(())` when the peer closes the stream cleanly and `Err` on any
/// failure. Either way the caller reconnects.
async fn run_session(
    config: &WsConnConfig,
    on_text: &OnMessageCallback,
    state_tx: &watch::Sender<ConnState>,
    delay: &mut Duration,
) -> Result<(), RelayError> {
    let label = &config.label;
    let ws_stream = connect_ws(config)
        .await
        .map_err(|e| RelayError::UpstreamConnection(format!("connection failed: {e}")))?;
    info!("[{label}] connected");

    let (mut ws_write, mut ws_read) = ws_stream.split();

    if let Some(ref sub_msg) = config.subscribe_msg {
        debug!("[{label}] subscribing: {sub_msg}");
        ws_write
            .send(Message::Text(sub_msg.clone().into()))
            .await
            .map_err(|e| RelayError::UpstreamConnection(format!("subscribe send failed: {e}")))?;
    }
    state_tx.send_replace(ConnState::Subscribed);

    while let Some(msg) = ws_read.next().await {
        let msg = msg.map_err(|e| RelayError::UpstreamConnection(format!("read error: {e}")))?;
        match msg {
            Message::Text(text) => {
                if *state_tx.borrow() != ConnState::Receiving {
                    state_tx.send_replace(ConnState::Receiving);
                    *delay = config.reconnect.base_delay;
                }
                match on_text(&text) {
                    Ok(()) => {}
                    Err(e) if e.is_decode() && config.decode_error_policy == DecodeErrorPolicy::Skip => {
                        warn!("[{label}] skipping frame: {e}");
                    }
                    Err(e) => return Err(e),
                }
            }
            Message::Ping(data) => {
                ws_write
                    .send(Message::Pong(data))
                    .await
                    .map_err(|e| RelayError::UpstreamConnection(format!("pong send failed: {e}")))?;
            }
            Message::Close(frame) => {
                warn!("[{label}] received close frame: {frame:?}");
                return Ok(());
            }
            _ => {} // Binary, Pong, raw frames
        }
    }

    Ok(())
}

/// Establish a WebSocket connection (TLS for `wss://`).
async fn connect_ws(
    config: &WsConnConfig,
) -> anyhow::Result<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
> {
    let mut request = config.url.as_str().into_client_request()?;

    for (key, value) in &config.extra_headers {
        request
            .headers_mut()
            .insert(HeaderName::from_bytes(key.as_bytes())?, HeaderValue::from_str(value)?);
    }

    let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(stream)
}
