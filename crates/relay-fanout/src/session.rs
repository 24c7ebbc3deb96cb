//! One subscriber connection.
//!
//! The session owns the socket for its whole life: it sends a snapshot right
//! away and then once per tick, and ends on the first failed or timed-out
//! send, on a close frame, or on shutdown. The socket is closed on every exit
//! path and the subscriber gauge is decremented by [`SubscriberGuard`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use relay_core::error::RelayError;
use relay_core::store::QuoteStore;
use relay_core::time_util::MonotonicMs;
use relay_core::types::SnapshotMessage;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Timing knobs shared by all sessions.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    pub send_timeout: Duration,
}

/// Counts live sessions; decrements on drop.
pub struct SubscriberGuard {
    count: Arc<AtomicUsize>,
}

impl SubscriberGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self { count }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Build the message for the current tick.
pub fn build_snapshot(store: &QuoteStore, clock: &mut MonotonicMs) -> SnapshotMessage {
    SnapshotMessage::new(clock.next(), store.snapshot())
}

/// Handshake with a freshly accepted TCP stream and run the tick loop until
/// the subscriber goes away or shutdown is signalled.
pub async fn run(
    stream: TcpStream,
    peer: SocketAddr,
    store: Arc<QuoteStore>,
    config: SessionConfig,
    mut shutdown_rx: watch::Receiver<bool>,
    _guard: SubscriberGuard,
) {
    let ws_stream = match tokio::time::timeout(config.send_timeout, tokio_tungstenite::accept_async(stream)).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            warn!("[sub {peer}] handshake failed: {e}");
            return;
        }
        Err(_) => {
            warn!("[sub {peer}] handshake timed out");
            return;
        }
    };
    info!("[sub {peer}] connected");

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut clock = MonotonicMs::new();
    let mut sent: u64 = 0;

    let reason = loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break "shutdown".to_string(),

            _ = ticker.tick() => {
                let msg = build_snapshot(&store, &mut clock);
                if let Err(e) = send_snapshot(&mut ws_write, &msg, config.send_timeout).await {
                    break e.to_string();
                }
                sent += 1;
            }

            incoming = ws_read.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break "closed by subscriber".to_string(),
                Some(Err(e)) => break format!("read error: {e}"),
                // Pings are answered by tungstenite on the next write.
                Some(Ok(other)) => debug!("[sub {peer}] ignoring inbound {} byte frame", other.len()),
            },
        }
    };

    let _ = ws_write.close().await;
    info!("[sub {peer}] disconnected after {sent} snapshot(s): {reason}");
}

/// Serialize and send one snapshot, bounded by `timeout`.
async fn send_snapshot<S>(sink: &mut S, msg: &SnapshotMessage, timeout: Duration) -> Result<(), RelayError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = msg.to_json().map_err(|e| RelayError::SubscriberSend(format!("encode failed: {e}")))?;
    match tokio::time::timeout(timeout, sink.send(Message::Text(json.into()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(RelayError::SubscriberSend(e.to_string())),
        Err(_) => Err(RelayError::SubscriberSend(format!("send timed out after {timeout:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use relay_core::types::DEFAULT_SPREAD;

    use super::*;

    #[test]
    fn guard_tracks_live_sessions() {
        let count = Arc::new(AtomicUsize::new(0));
        let a = SubscriberGuard::new(count.clone());
        let b = SubscriberGuard::new(count.clone());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        drop(a);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        drop(b);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn snapshot_mirrors_store() {
        let store = QuoteStore::new(["BTCUSDT", "ETHUSDT"], DEFAULT_SPREAD);
        store.update("ETHUSDT", 3500.0);
        let mut clock = MonotonicMs::new();

        let first = build_snapshot(&store, &mut clock);
        let second = build_snapshot(&store, &mut clock);
        assert_eq!(first.prices, store.snapshot());
        assert_eq!(first.prices.len(), 2);
        assert!(second.timestamp >= first.timestamp);
    }

    /// Sink that is either permanently broken or never ready.
    struct TestSink {
        broken: bool,
    }

    impl Sink<Message> for TestSink {
        type Error = String;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            if self.broken { Poll::Ready(Err("connection reset".into())) } else { Poll::Pending }
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), String> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), String>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn send_failure_is_subscriber_error() {
        let mut sink = TestSink { broken: true };
        let msg = SnapshotMessage::new(0, Default::default());
        let err = send_snapshot(&mut sink, &msg, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RelayError::SubscriberSend(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn stalled_sink_times_out() {
        let mut sink = TestSink { broken: false };
        let msg = SnapshotMessage::new(0, Default::default());
        let err = send_snapshot(&mut sink, &msg, Duration::from_millis(50)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
