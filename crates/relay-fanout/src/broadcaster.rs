//! Snapshot broadcaster: accept loop plus one session task per subscriber.
//!
//! Sessions share nothing but the read side of the [`QuoteStore`], so a slow
//! or dead subscriber only ever stalls its own task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use relay_core::config::AppConfig;
use relay_core::error::RelayError;
use relay_core::service::RelayService;
use relay_core::store::QuoteStore;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::session::{self, SessionConfig, SubscriberGuard};

/// Pushes the full quote snapshot to every connected subscriber each tick.
pub struct SnapshotBroadcaster {
    bind_addr: SocketAddr,
    session: SessionConfig,
    store: Arc<QuoteStore>,
    subscribers: Arc<AtomicUsize>,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl SnapshotBroadcaster {
    /// Create a broadcaster from the `broadcast` section of the config.
    ///
    /// The listener is not bound until [`RelayService::start`].
    pub fn new(config: &AppConfig, store: Arc<QuoteStore>) -> Result<Self, RelayError> {
        Ok(Self {
            bind_addr: config.broadcast.bind_addr()?,
            session: SessionConfig {
                tick_interval: config.broadcast.tick_interval(),
                send_timeout: config.broadcast.send_timeout(),
            },
            store,
            subscribers: Arc::new(AtomicUsize::new(0)),
            local_addr: None,
            shutdown_tx: None,
            task: None,
        })
    }

    /// Address actually bound (resolves port 0). `None` before start.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of subscribers with a live session.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayService for SnapshotBroadcaster {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn start(&mut self) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| RelayError::Bind(format!("{}: {e}", self.bind_addr)))?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let store = self.store.clone();
        let subscribers = self.subscribers.clone();
        let session_config = self.session;

        info!("[fanout] listening on {local_addr}, tick {:?}", session_config.tick_interval);

        self.task = Some(tokio::spawn(async move {
            accept_loop(listener, store, session_config, subscribers, shutdown_rx).await;
        }));
        self.shutdown_tx = Some(shutdown_tx);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("[fanout] stopped");
        Ok(())
    }
}

/// Accept subscribers until shutdown, then wait for their sessions to close.
async fn accept_loop(
    listener: TcpListener,
    store: Arc<QuoteStore>,
    config: SessionConfig,
    subscribers: Arc<AtomicUsize>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let _ = stream.set_nodelay(true);
                    let guard = SubscriberGuard::new(subscribers.clone());
                    sessions.spawn(session::run(stream, peer, store.clone(), config, shutdown_rx.clone(), guard));
                }
                Err(e) => error!("[fanout] accept error: {e}"),
            },

            // Reap finished sessions so the set does not grow unbounded.
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
        }
    }

    drop(listener);
    info!("[fanout] closing {} session(s)", sessions.len());
    while sessions.join_next().await.is_some() {}
}
