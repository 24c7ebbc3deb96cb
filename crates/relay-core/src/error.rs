//! Typed error definitions for the quote relay.
//!
//! [`RelayError`] separates the failure classes the relay recovers from in
//! different ways. All variants implement `std::error::Error` via `thiserror`,
//! so they integrate with `anyhow::Result` in the runner.

use thiserror::Error;

/// Domain-specific errors for the quote relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration parsing or validation error. Only fatal at startup.
    #[error("config error: {0}")]
    Config(String),

    /// Upstream connect, handshake or read failure. Triggers a reconnect.
    #[error("upstream connection error: {0}")]
    UpstreamConnection(String),

    /// Malformed upstream frame. Recovery depends on the decode-error policy.
    #[error("upstream decode error: {0}")]
    UpstreamDecode(String),

    /// A tick could not be delivered to one subscriber.
    #[error("subscriber send error: {0}")]
    SubscriberSend(String),

    /// The subscriber listener could not bind.
    #[error("bind error: {0}")]
    Bind(String),
}

impl RelayError {
    /// Returns `true` for errors caused by a single bad upstream frame rather
    /// than a broken connection.
    pub fn is_decode(&self) -> bool {
        matches!(self, RelayError::UpstreamDecode(_))
    }
}
