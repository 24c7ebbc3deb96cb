//! # relay-feed
//!
//! Upstream side of the quote relay: keeps a live connection to the Binance
//! trade stream and writes every trade into the shared [`QuoteStore`].
//!
//! - [`connector`]: `UpstreamFeedConnector`, the [`RelayService`] wrapper
//! - [`binance`]: subscription builder and trade-event parser
//! - [`json_util`]: JSON parsing helpers
//!
//! [`QuoteStore`]: relay_core::store::QuoteStore
//! [`RelayService`]: relay_core::service::RelayService

pub mod binance;
pub mod connector;
pub mod json_util;

pub use connector::UpstreamFeedConnector;
