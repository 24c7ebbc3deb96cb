//! # relay-core
//!
//! Core crate for the quote relay, providing:
//!
//! - **Types** (`types`): `Quote`, `SnapshotMessage`, symbol normalization
//! - **Quote store** (`store`): the shared symbol → quote cache
//! - **Configuration** (`config`): JSON config deserialization and validation
//! - **Error types** (`error`): domain-specific `RelayError` via thiserror
//! - **WebSocket** (`ws`): upstream WS client with auto-reconnect
//! - **Services** (`service`): lifecycle trait shared by the feed and fanout
//! - **Time utilities** (`time_util`): epoch timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod store;
pub mod time_util;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
