//! Upstream WebSocket client with auto-reconnect.

pub mod client;

pub use client::{ConnState, OnMessageCallback, ReconnectPolicy, WsConnConfig, WsConnection};
