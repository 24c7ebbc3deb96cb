//! # relay-fanout
//!
//! Subscriber side of the quote relay. [`SnapshotBroadcaster`] accepts
//! WebSocket subscribers and gives each one an independent [`session`] task
//! that pushes a full [`SnapshotMessage`] every tick.
//!
//! ```text
//! TcpListener ──accept──► session task (own timer, own failure domain) ──► subscriber
//!                 └─────► session task ──► subscriber
//!                 └─────► ...
//! ```
//!
//! [`SnapshotMessage`]: relay_core::types::SnapshotMessage

pub mod broadcaster;
pub mod session;

pub use broadcaster::SnapshotBroadcaster;
