//! Lifecycle trait for the long-running parts of the relay.

use anyhow::Result;
use async_trait::async_trait;

/// Implemented by the upstream connector and the snapshot broadcaster.
///
/// Only `Send` is required (not `Sync`) because services are driven
/// sequentially by the runner, never concurrently.
#[async_trait]
pub trait RelayService: Send {
    /// Human-readable service name.
    fn name(&self) -> &str;
    /// Spawn the background task(s) and return once they are running.
    async fn start(&mut self) -> Result<()>;
    /// Signal shutdown and wait for the background task(s) to finish.
    async fn stop(&mut self) -> Result<()>;
}
