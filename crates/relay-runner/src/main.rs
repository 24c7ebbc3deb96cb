//! # relay-runner
//!
//! Main entry point for the quote relay.
//!
//! Loads an optional JSON configuration file, builds the shared quote store,
//! starts the upstream feed connector and the snapshot broadcaster, and runs
//! until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! relay-runner config.json --log-level info
//! relay-runner --port 9000 --symbols BTCUSDT,ETHUSDT --json-logs
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use relay_core::config::{AppConfig, load_config};
use relay_core::logging::{LogFormat, init_logging};
use relay_core::service::RelayService;
use relay_core::store::QuoteStore;
use relay_fanout::SnapshotBroadcaster;
use relay_feed::UpstreamFeedConnector;
use tracing::{error, info};

/// Crypto quote relay: Binance trades in, bid/ask snapshots out.
#[derive(Parser)]
#[command(name = "relay-runner", about = "Crypto quote relay: Binance trades in, bid/ask snapshots out")]
struct Cli {
    /// Configuration file path (JSON). Defaults apply when omitted.
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    /// Emit console logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Override the subscriber listening port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the symbol list (comma separated).
    #[arg(long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides.
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AppConfig::default(),
        };
        if let Some(port) = self.port {
            config.broadcast.port = Some(port);
        }
        if let Some(symbols) = &self.symbols {
            config.symbols = Some(symbols.clone());
        }
        if self.log_dir.is_some() {
            config.log_path = self.log_dir.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    // 1. Initialize logging
    let format = if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty };
    init_logging(&cli.log_level, config.log_path.as_deref(), &config.module_name(), format);

    let symbols = config.effective_symbols();
    info!(
        "relay starting: config={}, {} symbol(s): {}",
        cli.config.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<defaults>".into()),
        symbols.len(),
        symbols.join(", "),
    );

    // 2. Shared state, owned here and handed to both services
    let store = Arc::new(QuoteStore::new(&symbols, config.effective_spread()));

    // 3. Start services
    let mut services: Vec<Box<dyn RelayService>> = vec![
        Box::new(UpstreamFeedConnector::new(&config, store.clone())),
        Box::new(SnapshotBroadcaster::new(&config, store.clone())?),
    ];

    for service in &mut services {
        service.start().await?;
        info!("service '{}' started", service.name());
    }

    info!("all {} service(s) started, press Ctrl+C to stop", services.len());

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 5. Stop in reverse order: subscribers first, then the feed
    for service in services.iter_mut().rev() {
        info!("stopping service '{}'", service.name());
        if let Err(e) = service.stop().await {
            error!("error stopping '{}': {e}", service.name());
        }
    }

    info!("all services stopped, goodbye");
    Ok(())
}
