//! NodeMCU bridge - main entry point
//!
//! Loads the bridge configuration, starts the periodic refresh of every
//! accessory and the mDNS discovery listener, then runs until interrupted.

use anyhow::Context;
use clap::Parser;
use nodemcu_bridge::{
    config::BridgeConfig,
    discovery::DiscoveryTable,
    logging::{init_logging, LogConfig},
    Accessory, ErrorReporter,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

/// NodeMCU bridge configuration
#[derive(Parser, Debug)]
#[command(name = "nodemcu-bridge")]
#[command(about = "Expose NodeMCU HTTP sensors as smart-home accessories")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Bridge configuration file (JSON)
    #[arg(short, long, env = "NODEMCU_CONFIG")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Do not start the mDNS discovery listener
    #[arg(long)]
    no_discovery: bool,
}

impl Args {
    fn log_config(&self) -> LogConfig {
        let config = LogConfig::from_env();
        if self.debug {
            config.with_level(Level::DEBUG)
        } else {
            config
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.log_config())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let config = BridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Loading {}", args.config.display()))?;
    config.validate()?;

    info!(
        accessories = config.accessories.len(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting NodeMCU bridge"
    );

    let mut accessories = Vec::new();
    let mut timers = Vec::new();
    for accessory_config in config.accessories.iter().cloned() {
        match Accessory::from_config(accessory_config) {
            Ok(accessory) => {
                timers.extend(accessory.start_polling());
                accessories.push(accessory);
            }
            Err(error) => ErrorReporter::log_error(&error, "main", "accessory_setup"),
        }
    }

    let table = Arc::new(DiscoveryTable::new());
    let discovery = if config.discovery.enabled && !args.no_discovery {
        start_discovery(&config, Arc::clone(&table))
    } else {
        info!("mDNS discovery disabled");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    for timer in &timers {
        timer.abort();
    }
    futures::future::join_all(timers).await;
    stop_discovery(discovery);

    for device in table.snapshot().await {
        info!(
            device = %device.name,
            port = device.port,
            address = device.address.as_deref().unwrap_or("-"),
            "Known device"
        );
    }
    drop(accessories);

    Ok(())
}

#[cfg(feature = "discovery")]
type DiscoveryHandle = (
    nodemcu_bridge::discovery::MdnsDiscovery,
    tokio::task::JoinHandle<()>,
);

#[cfg(not(feature = "discovery"))]
type DiscoveryHandle = ();

#[cfg(feature = "discovery")]
fn start_discovery(config: &BridgeConfig, table: Arc<DiscoveryTable>) -> Option<DiscoveryHandle> {
    use nodemcu_bridge::discovery::MdnsDiscovery;

    let started = MdnsDiscovery::new(&config.discovery)
        .and_then(|discovery| discovery.spawn(table).map(|task| (discovery, task)));

    match started {
        Ok(handle) => Some(handle),
        Err(error) => {
            ErrorReporter::log_error(&error, "main", "start_discovery");
            None
        }
    }
}

#[cfg(not(feature = "discovery"))]
fn start_discovery(_config: &BridgeConfig, _table: Arc<DiscoveryTable>) -> Option<DiscoveryHandle> {
    warn!("Built without the discovery feature, mDNS listener not started");
    None
}

#[cfg(feature = "discovery")]
fn stop_discovery(handle: Option<DiscoveryHandle>) {
    if let Some((discovery, task)) = handle {
        task.abort();
        if let Err(error) = discovery.shutdown() {
            warn!(error = %error, "mDNS daemon did not shut down cleanly");
        }
    }
}

#[cfg(not(feature = "discovery"))]
fn stop_discovery(_handle: Option<DiscoveryHandle>) {}
