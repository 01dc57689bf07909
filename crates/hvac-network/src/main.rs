//! HVAC Network
//!
//! Builds the BACnet network topology for a building, commissions every
//! piece of equipment onto it and prints the result.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hvac_network::config::NetworkConfig;
use hvac_network::{
    BuildingStructure, DeviceRegistrar, IdentityAllocator, RouterConfig, TopologyBuilder,
    VirtualStack, commission_building,
};

const DEFAULT_LOG_FILTER: &str = "hvac_network=info";

/// HVAC BACnet network topology builder
#[derive(Parser, Debug)]
#[command(name = "hvac-network")]
#[command(about = "Build and commission a building's BACnet networks", long_about = None)]
struct Args {
    /// Path to the building structure (.json or .toml)
    #[arg(short, long)]
    building: PathBuf,

    /// Path to the network configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Router address in CIDR notation (overrides config and environment)
    #[arg(long)]
    router_ip: Option<String>,

    /// Print the topology summary as JSON instead of the report
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NetworkConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => NetworkConfig::default(),
    };
    config.apply_env();
    if let Some(ip) = &args.router_ip {
        config.router.ip_address = Some(ip.clone());
    }

    let default_filter = config
        .logging
        .filter
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HVAC network v{}", env!("CARGO_PKG_VERSION"));

    let structure = BuildingStructure::load(&args.building)
        .await
        .with_context(|| format!("Failed to load building from {}", args.building.display()))?;

    info!("Creating routed BACnet network topology...");
    let registry = Arc::new(TopologyBuilder::new().build(&structure)?);
    let registrar = DeviceRegistrar::new(Arc::clone(&registry), Arc::new(IdentityAllocator::new()));
    let stack = Arc::new(VirtualStack::new());

    let report = commission_building(&structure, &registrar, stack).await?;
    for skipped in &report.skipped {
        warn!("Skipped {} ({}): {}", skipped.name, skipped.kind, skipped.reason);
    }

    let router = match config.router.options() {
        Some(options) => Some(RouterConfig::build(&registry, &options)?),
        None => {
            info!("No router address configured, skipping router");
            None
        }
    };

    if args.json {
        let output = serde_json::json!({
            "building": structure.building_name(),
            "summary": registry.summary(),
            "router": router.as_ref().map(RouterConfig::to_json),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", registry.report());
    }

    Ok(())
}
