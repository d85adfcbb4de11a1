//! hwshim daemon entry point.

use anyhow::{Context, Result};
use hwshim_common::HwshimConfig;
use hwshimd::{logging, Service};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = HwshimConfig::load().context("Failed to load configuration")?;
    logging::init(&config.logging.level)?;

    info!("hwshimd v{} starting", env!("CARGO_PKG_VERSION"));
    info!("Export root: {}", config.export.root.display());

    let service = Service::new(&config);
    if let Err(e) = service.run().await {
        error!("{:#}", e);
        return Err(e);
    }

    info!("Shutting down gracefully");
    Ok(())
}
