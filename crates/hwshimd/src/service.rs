//! Daemon service: activation, status publishing, shutdown.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use hwshim_common::{ExportPort, HwshimConfig, Lifecycle, ProfileStore};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

pub struct Service {
    lifecycle: Lifecycle,
    status_path: PathBuf,
}

impl Service {
    /// Service reading the fixed system profile
    pub fn new(config: &HwshimConfig) -> Self {
        Self::with_store(config, ProfileStore::system())
    }

    pub fn with_store(config: &HwshimConfig, store: ProfileStore) -> Self {
        let port = Arc::new(ExportPort::new(&config.export.root));
        Self {
            lifecycle: Lifecycle::new(store, port),
            status_path: config.export.status_path(),
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Activate every endpoint or none
    pub fn start(&self) -> Result<()> {
        let result = self.lifecycle.activate();
        self.publish_status();
        result.context("Activation failed")
    }

    pub fn stop(&self) -> Result<()> {
        let result = self.lifecycle.deactivate();
        self.publish_status();
        result.context("Deactivation failed")
    }

    /// Start, hold the identity until `shutdown` resolves, then stop
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        self.start()?;
        info!("Virtual identity active, waiting for shutdown");

        let waited = shutdown.await;
        if let Err(e) = &waited {
            warn!("Shutdown signal error: {}", e);
        }

        self.stop()?;
        waited
    }

    /// Run until SIGINT or SIGTERM
    pub async fn run(&self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    fn publish_status(&self) {
        let report = self.lifecycle.status();
        info!("Status: {}", report.summary());
        if let Err(e) = report.save(&self.status_path) {
            warn!("Failed to write status report: {:#}", e);
        }
    }
}

async fn shutdown_signal() -> Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to wait for SIGINT")?,
        _ = terminate.recv() => {}
    }

    info!("Shutdown requested");
    Ok(())
}
