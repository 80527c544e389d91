//! ConfigMap Watch Controller
//!
//! Watches ConfigMaps and Pods across the cluster (or one namespace) and keeps
//! an index of which Pods reference which ConfigMaps, through volumes,
//! `envFrom` imports or single `valueFrom` lookups.
//!
//! When a ConfigMap changes, the controller reports every Pod that uses it.

mod config;
mod controller;
mod error;
mod handlers;
#[cfg(test)]
mod handlers_test;
mod informer;
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // kube's rustls-tls feature needs a process-wide crypto provider
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    info!("Starting ConfigMap Watch Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!(
        "  Kubeconfig: {}",
        config
            .kubeconfig
            .as_ref()
            .map_or_else(|| "default".to_string(), |p| p.display().to_string())
    );
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Cache sync timeout: {:?}", config.cache_sync_timeout);
    match config.resync_period {
        Some(period) => info!("  Resync period: {:?}", period),
        None => info!("  Resync period: disabled"),
    }

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
