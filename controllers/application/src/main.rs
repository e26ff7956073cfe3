//! Application Controller
//!
//! Reconciles `Application` CRDs into single-container Deployments:
//! - enabled Applications get a Deployment running the declared image
//! - disabled Applications have their Deployment removed
//! - `status.ready` mirrors whether the Deployment has ready replicas
//!
//! Also serves probes, Prometheus metrics and a validating admission
//! webhook that rejects malformed image references.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod server;
mod store;
mod test_utils;
mod watcher;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Application Controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  HTTP address: {}", config.http_addr);
    info!("  Concurrency: {}", config.concurrency);
    info!("  Debounce: {}ms", config.debounce.as_millis());

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
