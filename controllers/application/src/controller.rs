//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the resource
//! store, reconciler, watcher and HTTP server together and runs them.

use crate::backoff::ErrorBackoff;
use crate::config::Config;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::{RESYNC_INTERVAL, Reconciler};
use crate::server::{self, ServerState};
use crate::store::KubeStore;
use crate::watcher::{Context, Watcher};
use crds::Application;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for Application management.
pub struct Controller {
    application_watcher: JoinHandle<Result<(), ControllerError>>,
    http_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing Application Controller");

        let kube_client = Client::try_default().await?;
        let metrics = Metrics::new()?;

        let (application_api, deployment_api): (Api<Application>, Api<Deployment>) =
            match config.namespace.as_deref() {
                Some(ns) => (
                    Api::namespaced(kube_client.clone(), ns),
                    Api::namespaced(kube_client.clone(), ns),
                ),
                None => (Api::all(kube_client.clone()), Api::all(kube_client.clone())),
            };

        let reconciler = Reconciler::new(KubeStore::new(kube_client), RESYNC_INTERVAL)
            .with_metrics(metrics.clone());
        let context = Arc::new(Context {
            reconciler,
            backoff: ErrorBackoff::default(),
            metrics: metrics.clone(),
        });

        let watcher = Watcher::new(
            context,
            application_api,
            deployment_api,
            config.concurrency,
            config.debounce,
        );

        let application_watcher = tokio::spawn(watcher.watch_applications());
        let http_server = tokio::spawn(server::serve(config.http_addr, ServerState::new(metrics)));

        Ok(Self {
            application_watcher,
            http_server,
        })
    }

    /// Runs the controller until shutdown.
    ///
    /// Returns when the watcher stops after a termination signal, or with an
    /// error when either task fails.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Application Controller running");

        tokio::select! {
            result = &mut self.application_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Application watcher panicked: {}", e)))??;
            }
            result = &mut self.http_server => {
                result.map_err(|e| ControllerError::Server(format!("HTTP server panicked: {}", e)))??;
                return Err(ControllerError::Server("HTTP server exited unexpectedly".to_string()));
            }
        }

        self.http_server.abort();
        info!("Application Controller stopped");
        Ok(())
    }
}
