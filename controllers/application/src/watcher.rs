//! Kubernetes resource watchers.
//!
//! Drives the reconciler from a `kube_runtime::Controller` watching
//! Applications and the Deployments they own. Deployment events map back to
//! the owning Application through the controller owner reference.

use crate::backoff::ErrorBackoff;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::store::ObjectKey;
use crds::Application;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Api;
use kube_runtime::{
    Controller, watcher,
    controller::{Action, Config as ControllerConfig},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// State handed to every reconcile and error-policy call.
pub struct Context {
    pub reconciler: Reconciler,
    pub backoff: ErrorBackoff,
    pub metrics: Metrics,
}

async fn reconcile(app: Arc<Application>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = ObjectKey::from_resource(app.as_ref()).ok_or_else(|| {
        ControllerError::InvalidObject("Application event without name or namespace".to_string())
    })?;

    let started = Instant::now();
    let result = ctx.reconciler.reconcile(&key).await;
    ctx.metrics.record_reconcile(result.is_ok(), started.elapsed());

    if result.is_ok() {
        ctx.backoff.reset(&key);
    }
    result
}

fn error_policy(app: Arc<Application>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let delay = match ObjectKey::from_resource(app.as_ref()) {
        Some(key) => {
            let delay = ctx.backoff.next_delay(&key);
            warn!(
                "Reconciliation of Application {} failed: {} (retrying in {}s)",
                key,
                error,
                delay.as_secs()
            );
            delay
        }
        None => {
            error!("Reconciliation failed for unnamed Application: {}", error);
            crate::backoff::DEFAULT_MAX_BACKOFF
        }
    };
    Action::requeue(delay)
}

/// Watches Applications and owned Deployments.
pub struct Watcher {
    context: Arc<Context>,
    application_api: Api<Application>,
    deployment_api: Api<Deployment>,
    concurrency: u16,
    debounce: Duration,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        context: Arc<Context>,
        application_api: Api<Application>,
        deployment_api: Api<Deployment>,
        concurrency: u16,
        debounce: Duration,
    ) -> Self {
        Self {
            context,
            application_api,
            deployment_api,
            concurrency,
            debounce,
        }
    }

    /// Runs the Application controller until a shutdown signal arrives.
    ///
    /// In-flight reconciliations finish before this returns.
    pub async fn watch_applications(self) -> Result<(), ControllerError> {
        info!(
            "Starting Application watcher (concurrency {}, debounce {}ms)",
            self.concurrency,
            self.debounce.as_millis()
        );

        let controller_config = ControllerConfig::default()
            .debounce(self.debounce)
            .concurrency(self.concurrency);

        Controller::new(self.application_api, watcher::Config::default())
            .owns(self.deployment_api, watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.context)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled Application {}", obj),
                    Err(e) => warn!("Application controller error: {}", e),
                }
            })
            .await;

        info!("Application watcher stopped");
        Ok(())
    }
}
