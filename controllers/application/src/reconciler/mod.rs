//! Reconciliation logic for Application CRDs.
//!
//! One reconcile pass reads the Application fresh from the store and
//! advances it one step through its lifecycle:
//!
//! | Phase       | Finalizer | Action                                   |
//! |-------------|-----------|------------------------------------------|
//! | Active      | absent    | add finalizer, wait for the next event   |
//! | Active      | present   | sync Deployment, refresh status, requeue |
//! | Terminating | present   | remove finalizer                         |
//! | Terminating | absent    | nothing                                  |
//!
//! Cleanup of the Deployment on deletion is left to owner-reference
//! garbage collection.

mod diff;
mod status;
mod sync;
mod workload;


pub use sync::SyncOutcome;

use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::store::{ObjectKey, ResourceStore};
use crds::{APPLICATION_FINALIZER, Application};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::time::Duration;
use tracing::{debug, error, info};

/// Period after which a converged Application is reconciled again
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Lifecycle phase of an Application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No deletion timestamp; the workload is kept in sync
    Active,
    /// Deletion requested; only finalizer cleanup remains
    Terminating,
}

impl Phase {
    pub fn of(app: &Application) -> Self {
        if app.metadata.deletion_timestamp.is_some() {
            Phase::Terminating
        } else {
            Phase::Active
        }
    }
}

/// Whether this controller's finalizer is present on `app`
pub fn has_finalizer(app: &Application) -> bool {
    app.finalizers().iter().any(|f| f == APPLICATION_FINALIZER)
}

/// Reconciles Applications into Deployments.
pub struct Reconciler {
    pub(crate) store: Box<dyn ResourceStore>,
    pub(crate) metrics: Option<Metrics>,
    resync_interval: Duration,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(store: impl ResourceStore + 'static, resync_interval: Duration) -> Self {
        Self {
            store: Box::new(store),
            metrics: None,
            resync_interval,
        }
    }

    /// Record workload sync outcomes in `metrics`.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Reconciles the Application identified by `key`.
    ///
    /// A vanished Application is not an error. Store failures are returned
    /// unchanged for the caller's retry policy.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Action, ControllerError> {
        debug!("Reconciling Application {}", key);

        let mut app = match self.store.get_application(key).await {
            Ok(app) => app,
            Err(e) if e.is_not_found() => {
                debug!("Application {} no longer exists", key);
                return Ok(Action::await_change());
            }
            Err(e) => {
                error!("Failed to fetch Application {}: {}", key, e);
                return Err(e.into());
            }
        };

        match (Phase::of(&app), has_finalizer(&app)) {
            (Phase::Active, false) => {
                app.finalizers_mut().push(APPLICATION_FINALIZER.to_string());
                self.store.update_application(&app).await?;
                info!("Added finalizer to Application {}", key);
                // The update itself triggers the next pass
                Ok(Action::await_change())
            }
            (Phase::Active, true) => {
                let outcome = self.sync_workload(&app, key).await?;
                self.refresh_status(&app, key).await?;
                debug!(
                    "Application {} reconciled (workload {}), requeue in {}s",
                    key,
                    outcome.as_str(),
                    self.resync_interval.as_secs()
                );
                Ok(Action::requeue(self.resync_interval))
            }
            (Phase::Terminating, true) => {
                app.finalizers_mut().retain(|f| f != APPLICATION_FINALIZER);
                self.store.update_application(&app).await?;
                info!("Removed finalizer from Application {}", key);
                Ok(Action::await_change())
            }
            (Phase::Terminating, false) => {
                debug!("Application {} is terminating, nothing to do", key);
                Ok(Action::await_change())
            }
        }
    }
}
