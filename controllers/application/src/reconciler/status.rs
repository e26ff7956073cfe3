//! Status mirroring from the owned Deployment onto the Application.

use super::Reconciler;
use crate::error::ControllerError;
use crate::store::ObjectKey;
use crds::{Application, ApplicationStatus};
use k8s_openapi::api::apps::v1::Deployment;
use tracing::{debug, error, info};

/// Status an Application should report given its observed Deployment.
///
/// Ready means the Deployment exists and reports at least one ready replica.
pub fn observed_status(deployment: Option<&Deployment>) -> ApplicationStatus {
    let ready = deployment
        .and_then(|d| d.status.as_ref())
        .and_then(|s| s.ready_replicas)
        .is_some_and(|replicas| replicas > 0);

    ApplicationStatus { ready }
}

/// Check whether the stored status differs from the desired one.
///
/// Skipping unchanged writes keeps status updates from waking the watch
/// and triggering another reconcile.
pub fn status_needs_update(current: Option<&ApplicationStatus>, desired: &ApplicationStatus) -> bool {
    current != Some(desired)
}

impl Reconciler {
    /// Mirror Deployment readiness into the Application status.
    ///
    /// Returns whether a status write was issued.
    pub(crate) async fn refresh_status(
        &self,
        app: &Application,
        key: &ObjectKey,
    ) -> Result<bool, ControllerError> {
        let deployment = match self.store.get_deployment(key).await {
            Ok(deployment) => Some(deployment),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                error!("Failed to fetch Deployment {} for status: {}", key, e);
                return Err(e.into());
            }
        };

        let desired = observed_status(deployment.as_ref());
        if !status_needs_update(app.status.as_ref(), &desired) {
            debug!("Application {} status unchanged (ready={})", key, desired.ready);
            return Ok(false);
        }

        self.store.update_application_status(key, &desired).await?;
        info!("Updated Application {} status: ready={}", key, desired.ready);
        Ok(true)
    }
}
