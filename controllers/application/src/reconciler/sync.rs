//! Workload synchronization.
//!
//! Drives the Deployment toward what the Application asks for: present and
//! running the declared image while enabled, absent while disabled.

use super::Reconciler;
use super::diff::{self, WorkloadDiff};
use super::workload::build_deployment;
use crate::error::ControllerError;
use crate::store::ObjectKey;
use crds::{Application, ApplicationSpec};
use tracing::{debug, error, info};

/// Whether an Application wants its Deployment to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredWorkload {
    Present,
    Absent,
}

impl From<&ApplicationSpec> for DesiredWorkload {
    fn from(spec: &ApplicationSpec) -> Self {
        if spec.enabled {
            DesiredWorkload::Present
        } else {
            DesiredWorkload::Absent
        }
    }
}

/// What a sync pass did to the Deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
    Deleted,
    /// Disabled and no Deployment to remove
    Absent,
}

impl SyncOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOutcome::Created => "created",
            SyncOutcome::Updated => "updated",
            SyncOutcome::Unchanged => "unchanged",
            SyncOutcome::Deleted => "deleted",
            SyncOutcome::Absent => "absent",
        }
    }

    /// True when the pass issued a write against the Deployment.
    pub fn wrote(self) -> bool {
        matches!(self, SyncOutcome::Created | SyncOutcome::Updated | SyncOutcome::Deleted)
    }
}

impl Reconciler {
    /// Make the Deployment match the Application's `enabled` and `image`.
    pub(crate) async fn sync_workload(
        &self,
        app: &Application,
        key: &ObjectKey,
    ) -> Result<SyncOutcome, ControllerError> {
        let outcome = match DesiredWorkload::from(&app.spec) {
            DesiredWorkload::Present => self.ensure_present(app, key).await?,
            DesiredWorkload::Absent => self.ensure_absent(key).await?,
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_sync(outcome);
        }
        Ok(outcome)
    }

    async fn ensure_present(
        &self,
        app: &Application,
        key: &ObjectKey,
    ) -> Result<SyncOutcome, ControllerError> {
        let mut deployment = match self.store.get_deployment(key).await {
            Ok(deployment) => deployment,
            Err(e) if e.is_not_found() => {
                let deployment = build_deployment(app)?;
                self.store.create_deployment(&deployment).await?;
                info!("Created Deployment {} with image {}", key, app.spec.image);
                return Ok(SyncOutcome::Created);
            }
            Err(e) => {
                error!("Failed to fetch Deployment {}: {}", key, e);
                return Err(e.into());
            }
        };

        match diff::diff(app, &deployment) {
            WorkloadDiff::Equal => {
                debug!("Deployment {} already runs {}", key, app.spec.image);
                Ok(SyncOutcome::Unchanged)
            }
            WorkloadDiff::ImageDiverged { observed } => {
                diff::apply(app, &mut deployment);
                self.store.update_deployment(&deployment).await?;
                info!(
                    "Updated Deployment {} image: {} -> {}",
                    key,
                    observed.as_deref().unwrap_or("<none>"),
                    app.spec.image
                );
                Ok(SyncOutcome::Updated)
            }
        }
    }

    async fn ensure_absent(&self, key: &ObjectKey) -> Result<SyncOutcome, ControllerError> {
        match self.store.get_deployment(key).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                debug!("Application {} disabled and Deployment absent", key);
                return Ok(SyncOutcome::Absent);
            }
            Err(e) => {
                error!("Failed to fetch Deployment {}: {}", key, e);
                return Err(e.into());
            }
        }

        match self.store.delete_deployment(key).await {
            Ok(()) => {
                info!("Deleted Deployment {} (Application disabled)", key);
                Ok(SyncOutcome::Deleted)
            }
            // Removed by someone else between the read and the delete
            Err(e) if e.is_not_found() => Ok(SyncOutcome::Absent),
            Err(e) => {
                error!("Failed to delete Deployment {}: {}", key, e);
                Err(e.into())
            }
        }
    }
}
