//! Drift detection between an Application and its observed Deployment.
//!
//! Only the image of the first container is compared. Every other field of
//! the live Deployment (replicas, labels, extra containers) belongs to
//! whoever changed it and is left alone.

use super::workload;
use crds::Application;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Container;

/// Result of comparing desired and observed workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadDiff {
    /// Observed Deployment already runs the desired image
    Equal,
    /// First container runs a different image, or there is no container
    ImageDiverged { observed: Option<String> },
}

pub fn diff(app: &Application, deployment: &Deployment) -> WorkloadDiff {
    let observed = primary_container(deployment).and_then(|c| c.image.as_deref());
    if observed == Some(app.spec.image.as_str()) {
        WorkloadDiff::Equal
    } else {
        WorkloadDiff::ImageDiverged {
            observed: observed.map(str::to_string),
        }
    }
}

/// Bring `deployment` in line with `app`, touching only the first container's image.
///
/// A Deployment stripped of its containers gets the synthesized container back.
pub fn apply(app: &Application, deployment: &mut Deployment) {
    let pod_spec = deployment
        .spec
        .get_or_insert_with(Default::default)
        .template
        .spec
        .get_or_insert_with(Default::default);

    match pod_spec.containers.first_mut() {
        Some(container) => container.image = Some(app.spec.image.clone()),
        None => {
            let name = app.metadata.name.clone().unwrap_or_default();
            pod_spec.containers.push(workload::container(app, &name));
        }
    }
}

fn primary_container(deployment: &Deployment) -> Option<&Container> {
    deployment.spec.as_ref()?.template.spec.as_ref()?.containers.first()
}
