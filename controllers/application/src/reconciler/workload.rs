//! Desired Deployment synthesis.
//!
//! Builds the Deployment an enabled Application should own. The result is a
//! pure function of the Application's name, namespace, uid and image.

use crate::error::ControllerError;
use crds::Application;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Resource;
use std::collections::BTreeMap;

/// Label selecting the pods of an Application
pub const APP_LABEL: &str = "app";

/// Pull policy of the synthesized container
pub const IMAGE_PULL_POLICY: &str = "IfNotPresent";

/// Replica count of the synthesized Deployment
pub const REPLICAS: i32 = 1;

/// Build the Deployment owned by `app`.
///
/// Fails when the Application lacks a name, namespace or uid: without all
/// three the Deployment cannot be placed or carry a controller reference.
pub fn build_deployment(app: &Application) -> Result<Deployment, ControllerError> {
    let name = app
        .metadata
        .name
        .clone()
        .ok_or_else(|| ControllerError::InvalidObject("Application missing name".to_string()))?;
    let namespace = app.metadata.namespace.clone().ok_or_else(|| {
        ControllerError::InvalidObject(format!("Application {} missing namespace", name))
    })?;
    let owner = app.controller_owner_ref(&()).ok_or_else(|| {
        ControllerError::InvalidObject(format!(
            "Application {}/{} has no uid, cannot own a Deployment",
            namespace, name
        ))
    })?;

    let labels = selector_labels(&name);

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace),
            labels: Some(labels.clone()),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(REPLICAS),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container(app, &name)],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    })
}

/// The single container running the Application's image.
pub(crate) fn container(app: &Application, name: &str) -> Container {
    Container {
        name: name.to_string(),
        image: Some(app.spec.image.clone()),
        image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
        ..Default::default()
    }
}

fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), name.to_string())])
}
