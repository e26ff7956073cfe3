//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

#[cfg(test)]
use crate::reconciler::{RESYNC_INTERVAL, Reconciler};
#[cfg(test)]
use crate::store::ObjectKey;
#[cfg(test)]
use crate::store::mock::MockStore;
#[cfg(test)]
use crds::{Application, ApplicationSpec};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Helper to create a test Application without uid (not yet persisted)
#[cfg(test)]
pub fn create_test_application(name: &str, namespace: &str, enabled: bool, image: &str) -> Application {
    Application {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: ApplicationSpec {
            enabled,
            image: image.to_string(),
        },
        status: None,
    }
}

/// Helper to create a test Application carrying a uid
#[cfg(test)]
pub fn create_test_application_with_uid(
    name: &str,
    namespace: &str,
    enabled: bool,
    image: &str,
    uid: &str,
) -> Application {
    let mut app = create_test_application(name, namespace, enabled, image);
    app.metadata.uid = Some(uid.to_string());
    app
}

/// Helper to create a reconciler over a mock store with the default resync interval
#[cfg(test)]
pub fn create_test_reconciler(store: &MockStore) -> Reconciler {
    Reconciler::new(store.clone(), RESYNC_INTERVAL)
}

#[cfg(test)]
pub fn test_key(name: &str) -> ObjectKey {
    ObjectKey::new("default", name)
}

/// Image of the first container of the Deployment stored under `key`
#[cfg(test)]
pub fn deployment_image(store: &MockStore, key: &ObjectKey) -> Option<String> {
    store
        .deployment(key)?
        .spec?
        .template
        .spec?
        .containers
        .first()?
        .image
        .clone()
}
