//! Resource store abstraction.
//!
//! The reconciler never talks to the API server directly. It goes through
//! [`ResourceStore`], which has a Kubernetes-backed implementation
//! ([`KubeStore`]) and an in-memory one for unit tests.

mod cluster;
#[cfg(test)]
pub mod mock;

pub use cluster::KubeStore;

use crds::{Application, ApplicationStatus};
use k8s_openapi::api::apps::v1::Deployment;
use kube::Resource;
use std::fmt;
use thiserror::Error;

/// Namespace + name of a namespaced object.
///
/// An `Application` and the `Deployment` it owns share the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an object, or `None` when it lacks a name or namespace.
    pub fn from_resource<K: Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Errors returned by a [`ResourceStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stale resourceVersion or object already exists (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Service account lacks permission (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// API server failed or is unreachable (HTTP 5xx)
    #[error("API server unavailable: {0}")]
    Unavailable(String),

    /// Object handed to the store lacks name or namespace
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Any other Kubernetes client error
    #[error("Kubernetes error: {0}")]
    Kube(kube::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        let api_status = match &err {
            kube::Error::Api(response) => Some((response.code, response.message.clone())),
            _ => None,
        };

        match api_status {
            Some((404, message)) => StoreError::NotFound(message),
            Some((409, message)) => StoreError::Conflict(message),
            Some((403, message)) => StoreError::Forbidden(message),
            Some((500..=599, message)) => StoreError::Unavailable(message),
            _ => StoreError::Kube(err),
        }
    }
}

/// Read and write access to Applications and their Deployments.
///
/// Object-valued writes key off the object's own metadata and return the
/// stored result. Updates carry the caller's resourceVersion, so a stale
/// write fails with [`StoreError::Conflict`].
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_application(&self, key: &ObjectKey) -> Result<Application, StoreError>;

    /// Replace the Application (metadata and spec; status is ignored).
    async fn update_application(&self, app: &Application) -> Result<Application, StoreError>;

    /// Write only the status subresource.
    async fn update_application_status(
        &self,
        key: &ObjectKey,
        status: &ApplicationStatus,
    ) -> Result<(), StoreError>;

    async fn get_deployment(&self, key: &ObjectKey) -> Result<Deployment, StoreError>;

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError>;

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError>;

    async fn delete_deployment(&self, key: &ObjectKey) -> Result<(), StoreError>;
}

/// Key of an object about to be written, as a store error when incomplete.
pub(crate) fn write_key<K: Resource>(obj: &K, kind: &str) -> Result<ObjectKey, StoreError> {
    ObjectKey::from_resource(obj).ok_or_else(|| {
        StoreError::InvalidObject(format!("{} is missing name or namespace", kind))
    })
}
