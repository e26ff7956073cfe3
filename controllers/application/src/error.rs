//! Controller-specific error types.
//!
//! This module defines the errors surfaced by the Application Controller.
//! Store failures are carried through unmodified so the watcher's error
//! policy and logs see the original API status.

use crate::store::StoreError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Application Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Resource store operation failed
    #[error("Resource store error: {0}")]
    Store(#[from] StoreError),

    /// Kubernetes client error outside the resource store (client setup)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Object is missing metadata required to reconcile it
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// HTTP server (probes, metrics, admission) failed
    #[error("HTTP server error: {0}")]
    Server(String),

    /// Metrics registration or encoding failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
