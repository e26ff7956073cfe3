//! Application CRD
//!
//! Declares a single-container workload that the application controller
//! materializes as a `Deployment` while `enabled` is set.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Finalizer held on every `Application` until its deletion is acknowledged
pub const APPLICATION_FINALIZER: &str = "dcops.microscaler.io/application-cleanup";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "dcops.microscaler.io",
    version = "v1alpha1",
    kind = "Application",
    namespaced,
    status = "ApplicationStatus",
    shortname = "app",
    printcolumn = r#"{"name":"Enabled","type":"boolean","jsonPath":".spec.enabled"}"#,
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Whether a Deployment should exist for this Application
    #[serde(default)]
    pub enabled: bool,

    /// Container image reference (validated on admission)
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    /// True when the Deployment exists and has at least one ready replica
    #[serde(default)]
    pub ready: bool,
}
