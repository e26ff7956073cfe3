//! In-memory resource store for unit tests
//!
//! Mimics the API server behavior the reconciler relies on: resourceVersion
//! conflicts, the status subresource being written separately, deletion held
//! back by finalizers, and garbage collection of owned Deployments.

use super::{ObjectKey, ResourceStore, StoreError, write_key};
use crds::{Application, ApplicationStatus};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Store operations, recorded in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetApplication,
    UpdateApplication,
    UpdateApplicationStatus,
    GetDeployment,
    CreateDeployment,
    UpdateDeployment,
    DeleteDeployment,
}

impl Operation {
    pub fn is_write(self) -> bool {
        !matches!(self, Operation::GetApplication | Operation::GetDeployment)
    }
}

/// Failure injected into the next call of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Conflict,
    Forbidden,
    Unavailable,
}

impl Failure {
    fn into_error(self, op: Operation) -> StoreError {
        let message = format!("injected failure for {:?}", op);
        match self {
            Failure::NotFound => StoreError::NotFound(message),
            Failure::Conflict => StoreError::Conflict(message),
            Failure::Forbidden => StoreError::Forbidden(message),
            Failure::Unavailable => StoreError::Unavailable(message),
        }
    }
}

#[derive(Default)]
struct State {
    applications: HashMap<ObjectKey, Application>,
    deployments: HashMap<ObjectKey, Deployment>,
    calls: Vec<Operation>,
    failures: HashMap<Operation, Failure>,
    resource_version: u64,
    uid: u64,
}

impl State {
    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn next_uid(&mut self) -> String {
        self.uid += 1;
        format!("uid-{}", self.uid)
    }

    fn begin(&mut self, op: Operation) -> Result<(), StoreError> {
        self.calls.push(op);
        match self.failures.remove(&op) {
            Some(failure) => Err(failure.into_error(op)),
            None => Ok(()),
        }
    }

    /// Drop a terminating Application once its finalizers are gone, along
    /// with every Deployment it owns.
    fn collect_garbage(&mut self, key: &ObjectKey) {
        let finalized = self.applications.get(key).is_some_and(|app| {
            app.metadata.deletion_timestamp.is_some()
                && app.metadata.finalizers.as_ref().is_none_or(|f| f.is_empty())
        });
        if !finalized {
            return;
        }

        if let Some(uid) = self.applications.remove(key).and_then(|app| app.metadata.uid) {
            self.deployments.retain(|_, deployment| {
                !deployment
                    .metadata
                    .owner_references
                    .iter()
                    .flatten()
                    .any(|owner| owner.uid == uid)
            });
        }
    }
}

fn not_found(kind: &str, key: &ObjectKey) -> StoreError {
    StoreError::NotFound(format!("{} {} not found", kind, key))
}

fn check_version(
    kind: &str,
    key: &ObjectKey,
    incoming: Option<&String>,
    stored: Option<&String>,
) -> Result<(), StoreError> {
    match incoming {
        Some(version) if Some(version) != stored => Err(StoreError::Conflict(format!(
            "{} {} has been modified; resourceVersion {} is stale",
            kind, key, version
        ))),
        _ => Ok(()),
    }
}

/// Mock resource store
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an Application, assigning uid and resourceVersion (for test setup)
    pub fn insert_application(&self, mut app: Application) -> Application {
        let key = ObjectKey::from_resource(&app).expect("test Application needs name and namespace");
        let mut state = self.state.lock().unwrap();
        if app.metadata.uid.is_none() {
            app.metadata.uid = Some(state.next_uid());
        }
        app.metadata.resource_version = Some(state.next_resource_version());
        state.applications.insert(key, app.clone());
        app
    }

    /// Seed a Deployment, assigning uid and resourceVersion (for test setup)
    pub fn insert_deployment(&self, mut deployment: Deployment) -> Deployment {
        let key =
            ObjectKey::from_resource(&deployment).expect("test Deployment needs name and namespace");
        let mut state = self.state.lock().unwrap();
        if deployment.metadata.uid.is_none() {
            deployment.metadata.uid = Some(state.next_uid());
        }
        deployment.metadata.resource_version = Some(state.next_resource_version());
        state.deployments.insert(key, deployment.clone());
        deployment
    }

    pub fn application(&self, key: &ObjectKey) -> Option<Application> {
        self.state.lock().unwrap().applications.get(key).cloned()
    }

    pub fn deployment(&self, key: &ObjectKey) -> Option<Deployment> {
        self.state.lock().unwrap().deployments.get(key).cloned()
    }

    /// Change an Application spec out of band, as `kubectl edit` would
    pub fn edit_application(&self, key: &ObjectKey, edit: impl FnOnce(&mut Application)) {
        let mut state = self.state.lock().unwrap();
        let version = state.next_resource_version();
        let app = state.applications.get_mut(key).expect("Application to edit must exist");
        edit(app);
        app.metadata.resource_version = Some(version);
    }

    /// Change a Deployment out of band, as another actor would
    pub fn edit_deployment(&self, key: &ObjectKey, edit: impl FnOnce(&mut Deployment)) {
        let mut state = self.state.lock().unwrap();
        let version = state.next_resource_version();
        let deployment = state.deployments.get_mut(key).expect("Deployment to edit must exist");
        edit(deployment);
        deployment.metadata.resource_version = Some(version);
    }

    /// Report `ready` ready replicas on a Deployment, as the deployment controller would
    pub fn set_ready_replicas(&self, key: &ObjectKey, ready: i32) {
        self.edit_deployment(key, |deployment| {
            deployment.status = Some(DeploymentStatus {
                ready_replicas: Some(ready),
                ..Default::default()
            });
        });
    }

    /// Mark an Application for deletion; it disappears once no finalizers remain
    pub fn request_deletion(&self, key: &ObjectKey) {
        let timestamp: Time = serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z"))
            .expect("valid RFC 3339 timestamp");
        let mut state = self.state.lock().unwrap();
        let version = state.next_resource_version();
        let app = state.applications.get_mut(key).expect("Application to delete must exist");
        app.metadata.deletion_timestamp = Some(timestamp);
        app.metadata.resource_version = Some(version);
        state.collect_garbage(key);
    }

    /// Make the next call of `op` fail
    pub fn fail_next(&self, op: Operation, failure: Failure) {
        self.state.lock().unwrap().failures.insert(op, failure);
    }

    /// Every operation attempted so far, including failed ones
    pub fn calls(&self) -> Vec<Operation> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Write operations attempted so far
    pub fn writes(&self) -> Vec<Operation> {
        self.calls().into_iter().filter(|op| op.is_write()).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait::async_trait]
impl ResourceStore for MockStore {
    async fn get_application(&self, key: &ObjectKey) -> Result<Application, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.begin(Operation::GetApplication)?;
        state
            .applications
            .get(key)
            .cloned()
            .ok_or_else(|| not_found("Application", key))
    }

    async fn update_application(&self, app: &Application) -> Result<Application, StoreError> {
        let key = write_key(app, "Application")?;
        let mut state = self.state.lock().unwrap();
        state.begin(Operation::UpdateApplication)?;

        let stored = state
            .applications
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found("Application", &key))?;
        check_version(
            "Application",
            &key,
            app.metadata.resource_version.as_ref(),
            stored.metadata.resource_version.as_ref(),
        )?;

        let mut updated = app.clone();
        updated.status = stored.status;
        updated.metadata.uid = stored.metadata.uid;
        updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp;
        updated.metadata.resource_version = Some(state.next_resource_version());
        state.applications.insert(key.clone(), updated.clone());
        state.collect_garbage(&key);
        Ok(updated)
    }

    async fn update_application_status(
        &self,
        key: &ObjectKey,
        status: &ApplicationStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.begin(Operation::UpdateApplicationStatus)?;

        let version = state.next_resource_version();
        let app = state
            .applications
            .get_mut(key)
            .ok_or_else(|| not_found("Application", key))?;
        app.status = Some(status.clone());
        app.metadata.resource_version = Some(version);
        Ok(())
    }

    async fn get_deployment(&self, key: &ObjectKey) -> Result<Deployment, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.begin(Operation::GetDeployment)?;
        state
            .deployments
            .get(key)
            .cloned()
            .ok_or_else(|| not_found("Deployment", key))
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let key = write_key(deployment, "Deployment")?;
        let mut state = self.state.lock().unwrap();
        state.begin(Operation::CreateDeployment)?;

        if state.deployments.contains_key(&key) {
            return Err(StoreError::Conflict(format!("Deployment {} already exists", key)));
        }

        let mut created = deployment.clone();
        created.metadata.uid = Some(state.next_uid());
        created.metadata.resource_version = Some(state.next_resource_version());
        created.status = None;
        state.deployments.insert(key, created.clone());
        Ok(created)
    }

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let key = write_key(deployment, "Deployment")?;
        let mut state = self.state.lock().unwrap();
        state.begin(Operation::UpdateDeployment)?;

        let stored = state
            .deployments
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found("Deployment", &key))?;
        check_version(
            "Deployment",
            &key,
            deployment.metadata.resource_version.as_ref(),
            stored.metadata.resource_version.as_ref(),
        )?;

        let mut updated = deployment.clone();
        updated.status = stored.status;
        updated.metadata.uid = stored.metadata.uid;
        updated.metadata.resource_version = Some(state.next_resource_version());
        state.deployments.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete_deployment(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.begin(Operation::DeleteDeployment)?;
        state
            .deployments
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found("Deployment", key))
    }
}
