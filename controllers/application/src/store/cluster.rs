//! Kubernetes-backed resource store.

use super::{ObjectKey, ResourceStore, StoreError, write_key};
use crds::{Application, ApplicationStatus};
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};

/// Resource store talking to the API server through a shared client.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn applications(&self, namespace: &str) -> Api<Application> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn get_application(&self, key: &ObjectKey) -> Result<Application, StoreError> {
        Ok(self.applications(&key.namespace).get(&key.name).await?)
    }

    async fn update_application(&self, app: &Application) -> Result<Application, StoreError> {
        let key = write_key(app, "Application")?;
        Ok(self
            .applications(&key.namespace)
            .replace(&key.name, &PostParams::default(), app)
            .await?)
    }

    async fn update_application_status(
        &self,
        key: &ObjectKey,
        status: &ApplicationStatus,
    ) -> Result<(), StoreError> {
        let status_patch = serde_json::json!({
            "status": status
        });

        self.applications(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }

    async fn get_deployment(&self, key: &ObjectKey) -> Result<Deployment, StoreError> {
        Ok(self.deployments(&key.namespace).get(&key.name).await?)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let key = write_key(deployment, "Deployment")?;
        Ok(self
            .deployments(&key.namespace)
            .create(&PostParams::default(), deployment)
            .await?)
    }

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let key = write_key(deployment, "Deployment")?;
        Ok(self
            .deployments(&key.namespace)
            .replace(&key.name, &PostParams::default(), deployment)
            .await?)
    }

    async fn delete_deployment(&self, key: &ObjectKey) -> Result<(), StoreError> {
        self.deployments(&key.namespace)
            .delete(&key.name, &DeleteParams::background())
            .await?;
        Ok(())
    }
}
