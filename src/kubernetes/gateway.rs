// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The cluster gateway: the one place that talks to the Kubernetes API
//! on behalf of the reconciler.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{
    Api, ApiResource, DynamicObject, ListParams, ObjectMeta, Patch, PatchParams, PostParams,
    WatchEvent, WatchParams,
};
use kube::core::GroupVersionKind;
use kube::{Client, ResourceExt};
use tracing::{debug, info, instrument};

use crate::constants::{labels, OPERATOR_NAME};
use crate::error::{KubetruthError, Result};
use crate::types::project_mapping::ProjectMapping;

/// True iff the document carries this controller's ownership label.
/// Resources without it belong to someone else and are never written.
pub fn is_under_management(doc: &DynamicObject) -> bool {
    doc.metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(labels::MANAGED_BY))
        .is_some_and(|v| v == labels::MANAGED_BY_VALUE)
}

/// Change notices for ProjectMapping resources, as delivered by the
/// cluster's long-poll watch.
pub type MappingWatchStream = BoxStream<'static, kube::Result<WatchEvent<ProjectMapping>>>;

/// Thin abstraction over the Kubernetes API used by the reconciler.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Fetch one resource; `Ok(None)` means it does not exist, which is
    /// kept distinct from transport errors.
    async fn get_resource(
        &self,
        api_version: &str,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<DynamicObject>>;

    /// Idempotent create-or-update via server-side apply
    async fn apply_resource(&self, doc: &DynamicObject) -> Result<()>;

    /// Create the namespace if absent; no-op if present
    async fn ensure_namespace(&self, namespace: &str) -> Result<()>;

    /// All ProjectMapping documents currently present in the namespace
    async fn get_project_mappings(&self) -> Result<Vec<ProjectMapping>>;

    /// Open a fresh watch stream over the ProjectMapping resources
    async fn watch_project_mappings(&self) -> Result<MappingWatchStream>;

    /// Default namespace for resources lacking an explicit one
    fn namespace(&self) -> &str;
}

/// Production gateway backed by a real cluster client
pub struct KubeGateway {
    client: Client,
    namespace: String,
}

impl KubeGateway {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        KubeGateway {
            client,
            namespace: namespace.into(),
        }
    }

    fn dynamic_api(&self, api_version: &str, kind: &str, namespace: &str) -> Api<DynamicObject> {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        let gvk = GroupVersionKind::gvk(group, version, kind);
        let resource = ApiResource::from_gvk(&gvk);
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }

    fn mappings_api(&self) -> Api<ProjectMapping> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    #[instrument(skip(self))]
    async fn get_resource(
        &self,
        api_version: &str,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<DynamicObject>> {
        let api = self.dynamic_api(api_version, kind, namespace);
        Ok(api.get_opt(name).await?)
    }

    #[instrument(skip(self, doc), fields(name = %doc.name_any()))]
    async fn apply_resource(&self, doc: &DynamicObject) -> Result<()> {
        let types = doc.types.as_ref().ok_or_else(|| {
            KubetruthError::ManifestError("document is missing apiVersion/kind".to_string())
        })?;
        let namespace = doc.namespace().unwrap_or_else(|| self.namespace.clone());
        let api = self.dynamic_api(&types.api_version, &types.kind, &namespace);

        let params = PatchParams::apply(OPERATOR_NAME).force();
        api.patch(&doc.name_any(), &params, &Patch::Apply(doc))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        if api.get_opt(namespace).await?.is_some() {
            return Ok(());
        }

        info!("Namespace '{}' is missing, creating it", namespace);
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        api.create(&PostParams::default(), &ns).await.map_err(|e| {
            KubetruthError::NamespaceError(format!("could not create '{}': {}", namespace, e))
        })?;
        Ok(())
    }

    async fn get_project_mappings(&self) -> Result<Vec<ProjectMapping>> {
        let list = self.mappings_api().list(&ListParams::default()).await?;
        debug!("Found {} ProjectMappings", list.items.len());
        Ok(list.items)
    }

    async fn watch_project_mappings(&self) -> Result<MappingWatchStream> {
        let api = self.mappings_api();
        // Start watching from the current state so only new changes wake
        // the reconciler
        let list = api.list_metadata(&ListParams::default()).await?;
        let version = list.metadata.resource_version.unwrap_or_else(|| "0".to_string());
        let stream = api.watch(&WatchParams::default(), &version).await?;
        Ok(stream.boxed())
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}
