// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock HTTP backend for exercising real kube client
//! paths, plus recording fakes for the gateway and parameter source
//! traits.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use http::{Request, Response};
use kube::api::DynamicObject;
use kube::client::Body;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

use crate::error::{KubetruthError, Result};
use crate::kubernetes::gateway::{ClusterGateway, MappingWatchStream};
use crate::projects::source::{Parameter, ParameterSource, ProjectEntry};
use crate::types::project_mapping::ProjectMapping;

/// A mock HTTP service that returns predefined responses based on request
/// method and path.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(
                (method.to_string(), path.to_string()),
                (status, body.to_string()),
            );
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// JSON for a ConfigMap, optionally carrying the kubetruth management
/// label
pub fn configmap_json(name: &str, namespace: &str, data: &[(&str, &str)], managed: bool) -> String {
    let mut labels = serde_json::Map::new();
    if managed {
        labels.insert(
            "app.kubernetes.io/managed-by".to_string(),
            serde_json::Value::String("kubetruth".to_string()),
        );
    }
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "labels": labels,
        },
        "data": data
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect::<serde_json::Map<_, _>>(),
    })
    .to_string()
}

/// JSON for a ProjectMapping list response; each entry is
/// (name, scope, selector), with an empty selector omitted from the spec
pub fn project_mapping_list_json(entries: &[(&str, &str, &str)]) -> String {
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|(name, scope, selector)| {
            let mut spec = serde_json::json!({"scope": scope});
            if !selector.is_empty() {
                spec["project_selector"] = serde_json::Value::String(selector.to_string());
            }
            serde_json::json!({
                "apiVersion": "kubetruth.cloudtruth.com/v1",
                "kind": "ProjectMapping",
                "metadata": {"name": name, "namespace": "default"},
                "spec": spec,
            })
        })
        .collect();

    serde_json::json!({
        "apiVersion": "kubetruth.cloudtruth.com/v1",
        "kind": "ProjectMappingList",
        "metadata": {"resourceVersion": "1"},
        "items": items,
    })
    .to_string()
}

/// In-memory gateway that records every write, for engine and apply
/// protocol tests.
pub struct RecordingGateway {
    namespace: String,
    mappings: Mutex<Vec<ProjectMapping>>,
    existing: Mutex<HashMap<(String, String, String), DynamicObject>>,
    applied: Mutex<Vec<DynamicObject>>,
    ensured: Mutex<Vec<String>>,
}

impl RecordingGateway {
    pub fn new(namespace: &str) -> Self {
        RecordingGateway {
            namespace: namespace.to_string(),
            mappings: Mutex::new(Vec::new()),
            existing: Mutex::new(HashMap::new()),
            applied: Mutex::new(Vec::new()),
            ensured: Mutex::new(Vec::new()),
        }
    }

    pub fn with_mappings(self, mappings: Vec<ProjectMapping>) -> Self {
        *self.mappings.lock().unwrap() = mappings;
        self
    }

    /// Pre-populate the fake cluster with a resource
    pub fn seed(&self, json: &str) {
        self.seed_doc(serde_json::from_str(json).unwrap());
    }

    pub fn seed_doc(&self, doc: DynamicObject) {
        self.existing.lock().unwrap().insert(key_of(&doc), doc);
    }

    /// Every document passed to apply_resource, in call order
    pub fn applied(&self) -> Vec<DynamicObject> {
        self.applied.lock().unwrap().clone()
    }

    /// Every namespace passed to ensure_namespace, in call order
    pub fn ensured(&self) -> Vec<String> {
        self.ensured.lock().unwrap().clone()
    }
}

fn key_of(doc: &DynamicObject) -> (String, String, String) {
    (
        doc.types.as_ref().map(|t| t.kind.clone()).unwrap_or_default(),
        doc.metadata.name.clone().unwrap_or_default(),
        doc.metadata.namespace.clone().unwrap_or_default(),
    )
}

#[async_trait]
impl ClusterGateway for RecordingGateway {
    async fn get_resource(
        &self,
        _api_version: &str,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<DynamicObject>> {
        Ok(self
            .existing
            .lock()
            .unwrap()
            .get(&(kind.to_string(), name.to_string(), namespace.to_string()))
            .cloned())
    }

    async fn apply_resource(&self, doc: &DynamicObject) -> Result<()> {
        self.applied.lock().unwrap().push(doc.clone());
        self.existing.lock().unwrap().insert(key_of(doc), doc.clone());
        Ok(())
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        self.ensured.lock().unwrap().push(namespace.to_string());
        Ok(())
    }

    async fn get_project_mappings(&self) -> Result<Vec<ProjectMapping>> {
        Ok(self.mappings.lock().unwrap().clone())
    }

    async fn watch_project_mappings(&self) -> Result<MappingWatchStream> {
        Ok(stream::pending().boxed())
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// In-memory parameter source with per-project entries; a "broken"
/// project is enumerated but fails to load.
pub struct FakeSource {
    entries: Vec<(String, Option<ProjectEntry>)>,
}

impl FakeSource {
    pub fn new() -> Self {
        FakeSource {
            entries: Vec::new(),
        }
    }

    pub fn with_project(
        mut self,
        name: &str,
        parent: Option<&str>,
        params: Vec<(&str, &str, bool)>,
    ) -> Self {
        self.entries.push((
            name.to_string(),
            Some(ProjectEntry {
                parameters: params
                    .into_iter()
                    .map(|(k, v, secret)| Parameter::new(k, v, secret))
                    .collect(),
                parent: parent.map(|p| p.to_string()),
            }),
        ));
        self
    }

    pub fn with_broken_project(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), None));
        self
    }
}

impl Default for FakeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParameterSource for FakeSource {
    async fn project_names(&self) -> Result<Vec<String>> {
        Ok(self.entries.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn project(&self, name: &str) -> Result<ProjectEntry> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, entry)| entry.clone())
            .ok_or_else(|| KubetruthError::SourceError(format!("unknown project '{}'", name)))
    }
}
