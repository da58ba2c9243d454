// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CloudTruth REST client implementing the parameter source contract.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::{KubetruthError, Result};
use crate::projects::source::{Parameter, ParameterSource, ProjectEntry};

/// A project record as returned by the CloudTruth API
#[derive(Debug, Clone, Deserialize)]
struct ApiProject {
    id: String,
    name: String,
    /// Name of the project this one inherits parameters from
    #[serde(default)]
    depends_on: Option<String>,
}

/// A parameter record as returned by the CloudTruth API
#[derive(Debug, Clone, Deserialize)]
struct ApiParameter {
    name: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    secret: bool,
}

/// One page of a paginated listing
#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

/// Parameter source backed by the CloudTruth REST API.
///
/// The project listing fetched by `project_names` is kept for the
/// remainder of the pass so per-project lookups do not re-enumerate;
/// the next pass starts from a fresh listing.
pub struct CloudtruthSource {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    projects: Mutex<HashMap<String, ApiProject>>,
}

impl CloudtruthSource {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        CloudtruthSource {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            projects: Mutex::new(HashMap::new()),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .send()
            .await
            .map_err(|e| KubetruthError::SourceError(format!("request to {} failed: {}", url, e)))?;

        let response = response.error_for_status().map_err(|e| {
            KubetruthError::SourceError(format!("request to {} failed: {}", url, e))
        })?;

        response
            .json()
            .await
            .map_err(|e| KubetruthError::SourceError(format!("decoding {} failed: {}", url, e)))
    }

    async fn fetch_all<T: serde::de::DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            let page: Page<T> = self.get_json(&url).await?;
            results.extend(page.results);
            next = page.next;
        }
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn list_projects(&self) -> Result<Vec<ApiProject>> {
        let projects: Vec<ApiProject> =
            self.fetch_all(format!("{}/projects/", self.api_url)).await?;
        debug!("CloudTruth returned {} projects", projects.len());

        let mut cache = self.projects.lock().unwrap_or_else(|e| e.into_inner());
        cache.clear();
        for project in &projects {
            cache.insert(project.name.clone(), project.clone());
        }

        Ok(projects)
    }

    async fn lookup(&self, name: &str) -> Result<ApiProject> {
        let cached = {
            let cache = self.projects.lock().unwrap_or_else(|e| e.into_inner());
            cache.get(name).cloned()
        };
        if let Some(project) = cached {
            return Ok(project);
        }

        // Not seen in the current listing; refresh once before giving up
        self.list_projects().await?;
        let cache = self.projects.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .get(name)
            .cloned()
            .ok_or_else(|| KubetruthError::SourceError(format!("unknown project '{}'", name)))
    }
}

#[async_trait]
impl ParameterSource for CloudtruthSource {
    async fn project_names(&self) -> Result<Vec<String>> {
        let projects = self.list_projects().await?;
        Ok(projects.into_iter().map(|p| p.name).collect())
    }

    #[instrument(skip(self))]
    async fn project(&self, name: &str) -> Result<ProjectEntry> {
        let project = self.lookup(name).await?;
        let parameters: Vec<ApiParameter> = self
            .fetch_all(format!("{}/projects/{}/parameters/", self.api_url, project.id))
            .await?;

        Ok(ProjectEntry {
            parameters: parameters
                .into_iter()
                .map(|p| Parameter {
                    key: p.name,
                    value: p.value.unwrap_or_default(),
                    secret: p.secret,
                })
                .collect(),
            parent: project.depends_on,
        })
    }
}
