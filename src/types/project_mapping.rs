// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Whether a mapping is the base configuration or a patch layered on it.
/// Exactly one ProjectMapping in the namespace must have `root` scope.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum MappingScope {
    Root,
    #[default]
    Override,
}

/// Declarative configuration for projecting CloudTruth projects into
/// cluster resources. Every field is optional on the wire; unset fields
/// of an override inherit from the root mapping, unset fields of the
/// root fall back to built-in defaults.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "kubetruth.cloudtruth.com", version = "v1", kind = "ProjectMapping")]
#[kube(namespaced)]
pub struct ProjectMappingSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<MappingScope>,
    /// Regular expression selecting the projects this mapping applies to;
    /// empty matches every project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_selector: Option<String>,
    /// Exclude matching projects from output entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<bool>,
    /// Omit secret parameters and emit no Secret resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_secrets: Option<bool>,
    /// Projects whose parameters are additionally inherited, in order,
    /// as if they were parents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included_projects: Option<Vec<String>>,
    /// Template producing the ConfigMap manifest; empty disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configmap_template: Option<String>,
    /// Template producing the Secret manifest; empty disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_template: Option<String>,
    /// Template overriding metadata.name of generated resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    /// Template overriding metadata.namespace of generated resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_namespace: Option<String>,
}

impl ProjectMappingSpec {
    pub fn is_root(&self) -> bool {
        self.scope == Some(MappingScope::Root)
    }
}
