// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Composition of ProjectMapping specs into per-project effective specs.

use regex::Regex;

use crate::constants::templates;
use crate::error::{KubetruthError, Result};
use crate::types::project_mapping::ProjectMappingSpec;

/// A fully populated mapping spec, the result of layering matching
/// overrides on the root mapping.
#[derive(Debug, Clone)]
pub struct ResolvedSpec {
    pub project_selector: Regex,
    pub skip: bool,
    pub skip_secrets: bool,
    pub included_projects: Vec<String>,
    pub configmap_template: String,
    pub secret_template: String,
    pub resource_name: Option<String>,
    pub resource_namespace: Option<String>,
}

impl ResolvedSpec {
    /// An empty selector pattern matches every project
    pub fn matches(&self, project: &str) -> bool {
        self.project_selector.is_match(project)
    }
}

/// One spec with its selector compiled up front
#[derive(Debug)]
struct CompiledSpec {
    selector: Regex,
    spec: ProjectMappingSpec,
}

/// The composed mapping set: exactly one root plus overrides in declared
/// order. Rebuilt from the cluster on every reconciliation pass.
#[derive(Debug)]
pub struct MappingsConfig {
    root: CompiledSpec,
    overrides: Vec<CompiledSpec>,
}

impl MappingsConfig {
    pub fn new(specs: Vec<ProjectMappingSpec>) -> Result<Self> {
        let mut root = None;
        let mut overrides = Vec::new();

        for spec in specs {
            let compiled = compile(spec)?;
            if compiled.spec.is_root() {
                if root.is_some() {
                    return Err(KubetruthError::ConfigError(
                        "multiple ProjectMappings with root scope".to_string(),
                    ));
                }
                root = Some(compiled);
            } else {
                overrides.push(compiled);
            }
        }

        let root = root.ok_or_else(|| {
            KubetruthError::ConfigError("no ProjectMapping with root scope".to_string())
        })?;

        Ok(MappingsConfig { root, overrides })
    }

    /// The effective spec for a project: the root mapping with each
    /// matching override's set fields shallow-merged over it, in declared
    /// order. List-valued fields replace, never concatenate.
    pub fn spec_for(&self, project: &str) -> ResolvedSpec {
        let mut merged = self.root.spec.clone();
        let mut selector = self.root.selector.clone();

        for layer in &self.overrides {
            if !layer.selector.is_match(project) {
                continue;
            }
            let spec = &layer.spec;
            if spec.project_selector.is_some() {
                merged.project_selector = spec.project_selector.clone();
                selector = layer.selector.clone();
            }
            if spec.skip.is_some() {
                merged.skip = spec.skip;
            }
            if spec.skip_secrets.is_some() {
                merged.skip_secrets = spec.skip_secrets;
            }
            if spec.included_projects.is_some() {
                merged.included_projects = spec.included_projects.clone();
            }
            if spec.configmap_template.is_some() {
                merged.configmap_template = spec.configmap_template.clone();
            }
            if spec.secret_template.is_some() {
                merged.secret_template = spec.secret_template.clone();
            }
            if spec.resource_name.is_some() {
                merged.resource_name = spec.resource_name.clone();
            }
            if spec.resource_namespace.is_some() {
                merged.resource_namespace = spec.resource_namespace.clone();
            }
        }

        resolve(merged, selector)
    }

    /// The root mapping resolved on its own, with no overrides applied
    pub fn root_spec(&self) -> ResolvedSpec {
        resolve(self.root.spec.clone(), self.root.selector.clone())
    }

    /// True if some project's effective spec both matches that project and
    /// lists `name` among its included projects. Such a name stays in the
    /// output set even when its own selector does not match.
    pub fn is_included(&self, name: &str, project_names: &[String]) -> bool {
        project_names.iter().any(|candidate| {
            let resolved = self.spec_for(candidate);
            resolved.matches(candidate)
                && resolved.included_projects.iter().any(|inc| inc == name)
        })
    }
}

fn compile(spec: ProjectMappingSpec) -> Result<CompiledSpec> {
    let pattern = spec.project_selector.as_deref().unwrap_or("");
    let selector = Regex::new(pattern).map_err(|e| {
        KubetruthError::ConfigError(format!("invalid project_selector '{}': {}", pattern, e))
    })?;
    Ok(CompiledSpec { selector, spec })
}

fn resolve(merged: ProjectMappingSpec, selector: Regex) -> ResolvedSpec {
    ResolvedSpec {
        project_selector: selector,
        skip: merged.skip.unwrap_or(false),
        skip_secrets: merged.skip_secrets.unwrap_or(false),
        included_projects: merged.included_projects.unwrap_or_default(),
        configmap_template: merged
            .configmap_template
            .unwrap_or_else(|| templates::CONFIGMAP.to_string()),
        secret_template: merged
            .secret_template
            .unwrap_or_else(|| templates::SECRET.to_string()),
        resource_name: merged.resource_name.filter(|t| !t.is_empty()),
        resource_namespace: merged.resource_namespace.filter(|t| !t.is_empty()),
    }
}
