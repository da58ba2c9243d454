// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory model of the project set: parent links, hierarchy trees,
//! and parameter flattening with origin tracking.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{error, warn};

use crate::error::Result;
use crate::projects::source::{Parameter, ParameterSource};

/// A project and its parent link, as loaded for one reconciliation pass
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub parent: Option<String>,
}

/// Nested ancestry map, `{self: {parent: {grandparent: {}}}}`.
/// Serializes as a plain map for template consumption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Hierarchy(pub BTreeMap<String, Hierarchy>);

impl Hierarchy {
    fn leaf() -> Self {
        Hierarchy::default()
    }
}

/// The flattened view of one project: the winning parameter per key and
/// the name of the project each winning value came from.
#[derive(Debug, Default)]
pub struct FlatParameters {
    pub values: BTreeMap<String, Parameter>,
    pub origins: BTreeMap<String, String>,
}

/// All projects of one reconciliation pass, keyed by name. Built fresh
/// each pass; nothing survives to the next one.
#[derive(Debug, Default)]
pub struct ProjectGraph {
    projects: HashMap<String, Project>,
}

impl ProjectGraph {
    /// Load every named project from the source. A project whose fetch
    /// fails is left out of the graph and reported by the caller when its
    /// turn comes; one bad project does not abort the pass.
    pub async fn build(
        source: &dyn ParameterSource,
        names: &[String],
        want_secrets: bool,
    ) -> Self {
        let mut projects = HashMap::new();

        for name in names {
            match source.project(name).await {
                Ok(entry) => {
                    let parameters = entry
                        .parameters
                        .into_iter()
                        .filter(|p| want_secrets || !p.secret)
                        .collect();
                    projects.insert(
                        name.clone(),
                        Project {
                            name: name.clone(),
                            parameters,
                            parent: entry.parent,
                        },
                    );
                }
                Err(e) => {
                    error!("Failed to load project '{}': {}", name, e);
                }
            }
        }

        ProjectGraph { projects }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    /// Ancestry chain of `name`, deepest ancestor first, ending at `name`
    /// itself. Dangling parents and cycles end the chain early.
    fn ancestry(&self, name: &str) -> Vec<&Project> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = name;

        while let Some(project) = self.projects.get(current) {
            if !seen.insert(project.name.as_str()) {
                warn!(
                    "Breaking project hierarchy cycle at '{}' (reached from '{}')",
                    project.name, name
                );
                break;
            }
            chain.push(project);
            match &project.parent {
                Some(parent) => {
                    if !self.projects.contains_key(parent.as_str()) {
                        warn!(
                            "Project '{}' names unknown parent '{}', ignoring it",
                            project.name, parent
                        );
                        break;
                    }
                    current = parent;
                }
                None => break,
            }
        }

        chain.reverse();
        chain
    }

    /// Flatten a project's parameters: its own ancestry chain first
    /// (deepest ancestor loses), then each included project's chain in
    /// declared order, with the project's own parameters winning last.
    /// Values contributed through an inclusion are attributed
    /// `"<project> (<included>)"`.
    pub fn flatten(&self, name: &str, included: &[String]) -> FlatParameters {
        let mut flat = FlatParameters::default();

        for project in self.ancestry(name) {
            for param in &project.parameters {
                flat.values.insert(param.key.clone(), param.clone());
                flat.origins.insert(param.key.clone(), project.name.clone());
            }
        }

        for inc in included {
            if !self.projects.contains_key(inc.as_str()) {
                warn!(
                    "Project '{}' includes unknown project '{}', ignoring it",
                    name, inc
                );
                continue;
            }
            for project in self.ancestry(inc) {
                for param in &project.parameters {
                    flat.values.insert(param.key.clone(), param.clone());
                    flat.origins
                        .insert(param.key.clone(), format!("{} ({})", name, inc));
                }
            }
        }

        // The project's own parameters always win, including over inclusions
        if let Some(project) = self.projects.get(name) {
            for param in &project.parameters {
                flat.values.insert(param.key.clone(), param.clone());
                flat.origins.insert(param.key.clone(), name.to_string());
            }
        }

        flat
    }

    /// Nested ancestry map for the template context, with included
    /// projects grafted in as children of the root name.
    pub fn hierarchy_of(&self, name: &str, included: &[String]) -> Hierarchy {
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut body = self.ancestor_tree(name, &mut seen);

        for inc in included {
            if !self.projects.contains_key(inc.as_str()) {
                continue;
            }
            let mut seen = HashSet::new();
            seen.insert(inc.clone());
            body.0.insert(inc.clone(), self.ancestor_tree(inc, &mut seen));
        }

        Hierarchy(BTreeMap::from([(name.to_string(), body)]))
    }

    fn ancestor_tree(&self, name: &str, seen: &mut HashSet<String>) -> Hierarchy {
        let Some(parent) = self.projects.get(name).and_then(|p| p.parent.clone()) else {
            return Hierarchy::leaf();
        };
        if !self.projects.contains_key(parent.as_str()) {
            return Hierarchy::leaf();
        }
        if !seen.insert(parent.clone()) {
            warn!("Breaking project hierarchy cycle at '{}'", parent);
            return Hierarchy::leaf();
        }
        let subtree = self.ancestor_tree(&parent, seen);
        Hierarchy(BTreeMap::from([(parent, subtree)]))
    }
}

/// Convenience used by the reconciler: enumerate then load in one step
pub async fn load_graph(
    source: &dyn ParameterSource,
    want_secrets: bool,
) -> Result<(Vec<String>, ProjectGraph)> {
    let names = source.project_names().await?;
    let graph = ProjectGraph::build(source, &names, want_secrets).await;
    Ok((names, graph))
}
