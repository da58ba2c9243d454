// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The reconciliation engine: one `apply` call drains the parameter
//! source into ConfigMap and Secret resources for every selected project.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, instrument, Level};

use crate::error::{KubetruthError, Result};
use crate::kubernetes::apply::{apply_object, parse_manifest};
use crate::kubernetes::gateway::ClusterGateway;
use crate::mappings::{MappingsConfig, ResolvedSpec};
use crate::projects::graph::ProjectGraph;
use crate::projects::source::ParameterSource;
use crate::template::{RenderContext, TemplateEngine};

pub struct ReconcileEngine {
    gateway: Arc<dyn ClusterGateway>,
    source: Arc<dyn ParameterSource>,
    templates: TemplateEngine,
    dry_run: bool,
}

impl ReconcileEngine {
    pub fn new(
        gateway: Arc<dyn ClusterGateway>,
        source: Arc<dyn ParameterSource>,
        dry_run: bool,
    ) -> Self {
        ReconcileEngine {
            gateway,
            source,
            templates: TemplateEngine::new(),
            dry_run,
        }
    }

    /// One full reconciliation pass. A broken mapping set turns the pass
    /// into a no-op; a broken project is logged and skipped; only a
    /// source-wide enumeration failure aborts the pass.
    #[instrument(skip(self))]
    pub async fn apply(&self) -> Result<()> {
        let config = match self.load_config().await {
            Ok(config) => config,
            Err(KubetruthError::ConfigError(msg)) => {
                error!("Skipping reconciliation pass: {}", msg);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let names = self.source.project_names().await?;
        debug!("Reconciling {} projects", names.len());

        let want_secrets = !config.root_spec().skip_secrets;
        let graph = ProjectGraph::build(self.source.as_ref(), &names, want_secrets).await;

        for name in &names {
            if let Err(e) = self.apply_project(&config, &graph, &names, name).await {
                error!("Failed to reconcile project '{}': {}", name, e);
            }
        }

        Ok(())
    }

    async fn load_config(&self) -> Result<MappingsConfig> {
        let mappings = self.gateway.get_project_mappings().await?;
        MappingsConfig::new(mappings.into_iter().map(|m| m.spec).collect())
    }

    async fn apply_project(
        &self,
        config: &MappingsConfig,
        graph: &ProjectGraph,
        names: &[String],
        name: &str,
    ) -> Result<()> {
        let spec = config.spec_for(name);

        if !spec.matches(name) && !config.is_included(name, names) {
            debug!("Skipping project '{}': does not match selector", name);
            return Ok(());
        }
        if spec.skip {
            debug!("Skipping project '{}': skip is set", name);
            return Ok(());
        }
        if !graph.contains(name) {
            return Err(KubetruthError::SourceError(format!(
                "project '{}' could not be loaded",
                name
            )));
        }

        let flat = graph.flatten(name, &spec.included_projects);

        let mut context = RenderContext {
            project: name.to_string(),
            project_heirarchy: graph.hierarchy_of(name, &spec.included_projects),
            parameters: flat
                .values
                .iter()
                .filter(|(_, p)| !p.secret)
                .map(|(k, p)| (k.clone(), p.value.clone()))
                .collect(),
            parameter_origins: flat.origins.clone(),
            debug: tracing::enabled!(Level::DEBUG),
        };

        let rendered = self.templates.render(&spec.configmap_template, &context)?;
        if !rendered.trim().is_empty() {
            self.apply_manifest(&spec, &context, &rendered).await?;
        }

        if !spec.skip_secrets {
            // Secret templates see only secret parameters, with values
            // already base64 encoded; keys stay as-is
            context.parameters = flat
                .values
                .iter()
                .filter(|(_, p)| p.secret)
                .map(|(k, p)| (k.clone(), STANDARD.encode(p.value.as_bytes())))
                .collect::<BTreeMap<_, _>>();

            let rendered = self.templates.render(&spec.secret_template, &context)?;
            if !rendered.trim().is_empty() {
                self.apply_manifest(&spec, &context, &rendered).await?;
            }
        }

        Ok(())
    }

    /// Parse a rendered manifest, apply the spec's name/namespace
    /// overrides, and hand it to the drift-aware apply.
    async fn apply_manifest(
        &self,
        spec: &ResolvedSpec,
        context: &RenderContext,
        rendered: &str,
    ) -> Result<()> {
        let mut doc = parse_manifest(rendered)?;

        if let Some(template) = &spec.resource_name {
            let name = self.templates.render(template, context)?;
            if !name.trim().is_empty() {
                doc.metadata.name = Some(name.trim().to_string());
            }
        }
        if let Some(template) = &spec.resource_namespace {
            let namespace = self.templates.render(template, context)?;
            if !namespace.trim().is_empty() {
                doc.metadata.namespace = Some(namespace.trim().to_string());
            }
        }

        apply_object(self.gateway.as_ref(), doc, self.dry_run).await
    }
}
