// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Template evaluation for resource manifests.
//!
//! Thin wrapper over minijinja with strict undefined handling and a few
//! filters useful when shaping parameters into Kubernetes fields.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::projects::graph::Hierarchy;

/// The variables visible to every manifest template. A closed record:
/// templates can reference exactly these keys and nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    /// Name of the project being rendered
    pub project: String,
    /// Nested ancestry map. The spelling is the published template
    /// contract and must stay as-is.
    pub project_heirarchy: Hierarchy,
    /// Flattened parameters visible to this manifest
    pub parameters: BTreeMap<String, String>,
    /// Project each winning parameter value came from
    pub parameter_origins: BTreeMap<String, String>,
    /// Whether debug logging is enabled
    pub debug: bool,
}

/// Template engine shared across a reconciliation pass
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("base64_encode", filters::base64_encode);
        env.add_filter("base64_decode", filters::base64_decode);
        env.add_filter("key_safe", filters::key_safe);
        TemplateEngine { env }
    }

    /// Render a template against the context. A syntax error or a
    /// reference to an undefined variable fails the render.
    pub fn render(&self, template: &str, ctx: &RenderContext) -> Result<String> {
        Ok(self.env.render_str(template, ctx)?)
    }
}

mod filters {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use minijinja::{Error, ErrorKind};

    /// Usage: `{{ value | base64_encode }}`
    pub fn base64_encode(value: &str) -> String {
        STANDARD.encode(value.as_bytes())
    }

    /// Usage: `{{ value | base64_decode }}`
    pub fn base64_decode(value: &str) -> Result<String, Error> {
        let bytes = STANDARD.decode(value).map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("base64 decode error: {}", e),
            )
        })?;
        String::from_utf8(bytes).map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("base64 decode produced invalid UTF-8: {}", e),
            )
        })
    }

    /// Sanitize a parameter key into a character set Kubernetes accepts
    /// for ConfigMap/Secret data keys.
    ///
    /// Usage: `{{ key | key_safe }}`
    pub fn key_safe(value: &str) -> String {
        value
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}
