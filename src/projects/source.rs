// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;

use crate::error::Result;

/// A single key/value entry from the parameter store. Immutable once
/// produced; rebuilt from the source on every reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: String,
    pub secret: bool,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>, secret: bool) -> Self {
        Parameter {
            key: key.into(),
            value: value.into(),
            secret,
        }
    }
}

/// One project's parameters plus its optional parent reference. The
/// parent may be absent or name a project that no longer exists.
#[derive(Debug, Clone, Default)]
pub struct ProjectEntry {
    pub parameters: Vec<Parameter>,
    pub parent: Option<String>,
}

/// Read-side abstraction over the external configuration service.
/// Eventually consistent; every reconciliation pass re-queries from
/// scratch.
#[async_trait]
pub trait ParameterSource: Send + Sync {
    /// Enumerate all project names
    async fn project_names(&self) -> Result<Vec<String>>;

    /// Fetch one project's parameters and parent link
    async fn project(&self, name: &str) -> Result<ProjectEntry>;
}
