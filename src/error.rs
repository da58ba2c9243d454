// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KubetruthError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid ProjectMapping configuration: {0}")]
    ConfigError(String),

    #[error("Parameter source error: {0}")]
    SourceError(String),

    #[error("Template render failed: {0}")]
    TemplateError(#[from] minijinja::Error),

    #[error("Invalid manifest: {0}")]
    ManifestError(String),

    #[error("Namespace creation failed: {0}")]
    NamespaceError(String),
}

pub type Result<T> = std::result::Result<T, KubetruthError>;
