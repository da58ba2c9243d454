// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;

use crate::constants::cloudtruth;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// CloudTruth API token
    pub api_key: String,
    /// Base URL of the CloudTruth API
    pub api_url: String,
    /// Default namespace for generated resources lacking an explicit one
    pub namespace: String,
    /// Seconds between reconciliation passes
    pub poll_interval_secs: u64,
    /// When true, apply decisions are logged but the cluster is never written
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("CLOUDTRUTH_API_KEY")
            .context("CLOUDTRUTH_API_KEY environment variable not set")?;
        let api_url =
            env::var("CLOUDTRUTH_API_URL").unwrap_or_else(|_| cloudtruth::API_URL.to_string());
        let namespace =
            env::var("KUBETRUTH_NAMESPACE").unwrap_or_else(|_| "default".to_string());
        let poll_interval_secs: u64 = env::var("POLL_INTERVAL_SECS")
            .unwrap_or("300".to_string())
            .parse()
            .unwrap_or(300);
        let dry_run: bool = env::var("DRY_RUN")
            .unwrap_or("false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(Config {
            api_key,
            api_url,
            namespace,
            poll_interval_secs,
            dry_run,
        })
    }
}
