// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Startup gate: block until the ProjectMapping CRD is installed and
//! served, so the first reconciliation pass doesn't race the chart that
//! installs the CRD.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{Api, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};

/// Fully qualified name of the ProjectMapping CRD object
const CRD_NAME: &str = "projectmappings.kubetruth.cloudtruth.com";

/// Block until the ProjectMapping CRD reports the Established condition.
/// Lookup failures are retried forever; a cluster without the CRD is a
/// cluster we cannot reconcile against yet.
pub async fn wait_for_project_mapping_crd(client: &Client) {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());

    for attempt in 0.. {
        match crds.get_opt(CRD_NAME).await {
            Ok(Some(crd)) if is_established(&crd) => {
                info!("CRD '{}' is established", CRD_NAME);
                return;
            }
            Ok(Some(_)) => info!("CRD '{}' is installed but not established yet", CRD_NAME),
            Ok(None) => info!("CRD '{}' is not installed yet", CRD_NAME),
            Err(e) => warn!("Could not look up CRD '{}': {}", CRD_NAME, e),
        }

        let delay = retry_delay(attempt);
        info!("Checking for CRD '{}' again in {}s", CRD_NAME, delay.as_secs());
        sleep(delay).await;
    }
}

/// Delay before retry `attempt`, doubling from the base interval up to
/// the configured cap
fn retry_delay(attempt: u32) -> Duration {
    let doubled = POLL_INTERVAL_SECS.saturating_mul(1u64 << attempt.min(6));
    Duration::from_secs(doubled.min(POLL_MAX_INTERVAL_SECS))
}

fn is_established(crd: &CustomResourceDefinition) -> bool {
    crd.status
        .as_ref()
        .map(|status| status.conditions.as_deref().unwrap_or_default())
        .unwrap_or_default()
        .iter()
        .any(|c| c.type_ == "Established" && c.status == "True")
}
