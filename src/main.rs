// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use kubetruth::config::Config;
use kubetruth::etl::ReconcileEngine;
use kubetruth::kubernetes::gateway::{ClusterGateway, KubeGateway};
use kubetruth::kubernetes::wait_for_project_mapping_crd;
use kubetruth::poll::PollLoop;
use kubetruth::projects::CloudtruthSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Kubetruth operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, poll_interval={}s, dry_run={}",
        config.namespace, config.poll_interval_secs, config.dry_run
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the ProjectMapping CRD before reconciling
    info!("Waiting for ProjectMapping CRD to become available...");
    wait_for_project_mapping_crd(&client).await;

    let gateway: Arc<dyn ClusterGateway> =
        Arc::new(KubeGateway::new(client, config.namespace.clone()));
    let source = Arc::new(CloudtruthSource::new(&config.api_url, &config.api_key));
    let engine = Arc::new(ReconcileEngine::new(
        gateway.clone(),
        source,
        config.dry_run,
    ));

    let poll = PollLoop::new(Duration::from_secs(config.poll_interval_secs));

    info!("Starting reconciliation loop...");

    tokio::select! {
        result = poll.with_polling(gateway, || {
            let engine = engine.clone();
            async move {
                engine.apply().await?;
                Ok(())
            }
        }) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, exiting");
            Ok(())
        }
    }
}
