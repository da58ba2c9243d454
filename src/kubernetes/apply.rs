// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Drift-aware apply: parse a rendered manifest, then create, update, or
//! leave the cluster object alone depending on what is already there.

use kube::api::DynamicObject;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

use crate::error::{KubetruthError, Result};
use crate::kubernetes::gateway::{is_under_management, ClusterGateway};

/// Parse a rendered manifest into a dynamic document. The manifest must
/// carry apiVersion, kind, and metadata.name.
pub fn parse_manifest(manifest: &str) -> Result<DynamicObject> {
    let value: Value = serde_yaml::from_str(manifest)
        .map_err(|e| KubetruthError::ManifestError(format!("not valid YAML: {}", e)))?;
    let doc: DynamicObject = serde_json::from_value(value)
        .map_err(|e| KubetruthError::ManifestError(format!("not a resource document: {}", e)))?;

    if !doc.types.as_ref().is_some_and(|t| !t.kind.is_empty()) {
        return Err(KubetruthError::ManifestError(
            "manifest is missing apiVersion/kind".to_string(),
        ));
    }
    if doc.metadata.name.as_deref().unwrap_or("").is_empty() {
        return Err(KubetruthError::ManifestError(
            "manifest is missing metadata.name".to_string(),
        ));
    }

    Ok(doc)
}

/// Apply a rendered manifest through the drift protocol.
pub async fn kube_apply(gateway: &dyn ClusterGateway, manifest: &str, dry_run: bool) -> Result<()> {
    apply_object(gateway, parse_manifest(manifest)?, dry_run).await
}

/// Apply an already parsed document. Only writes when the resource is
/// absent, or present under kubetruth management with different content.
/// In dry-run mode decisions are logged but nothing is written.
pub async fn apply_object(
    gateway: &dyn ClusterGateway,
    mut doc: DynamicObject,
    dry_run: bool,
) -> Result<()> {
    // parse_manifest guarantees types and name; absent only when a caller
    // hand-builds a document
    let types = doc.types.clone().ok_or_else(|| {
        KubetruthError::ManifestError("document is missing apiVersion/kind".to_string())
    })?;
    let name = doc.metadata.name.clone().ok_or_else(|| {
        KubetruthError::ManifestError("document is missing metadata.name".to_string())
    })?;
    let namespace = doc
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| gateway.namespace().to_string());
    doc.metadata.namespace = Some(namespace.clone());

    if !dry_run {
        gateway.ensure_namespace(&namespace).await?;
    }

    let existing = gateway
        .get_resource(&types.api_version, &types.kind, &name, &namespace)
        .await?;

    match existing {
        None => {
            info!("Creating {} '{}/{}'", types.kind, namespace, name);
            if !dry_run {
                gateway.apply_resource(&doc).await?;
            }
        }
        Some(current) if !is_under_management(&current) => {
            info!(
                "Skipping {} '{}/{}' (not under kubetruth management)",
                types.kind, namespace, name
            );
        }
        Some(current) if intended_fields(&current) == intended_fields(&doc) => {
            info!("Skipping identical {} '{}/{}'", types.kind, namespace, name);
        }
        Some(_) => {
            info!("Updating {} '{}/{}'", types.kind, namespace, name);
            if !dry_run {
                gateway.apply_resource(&doc).await?;
            }
        }
    }

    Ok(())
}

/// The fields this controller owns, for structural comparison. Server
/// populated metadata (resourceVersion, uid, timestamps, status) is
/// deliberately left out.
fn intended_fields(
    doc: &DynamicObject,
) -> (
    BTreeMap<String, String>,
    BTreeMap<String, String>,
    Value,
    Value,
) {
    (
        doc.metadata.labels.clone().unwrap_or_default(),
        doc.metadata.annotations.clone().unwrap_or_default(),
        doc.data.get("data").cloned().unwrap_or(Value::Null),
        doc.data.get("stringData").cloned().unwrap_or(Value::Null),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{configmap_json, RecordingGateway};

    fn manifest(name: &str, value: &str, managed: bool) -> String {
        let label = if managed {
            "\n  labels:\n    app.kubernetes.io/managed-by: kubetruth"
        } else {
            ""
        };
        format!(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {}{}\ndata:\n  param1: \"{}\"\n",
            name, label, value
        )
    }

    #[test]
    fn test_parse_manifest_extracts_identity() {
        let doc = parse_manifest(&manifest("proj1", "value1", true)).unwrap();
        let types = doc.types.unwrap();
        assert_eq!(types.kind, "ConfigMap");
        assert_eq!(types.api_version, "v1");
        assert_eq!(doc.metadata.name.as_deref(), Some("proj1"));
        assert!(doc.metadata.namespace.is_none());
    }

    #[test]
    fn test_parse_manifest_rejects_garbage() {
        assert!(parse_manifest(": not yaml :").is_err());
        assert!(parse_manifest("apiVersion: v1\nkind: ConfigMap\nmetadata: {}\n").is_err());
        assert!(parse_manifest("metadata:\n  name: x\n").is_err());
    }

    #[tokio::test]
    async fn test_absent_resource_is_created() {
        let gateway = RecordingGateway::new("default");
        kube_apply(&gateway, &manifest("proj1", "value1", true), false)
            .await
            .unwrap();

        assert_eq!(gateway.applied().len(), 1);
        assert_eq!(gateway.ensured(), vec!["default".to_string()]);
        // The gateway default namespace was filled in before the write
        assert_eq!(
            gateway.applied()[0].metadata.namespace.as_deref(),
            Some("default")
        );
    }

    #[tokio::test]
    async fn test_manifest_namespace_wins_over_default() {
        let gateway = RecordingGateway::new("default");
        let manifest = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: proj1\n  namespace: custom\ndata: {}\n";
        kube_apply(&gateway, manifest, false).await.unwrap();

        assert_eq!(gateway.ensured(), vec!["custom".to_string()]);
        assert_eq!(
            gateway.applied()[0].metadata.namespace.as_deref(),
            Some("custom")
        );
    }

    #[tokio::test]
    async fn test_unmanaged_resource_is_left_alone() {
        let gateway = RecordingGateway::new("default");
        gateway.seed(&configmap_json("proj1", "default", &[("param1", "old")], false));

        kube_apply(&gateway, &manifest("proj1", "value1", true), false)
            .await
            .unwrap();
        assert!(gateway.applied().is_empty());
    }

    #[tokio::test]
    async fn test_identical_resource_is_skipped() {
        let gateway = RecordingGateway::new("default");
        kube_apply(&gateway, &manifest("proj1", "value1", true), false)
            .await
            .unwrap();
        assert_eq!(gateway.applied().len(), 1);

        // Same manifest again: the stored copy matches, nothing written
        kube_apply(&gateway, &manifest("proj1", "value1", true), false)
            .await
            .unwrap();
        assert_eq!(gateway.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_ignores_server_populated_fields() {
        let gateway = RecordingGateway::new("default");
        let mut seeded: DynamicObject =
            serde_json::from_str(&configmap_json("proj1", "default", &[("param1", "value1")], true))
                .unwrap();
        seeded.metadata.resource_version = Some("12345".to_string());
        seeded.metadata.uid = Some("abc-def".to_string());
        gateway.seed_doc(seeded);

        kube_apply(&gateway, &manifest("proj1", "value1", true), false)
            .await
            .unwrap();
        assert!(gateway.applied().is_empty());
    }

    #[tokio::test]
    async fn test_changed_resource_is_updated() {
        let gateway = RecordingGateway::new("default");
        gateway.seed(&configmap_json("proj1", "default", &[("param1", "old")], true));

        kube_apply(&gateway, &manifest("proj1", "new", true), false)
            .await
            .unwrap();
        assert_eq!(gateway.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_suppresses_all_writes() {
        let gateway = RecordingGateway::new("default");
        kube_apply(&gateway, &manifest("proj1", "value1", true), true)
            .await
            .unwrap();

        assert!(gateway.applied().is_empty());
        assert!(gateway.ensured().is_empty());

        // An update decision is also suppressed
        gateway.seed(&configmap_json("proj1", "default", &[("param1", "old")], true));
        kube_apply(&gateway, &manifest("proj1", "new", true), true)
            .await
            .unwrap();
        assert!(gateway.applied().is_empty());
    }
}
