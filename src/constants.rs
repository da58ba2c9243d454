// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes labels used by Kubetruth
pub mod labels {
    /// Label key identifying the tool that owns a resource
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
    /// Label value marking a resource as owned by this controller
    pub const MANAGED_BY_VALUE: &str = "kubetruth";
}

/// The operator name used for server-side apply
pub const OPERATOR_NAME: &str = "kubetruth";

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// CloudTruth API defaults
pub mod cloudtruth {
    pub const API_URL: &str = "https://api.cloudtruth.io/api/v1";
}

/// Built-in resource templates, used when a ProjectMapping does not
/// override them. Keys and values are JSON-quoted so arbitrary parameter
/// content stays valid YAML.
pub mod templates {
    pub const CONFIGMAP: &str = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: "{{ project }}"
  labels:
    app.kubernetes.io/managed-by: kubetruth
data:
{%- for key, value in parameters|items %}
  {{ key | tojson }}: {{ value | tojson }}
{%- endfor %}
"#;

    pub const SECRET: &str = r#"apiVersion: v1
kind: Secret
metadata:
  name: "{{ project }}"
  labels:
    app.kubernetes.io/managed-by: kubetruth
data:
{%- for key, value in parameters|items %}
  {{ key | tojson }}: {{ value | tojson }}
{%- endfor %}
"#;
}
