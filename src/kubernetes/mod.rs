// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes plumbing: the cluster gateway, the drift-aware apply
//! protocol, and the CRD startup gate.

pub mod apply;
pub mod crd;
pub mod gateway;

pub use apply::kube_apply;
pub use crd::wait_for_project_mapping_crd;
pub use gateway::{is_under_management, ClusterGateway, KubeGateway};
