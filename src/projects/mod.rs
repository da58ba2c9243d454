// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Project model: the parameter source abstraction, the CloudTruth
//! client, and the in-memory project graph.

pub mod cloudtruth;
pub mod graph;
pub mod source;

pub use cloudtruth::CloudtruthSource;
pub use graph::{Hierarchy, ProjectGraph};
pub use source::{Parameter, ParameterSource, ProjectEntry};
