// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod error;
pub mod etl;
pub mod kubernetes;
pub mod mappings;
pub mod poll;
pub mod projects;
pub mod template;
pub mod types;

#[cfg(test)]
pub mod test_utils;
