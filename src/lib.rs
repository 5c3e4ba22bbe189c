// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Plinth - CI/CD platform operator for Kubernetes
//!
//! Plinth installs and lifecycle-manages a multi-component CI/CD platform from a
//! single root custom resource. A `PlatformConfig` enables components; each enabled
//! component gets its own custom resource (`PipelineEngine`, `Dashboard`) whose
//! reconciler renders and applies the component's Deployments, RBAC and config.
//!
//! ## Ownership tracking
//!
//! Every object a reconcile writes goes through a [`tracking::TrackingClient`]. The
//! client stamps ownership labels and a controller owner reference on each object
//! and remembers its identity. After all applies succeed, objects that carry the
//! owner label but were not written in this pass are orphans and are deleted,
//! subject to owner-reference verification and, for cluster-scoped kinds, a
//! [`allowlist::ClusterScopedAllowList`].
//!
//! ## Modules
//!
//! - [`crd`] - Custom resource types
//! - [`tracking`] - Ownership-tracking client and orphan cleanup
//! - [`overlay`] - Deployment customization overlay
//! - [`manifests`] - Component object builders
//! - [`reconcilers`] - Reconcilers and condition aggregation
//! - [`capabilities`] - CRD presence checks and server version polling
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use plinth::crd::{PlatformComponents, PlatformConfig, PlatformConfigSpec};
//!
//! let platform = PlatformConfig::new(
//!     "platform",
//!     PlatformConfigSpec {
//!         target_namespace: Some("ci".to_string()),
//!         console_url: Some("https://console.example.com".to_string()),
//!         components: PlatformComponents::default(),
//!         required_crds: vec!["certificates.cert-manager.io".to_string()],
//!     },
//! );
//! ```

pub mod allowlist;
pub mod capabilities;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod kube_api;
pub mod labels;
pub mod manifests;
pub mod metrics;
pub mod overlay;
pub mod ownership;
pub mod reconcilers;
pub mod status_reasons;
pub mod tracking;

#[cfg(test)]
pub(crate) mod testing;
