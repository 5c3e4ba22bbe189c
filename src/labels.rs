// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and Plinth-specific labels
//! to ensure consistency across all resources created by the controller.
//! The ownership labels are only defaults: every tracking client receives its
//! label keys through [`crate::ownership::OwnershipConfig`].

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Standard label for the current version of the application
pub const K8S_VERSION: &str = "app.kubernetes.io/version";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of` indicating this resource is part of Plinth
pub const PART_OF_PLINTH: &str = "plinth";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_PLINTH_OPERATOR: &str = "plinth-operator";

/// Component value for the root platform configuration
pub const COMPONENT_PLATFORM: &str = "platform";

/// Component value for the pipeline engine
pub const COMPONENT_PIPELINES: &str = "pipelines";

/// Component value for the dashboard
pub const COMPONENT_DASHBOARD: &str = "dashboard";

// ============================================================================
// Plinth Ownership Labels
// ============================================================================

/// Label carrying the name of the custom resource that owns a generated object
pub const PLINTH_OWNER_LABEL: &str = "operator.plinth.dev/owned-by";

/// Label carrying the logical component that generated an object
pub const PLINTH_COMPONENT_LABEL: &str = "operator.plinth.dev/component";

/// Build the standard label set for a generated component workload.
///
/// Ownership labels are not included here; they are stamped by the tracking
/// client when the object is applied.
#[must_use]
pub fn build_component_labels(component: &str, name: &str, version: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), name.into());
    labels.insert(K8S_COMPONENT.into(), component.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_PLINTH.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_PLINTH_OPERATOR.into());
    labels.insert(K8S_VERSION.into(), version.into());
    labels
}

/// Build the selector labels for a workload.
///
/// Selector labels must never include the version, since a Deployment
/// selector is immutable.
#[must_use]
pub fn build_selector_labels(component: &str, name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), name.into());
    labels.insert(K8S_COMPONENT.into(), component.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_PLINTH.into());
    labels
}
