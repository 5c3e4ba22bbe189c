// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the apply, cleanup and overlay core.
//!
//! This module provides specialized error types for:
//! - Kubernetes object API calls made through [`crate::kube_api::ObjectApi`]
//! - Ownership stamping and orphan cleanup in [`crate::tracking::TrackingClient`]
//! - Deployment customization in [`crate::overlay`]
//!
//! Reconcilers convert these into `anyhow::Error` at their boundary.

use kube::core::GroupVersionKind;
use thiserror::Error;

/// Errors returned by an [`crate::kube_api::ObjectApi`] implementation.
///
/// The variants the core reacts to (not found, already exists, missing kind)
/// are normalized here so the tracking client never has to inspect HTTP codes.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The object does not exist (HTTP 404).
    #[error("{resource} not found")]
    NotFound {
        /// Display form of the resource key
        resource: String,
    },

    /// The object already exists (HTTP 409 with reason `AlreadyExists`).
    #[error("{resource} already exists")]
    AlreadyExists {
        /// Display form of the resource key
        resource: String,
    },

    /// Any other write conflict (HTTP 409), e.g. a stale resource version.
    #[error("conflict on {resource}: {message}")]
    Conflict {
        /// Display form of the resource key
        resource: String,
        /// Message reported by the API server
        message: String,
    },

    /// The kind is not served by the cluster, typically because its CRD is not installed.
    #[error("no matches for kind {kind} in version {group_version}")]
    MissingKind {
        /// Kind that could not be resolved
        kind: String,
        /// `group/version` the kind was looked up in
        group_version: String,
    },

    /// The object lacks the identity fields needed to address it.
    #[error("invalid object: {reason}")]
    InvalidObject {
        /// Explanation of what is missing
        reason: String,
    },

    /// Any other Kubernetes client error.
    #[error(transparent)]
    Kube(#[from] kube::Error),

    /// The object could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Returns `true` when the error means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when the error means a create raced with an existing object.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` when the kind is not installed on the cluster.
    #[must_use]
    pub fn is_missing_kind(&self) -> bool {
        matches!(self, Self::MissingKind { .. })
    }
}

/// Errors returned by the tracking client.
#[derive(Error, Debug)]
pub enum TrackingError {
    /// An ownership-requiring operation was called on a client built without
    /// an `OwnershipConfig`. This is a programmer error and is never retried.
    #[error("tracking client has no ownership config; cannot {operation}")]
    MissingOwnershipConfig {
        /// Operation that required ownership
        operation: &'static str,
    },

    /// The object is already controlled by a different owner.
    #[error("{resource} is already controlled by {kind}/{name} (uid {uid})")]
    AlreadyControlled {
        /// Display form of the resource key
        resource: String,
        /// Kind of the existing controller
        kind: String,
        /// Name of the existing controller
        name: String,
        /// UID of the existing controller
        uid: String,
    },

    /// The object is missing identity fields (apiVersion, kind or name).
    #[error("invalid object: {reason}")]
    InvalidObject {
        /// Explanation of what is missing
        reason: String,
    },

    /// The owner custom resource cannot be referenced (no UID yet).
    #[error("owner {kind}/{name} has no uid; it must be read from the API server first")]
    OwnerWithoutUid {
        /// Owner kind
        kind: String,
        /// Owner name
        name: String,
    },

    /// An API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Orphan cleanup failed for one GVK; the whole cleanup is aborted.
    #[error("orphan cleanup failed for {}/{} {}: {source}", gvk.group, gvk.version, gvk.kind)]
    Cleanup {
        /// GVK whose cleanup failed
        gvk: GroupVersionKind,
        /// Underlying failure
        #[source]
        source: ApiError,
    },

    /// A cleanup task panicked or was cancelled by the runtime.
    #[error("orphan cleanup task for {kind} did not complete: {reason}")]
    CleanupTask {
        /// Kind handled by the task
        kind: String,
        /// Join failure description
        reason: String,
    },

    /// A typed object could not be converted to a dynamic object.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned while applying a deployment customization overlay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// A resource quantity string is not a valid Kubernetes quantity.
    #[error("invalid {field} quantity '{value}' for container '{container}'")]
    InvalidQuantity {
        /// Container the quantity was meant for
        container: String,
        /// Field name, e.g. `limits.cpu`
        field: String,
        /// The rejected value
        value: String,
    },

    /// An environment variable override has an empty name.
    #[error("environment variable with empty name for container '{container}'")]
    EmptyEnvName {
        /// Container the variable was meant for
        container: String,
    },
}
