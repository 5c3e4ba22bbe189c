// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for Plinth resources.
//!
//! This module defines constants for condition reasons following Kubernetes conventions.
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Hierarchy
//!
//! - **`PlatformConfig`** → aggregates `PipelineEngine` and `Dashboard`
//! - **`PipelineEngine`** / **`Dashboard`** → aggregate their Deployments
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: DependencyMissing
//!       message: "Required CRD certificates.cert-manager.io is not installed"
//!     - type: DependenciesReady
//!       status: "False"
//!       reason: DependencyMissing
//!       message: "Required CRD certificates.cert-manager.io is not installed"
//! ```

// ============================================================================
// Common Reasons (All Resources)
// ============================================================================

/// All child resources are ready and healthy.
pub const REASON_ALL_READY: &str = "AllReady";

/// Resource is ready and operational.
pub const REASON_READY: &str = "Ready";

/// No child resources are ready.
pub const REASON_NOT_READY: &str = "NotReady";

/// There are no child resources to wait for.
pub const REASON_NO_COMPONENTS: &str = "NoComponents";

/// Child resource has not reported any condition yet.
pub const REASON_PENDING: &str = "Pending";

/// Resources are being created or updated.
pub const REASON_PROGRESSING: &str = "Progressing";

/// Generated resources could not be applied.
pub const REASON_APPLY_FAILED: &str = "ApplyFailed";

/// The component customization could not be applied.
pub const REASON_CUSTOMIZATION_INVALID: &str = "CustomizationInvalid";

// ============================================================================
// Deployment Reasons
// ============================================================================

/// Deployment has all desired replicas available.
pub const REASON_DEPLOYMENT_AVAILABLE: &str = "DeploymentAvailable";

/// Deployment has fewer available replicas than desired.
pub const REASON_DEPLOYMENT_UNAVAILABLE: &str = "DeploymentUnavailable";

/// Deployment has exceeded its progress deadline.
pub const REASON_PROGRESS_DEADLINE_EXCEEDED: &str = "ProgressDeadlineExceeded";

// ============================================================================
// Dependency Reasons
// ============================================================================

/// All required external dependencies are installed.
pub const REASON_DEPENDENCIES_INSTALLED: &str = "DependenciesInstalled";

/// A required external dependency is confirmed missing.
pub const REASON_DEPENDENCY_MISSING: &str = "DependencyMissing";

/// The dependency check itself failed (RBAC, network, discovery errors).
pub const REASON_DEPENDENCY_CHECK_FAILED: &str = "DependencyCheckFailed";

// ============================================================================
// Condition Types
// ============================================================================

/// Encompassing readiness condition.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition reporting whether external dependencies are installed.
pub const CONDITION_TYPE_DEPENDENCIES_READY: &str = "DependenciesReady";

// ============================================================================
// Condition Status Values
// ============================================================================

/// Condition status `True`.
pub const STATUS_TRUE: &str = "True";

/// Condition status `False`.
pub const STATUS_FALSE: &str = "False";

/// Condition status `Unknown`.
pub const STATUS_UNKNOWN: &str = "Unknown";
