// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Plinth operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all Plinth CRDs
pub const API_GROUP: &str = "operator.plinth.dev";

/// API version for all Plinth CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "operator.plinth.dev/v1alpha1";

/// Kind name for the root `PlatformConfig` resource
pub const KIND_PLATFORM_CONFIG: &str = "PlatformConfig";

/// Kind name for `PipelineEngine` resource
pub const KIND_PIPELINE_ENGINE: &str = "PipelineEngine";

/// Kind name for `Dashboard` resource
pub const KIND_DASHBOARD: &str = "Dashboard";

/// API group of `CustomResourceDefinition` objects
pub const CRD_API_GROUP: &str = "apiextensions.k8s.io";

/// Kind name of `CustomResourceDefinition` objects
pub const KIND_CUSTOM_RESOURCE_DEFINITION: &str = "CustomResourceDefinition";

// ============================================================================
// Sub-resource Names
// ============================================================================

/// Fixed name of the `PipelineEngine` created by a `PlatformConfig`
pub const PIPELINE_ENGINE_NAME: &str = "pipeline";

/// Fixed name of the `Dashboard` created by a `PlatformConfig`
pub const DASHBOARD_NAME: &str = "dashboard";

/// Default namespace the platform components are installed into
pub const DEFAULT_TARGET_NAMESPACE: &str = "plinth-pipelines";

// ============================================================================
// Component Workloads
// ============================================================================

/// Deployment and container name of the pipeline controller
pub const PIPELINES_CONTROLLER_NAME: &str = "plinth-pipelines-controller";

/// Deployment and container name of the pipeline admission webhook
pub const PIPELINES_WEBHOOK_NAME: &str = "plinth-pipelines-webhook";

/// Deployment and container name of the dashboard
pub const DASHBOARD_DEPLOYMENT_NAME: &str = "plinth-dashboard";

/// Default image for the pipeline controller
pub const PIPELINES_CONTROLLER_IMAGE: &str = "ghcr.io/plinth-dev/pipelines-controller";

/// Default image for the pipeline webhook
pub const PIPELINES_WEBHOOK_IMAGE: &str = "ghcr.io/plinth-dev/pipelines-webhook";

/// Default image for the dashboard
pub const DASHBOARD_IMAGE: &str = "ghcr.io/plinth-dev/dashboard";

/// Default platform version installed when a component does not pin one
pub const DEFAULT_PLATFORM_VERSION: &str = "v0.62.1";

/// Container port the dashboard serves HTTP on
pub const DASHBOARD_HTTP_PORT: i32 = 9097;

/// Container port the pipeline webhook serves admission requests on
pub const WEBHOOK_HTTPS_PORT: i32 = 8443;

/// Container port for component metrics
pub const COMPONENT_METRICS_PORT: i32 = 9090;

/// Environment variable carrying the externally reachable dashboard URL
pub const ENV_CONSOLE_URL: &str = "CONSOLE_URL";

/// Environment variable carrying the namespace components are installed into
pub const ENV_INSTALLED_NAMESPACE: &str = "INSTALLED_NAMESPACE";

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue interval for resources that are ready (5 minutes)
pub const READY_REQUEUE_DURATION_SECS: u64 = 300;

/// Requeue interval for resources that are not ready yet (30 seconds)
pub const NOT_READY_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue interval after a dependency check failed transiently
pub const DEPENDENCY_CHECK_RETRY_SECS: u64 = 10;

/// Requeue interval while a required dependency is confirmed missing
pub const DEPENDENCY_MISSING_REQUEUE_SECS: u64 = 60;

// ============================================================================
// Cluster Version Polling
// ============================================================================

/// Default interval between cluster version checks
pub const DEFAULT_VERSION_POLL_INTERVAL_SECS: u64 = 300;

/// Capacity of the cluster version change channel
pub const VERSION_CHANGE_CHANNEL_CAPACITY: usize = 1;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Field manager used for server-side apply
pub const DEFAULT_FIELD_MANAGER: &str = "plinth-operator";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
