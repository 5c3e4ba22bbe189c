// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for the Plinth platform.
//!
//! All resources are cluster-scoped and live in the `operator.plinth.dev/v1alpha1`
//! API group.
//!
//! # Resource Types
//!
//! - [`PlatformConfig`] - Root resource describing the whole platform installation
//! - [`PipelineEngine`] - Pipeline controller and admission webhook
//! - [`Dashboard`] - Web dashboard
//!
//! A `PlatformConfig` creates one `PipelineEngine` named `pipeline` and one
//! `Dashboard` named `dashboard`, each enabled independently.
//!
//! # Example: Customizing a component Deployment
//!
//! ```rust,no_run
//! use plinth::crd::{ComponentOptions, ContainerOverride, DeploymentOverride, ResourceQuantities,
//!     ResourceRequirementsOverride};
//! use std::collections::BTreeMap;
//!
//! let options = ComponentOptions {
//!     version: None,
//!     deployments: BTreeMap::from([(
//!         "plinth-dashboard".to_string(),
//!         DeploymentOverride {
//!             replicas: Some(2),
//!             containers: vec![ContainerOverride {
//!                 name: "plinth-dashboard".to_string(),
//!                 resources: Some(ResourceRequirementsOverride {
//!                     requests: None,
//!                     limits: Some(ResourceQuantities {
//!                         cpu: Some("500m".to_string()),
//!                         memory: None,
//!                     }),
//!                 }),
//!                 env: vec![],
//!             }],
//!         },
//!     )]),
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Common types include: Ready, DependenciesReady.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

// ============================================================================
// Customization
// ============================================================================

/// CPU and memory quantities.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub struct ResourceQuantities {
    /// CPU quantity (e.g., "100m", "1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    /// Memory quantity (e.g., "128Mi", "1Gi")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Partial resource requirements for a container.
///
/// Only the quantities given are changed; everything else keeps the generated value.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub struct ResourceRequirementsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceQuantities>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceQuantities>,
}

/// Plain environment variable for a container.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub struct EnvVarOverride {
    pub name: String,
    pub value: String,
}

/// Overrides for one container of a generated Deployment.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    /// Name of the container to customize
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirementsOverride>,

    /// Extra variables. Variables computed by the operator take precedence on name
    /// conflicts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVarOverride>,
}

/// Overrides for one generated Deployment.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOverride {
    /// Replica count; zero or unset keeps the generated value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0, max = 2_147_483_647))]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerOverride>,
}

/// Options shared by every component.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOptions {
    /// Component version (image tag). Defaults to the operator's platform version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Deployment customizations keyed by Deployment name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deployments: BTreeMap<String, DeploymentOverride>,
}

// ============================================================================
// PlatformConfig
// ============================================================================

fn default_enabled() -> bool {
    true
}

/// Toggle and options for one platform component.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Whether the component is installed. Disabling removes it.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub options: ComponentOptions,
}

impl Default for ComponentSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            options: ComponentOptions::default(),
        }
    }
}

/// Components managed by a `PlatformConfig`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformComponents {
    #[serde(default)]
    pub pipelines: ComponentSpec,

    #[serde(default)]
    pub dashboard: ComponentSpec,
}

/// `PlatformConfig` describes one installation of the platform.
///
/// # Example
///
/// ```yaml
/// apiVersion: operator.plinth.dev/v1alpha1
/// kind: PlatformConfig
/// metadata:
///   name: platform
/// spec:
///   targetNamespace: plinth-pipelines
///   consoleUrl: https://console.example.com
///   components:
///     pipelines:
///       enabled: true
///     dashboard:
///       enabled: false
///   requiredCrds:
///     - certificates.cert-manager.io
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "operator.plinth.dev",
    version = "v1alpha1",
    kind = "PlatformConfig",
    shortname = "pcfg",
    doc = "PlatformConfig is the root resource of a Plinth installation. It selects the target namespace and enables the pipeline engine and dashboard components.",
    printcolumn = r#"{"name":"Namespace","type":"string","jsonPath":".spec.targetNamespace"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[kube(status = "PlatformConfigStatus")]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfigSpec {
    /// Namespace the components are installed into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,

    /// Externally reachable URL of the dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_url: Option<String>,

    #[serde(default)]
    pub components: PlatformComponents,

    /// CRDs that must be installed before the platform reports Ready
    /// (e.g. `certificates.cert-manager.io`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_crds: Vec<String>,
}

/// `PlatformConfig` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfigStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,
}

// ============================================================================
// Components
// ============================================================================

/// Status shared by component resources.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Version currently installed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// `PipelineEngine` installs the pipeline controller and its admission webhook.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "operator.plinth.dev",
    version = "v1alpha1",
    kind = "PipelineEngine",
    doc = "PipelineEngine installs the pipeline controller and admission webhook into the target namespace.",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.version"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[kube(status = "ComponentStatus")]
#[serde(rename_all = "camelCase")]
pub struct PipelineEngineSpec {
    /// Namespace the component is installed into.
    pub target_namespace: String,

    #[serde(default)]
    pub options: ComponentOptions,
}

/// `Dashboard` installs the platform web dashboard.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "operator.plinth.dev",
    version = "v1alpha1",
    kind = "Dashboard",
    doc = "Dashboard installs the platform web dashboard into the target namespace.",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.version"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[kube(status = "ComponentStatus")]
#[serde(rename_all = "camelCase")]
pub struct DashboardSpec {
    /// Namespace the component is installed into.
    pub target_namespace: String,

    /// Externally reachable URL, injected as `CONSOLE_URL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_url: Option<String>,

    #[serde(default)]
    pub options: ComponentOptions,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
