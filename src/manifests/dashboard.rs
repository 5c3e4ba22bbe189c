// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dashboard manifests.

use super::common::{
    build_cluster_role, build_cluster_role_binding, build_config_map, build_container,
    build_deployment, build_service_account, image_ref, policy_rule, ContainerParams,
};
use super::ComponentManifests;
use crate::constants::{
    DASHBOARD_DEPLOYMENT_NAME, DASHBOARD_HTTP_PORT, DASHBOARD_IMAGE, DEFAULT_PLATFORM_VERSION,
    ENV_CONSOLE_URL, ENV_INSTALLED_NAMESPACE,
};
use crate::crd::DashboardSpec;
use crate::labels::COMPONENT_DASHBOARD;
use std::collections::BTreeMap;
use tracing::debug;

/// Name shared by the ServiceAccount, ClusterRole and ClusterRoleBinding
pub const DASHBOARD_RBAC_NAME: &str = "plinth-dashboard";

/// Name of the dashboard settings ConfigMap
pub const DASHBOARD_CONFIG_NAME: &str = "plinth-dashboard-config";

/// Build the desired state of a `Dashboard`.
///
/// The console URL, when set, is injected as a system variable so it cannot be
/// overridden through the Deployment customization.
#[must_use]
pub fn build(spec: &DashboardSpec) -> ComponentManifests {
    let namespace = spec.target_namespace.as_str();
    let version = spec
        .options
        .version
        .as_deref()
        .unwrap_or(DEFAULT_PLATFORM_VERSION);
    debug!(namespace = %namespace, version = %version, "Building dashboard manifests");

    let container = build_container(ContainerParams {
        name: DASHBOARD_DEPLOYMENT_NAME,
        image: image_ref(DASHBOARD_IMAGE, version),
        args: vec![
            format!("--port={DASHBOARD_HTTP_PORT}"),
            format!("--config-map={DASHBOARD_CONFIG_NAME}"),
        ],
        ports: vec![("http", DASHBOARD_HTTP_PORT)],
        env: vec![("LOG_LEVEL", "info".to_string())],
        requests: ("50m", "64Mi"),
        limits: ("500m", "256Mi"),
    });

    let rules = vec![
        policy_rule(
            &["", "apps"],
            &["pods", "pods/log", "events", "namespaces", "deployments"],
            &["get", "list", "watch"],
        ),
        policy_rule(
            &["pipelines.plinth.dev"],
            &["pipelines", "pipelineruns", "tasks", "taskruns"],
            &["get", "list", "watch"],
        ),
    ];

    let mut system_env = vec![(ENV_INSTALLED_NAMESPACE.to_string(), namespace.to_string())];
    if let Some(url) = spec.console_url.as_deref().filter(|u| !u.is_empty()) {
        system_env.push((ENV_CONSOLE_URL.to_string(), url.to_string()));
    }

    ComponentManifests {
        namespace: namespace.to_string(),
        version: version.to_string(),
        service_account: build_service_account(
            namespace,
            DASHBOARD_RBAC_NAME,
            COMPONENT_DASHBOARD,
            version,
        ),
        cluster_role: build_cluster_role(DASHBOARD_RBAC_NAME, COMPONENT_DASHBOARD, version, rules),
        cluster_role_binding: build_cluster_role_binding(
            DASHBOARD_RBAC_NAME,
            COMPONENT_DASHBOARD,
            version,
            namespace,
            DASHBOARD_RBAC_NAME,
        ),
        config_map: build_config_map(
            namespace,
            DASHBOARD_CONFIG_NAME,
            COMPONENT_DASHBOARD,
            version,
            BTreeMap::from([("read-only".to_string(), "true".to_string())]),
        ),
        deployments: vec![build_deployment(
            namespace,
            DASHBOARD_DEPLOYMENT_NAME,
            COMPONENT_DASHBOARD,
            version,
            DASHBOARD_RBAC_NAME,
            vec![container],
        )],
        system_env,
    }
}
