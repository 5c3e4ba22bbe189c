// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pipeline engine manifests: controller and admission webhook.

use super::common::{
    build_cluster_role, build_cluster_role_binding, build_config_map, build_container,
    build_deployment, build_service_account, image_ref, policy_rule, ContainerParams,
};
use super::ComponentManifests;
use crate::constants::{
    COMPONENT_METRICS_PORT, DEFAULT_PLATFORM_VERSION, ENV_INSTALLED_NAMESPACE,
    PIPELINES_CONTROLLER_IMAGE, PIPELINES_CONTROLLER_NAME, PIPELINES_WEBHOOK_IMAGE,
    PIPELINES_WEBHOOK_NAME, WEBHOOK_HTTPS_PORT,
};
use crate::crd::PipelineEngineSpec;
use crate::labels::COMPONENT_PIPELINES;
use k8s_openapi::api::rbac::v1::PolicyRule;
use std::collections::BTreeMap;
use tracing::debug;

/// Name shared by the ServiceAccount, ClusterRole and ClusterRoleBinding
pub const PIPELINES_RBAC_NAME: &str = "plinth-pipelines";

/// Name of the pipeline defaults ConfigMap
pub const PIPELINES_CONFIG_NAME: &str = "plinth-pipelines-config";

const PIPELINE_API_GROUP: &str = "pipelines.plinth.dev";

fn rules() -> Vec<PolicyRule> {
    vec![
        policy_rule(
            &[""],
            &["pods", "pods/log", "persistentvolumeclaims", "configmaps", "secrets"],
            &["get", "list", "watch", "create", "update", "patch", "delete"],
        ),
        policy_rule(&[""], &["events"], &["create", "patch"]),
        policy_rule(
            &[PIPELINE_API_GROUP],
            &["pipelines", "pipelineruns", "tasks", "taskruns"],
            &["get", "list", "watch", "create", "update", "patch", "delete"],
        ),
        policy_rule(
            &[PIPELINE_API_GROUP],
            &["pipelineruns/status", "taskruns/status"],
            &["get", "update", "patch"],
        ),
        policy_rule(&["coordination.k8s.io"], &["leases"], &["get", "create", "update"]),
    ]
}

/// Build the desired state of a `PipelineEngine`.
#[must_use]
pub fn build(spec: &PipelineEngineSpec) -> ComponentManifests {
    let namespace = spec.target_namespace.as_str();
    let version = spec
        .options
        .version
        .as_deref()
        .unwrap_or(DEFAULT_PLATFORM_VERSION);
    debug!(namespace = %namespace, version = %version, "Building pipeline engine manifests");

    let controller = build_container(ContainerParams {
        name: PIPELINES_CONTROLLER_NAME,
        image: image_ref(PIPELINES_CONTROLLER_IMAGE, version),
        args: vec![format!("--config-map={PIPELINES_CONFIG_NAME}")],
        ports: vec![("metrics", COMPONENT_METRICS_PORT)],
        env: vec![("LOG_LEVEL", "info".to_string())],
        requests: ("100m", "128Mi"),
        limits: ("1", "512Mi"),
    });

    let webhook = build_container(ContainerParams {
        name: PIPELINES_WEBHOOK_NAME,
        image: image_ref(PIPELINES_WEBHOOK_IMAGE, version),
        args: vec![format!("--port={WEBHOOK_HTTPS_PORT}")],
        ports: vec![
            ("https-webhook", WEBHOOK_HTTPS_PORT),
            ("metrics", COMPONENT_METRICS_PORT),
        ],
        env: vec![("LOG_LEVEL", "info".to_string())],
        requests: ("50m", "64Mi"),
        limits: ("500m", "256Mi"),
    });

    let config = BTreeMap::from([
        ("version".to_string(), version.to_string()),
        ("default-timeout-minutes".to_string(), "60".to_string()),
        ("default-service-account".to_string(), "default".to_string()),
    ]);

    ComponentManifests {
        namespace: namespace.to_string(),
        version: version.to_string(),
        service_account: build_service_account(
            namespace,
            PIPELINES_RBAC_NAME,
            COMPONENT_PIPELINES,
            version,
        ),
        cluster_role: build_cluster_role(PIPELINES_RBAC_NAME, COMPONENT_PIPELINES, version, rules()),
        cluster_role_binding: build_cluster_role_binding(
            PIPELINES_RBAC_NAME,
            COMPONENT_PIPELINES,
            version,
            namespace,
            PIPELINES_RBAC_NAME,
        ),
        config_map: build_config_map(
            namespace,
            PIPELINES_CONFIG_NAME,
            COMPONENT_PIPELINES,
            version,
            config,
        ),
        deployments: vec![
            build_deployment(
                namespace,
                PIPELINES_CONTROLLER_NAME,
                COMPONENT_PIPELINES,
                version,
                PIPELINES_RBAC_NAME,
                vec![controller],
            ),
            build_deployment(
                namespace,
                PIPELINES_WEBHOOK_NAME,
                COMPONENT_PIPELINES,
                version,
                PIPELINES_RBAC_NAME,
                vec![webhook],
            ),
        ],
        system_env: vec![(ENV_INSTALLED_NAMESPACE.to_string(), namespace.to_string())],
    }
}
