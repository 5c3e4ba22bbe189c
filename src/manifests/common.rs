// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Builders shared by every component.
//!
//! Generated objects carry the standard `app.kubernetes.io/*` labels only. Ownership
//! labels and owner references are stamped later by the tracking client when the
//! object is applied.

use crate::labels::{build_component_labels, build_selector_labels};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, ConfigMap, Container, ContainerPort, EnvVar, Namespace, PodSecurityContext,
    PodSpec, PodTemplateSpec, Probe, ResourceRequirements, SecurityContext, ServiceAccount,
    TCPSocketAction,
};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::core::GroupVersionKind;
use kube::Resource;
use std::collections::BTreeMap;

/// Non-root UID every component container runs as
const COMPONENT_NONROOT_UID: i64 = 65532;

const PROBE_INITIAL_DELAY_SECS: i32 = 5;
const PROBE_PERIOD_SECS: i32 = 10;

/// GVK of a typed Kubernetes resource.
#[must_use]
pub fn kind_gvk<K: Resource<DynamicType = ()>>() -> GroupVersionKind {
    GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()))
}

/// Image reference for a component at a version.
#[must_use]
pub fn image_ref(image: &str, version: &str) -> String {
    format!("{image}:{version}")
}

/// Build the target Namespace.
#[must_use]
pub fn build_namespace(name: &str, component: &str, version: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(build_component_labels(component, name, version)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Build the ServiceAccount a component runs as.
#[must_use]
pub fn build_service_account(
    namespace: &str,
    name: &str,
    component: &str,
    version: &str,
) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            labels: Some(build_component_labels(component, name, version)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Shorthand for one RBAC rule.
#[must_use]
pub fn policy_rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(api_groups.iter().map(ToString::to_string).collect()),
        resources: Some(resources.iter().map(ToString::to_string).collect()),
        verbs: verbs.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}

/// Build a ClusterRole.
#[must_use]
pub fn build_cluster_role(
    name: &str,
    component: &str,
    version: &str,
    rules: Vec<PolicyRule>,
) -> ClusterRole {
    ClusterRole {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(build_component_labels(component, name, version)),
            ..Default::default()
        },
        rules: Some(rules),
        ..Default::default()
    }
}

/// Bind the ClusterRole of the same name to a ServiceAccount.
#[must_use]
pub fn build_cluster_role_binding(
    name: &str,
    component: &str,
    version: &str,
    service_account_namespace: &str,
    service_account_name: &str,
) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(build_component_labels(component, name, version)),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: name.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: service_account_name.to_string(),
            namespace: Some(service_account_namespace.to_string()),
            ..Default::default()
        }]),
    }
}

/// Build a ConfigMap.
#[must_use]
pub fn build_config_map(
    namespace: &str,
    name: &str,
    component: &str,
    version: &str,
    data: BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            labels: Some(build_component_labels(component, name, version)),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Container settings for [`build_container`].
#[derive(Clone, Debug, Default)]
pub struct ContainerParams<'a> {
    pub name: &'a str,
    pub image: String,
    pub args: Vec<String>,
    /// `(port name, container port)`; the first port is probed
    pub ports: Vec<(&'a str, i32)>,
    pub env: Vec<(&'a str, String)>,
    /// `(cpu, memory)` requests
    pub requests: (&'a str, &'a str),
    /// `(cpu, memory)` limits
    pub limits: (&'a str, &'a str),
}

fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}

fn tcp_probe(port: i32) -> Probe {
    Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECS),
        period_seconds: Some(PROBE_PERIOD_SECS),
        ..Default::default()
    }
}

/// Build a hardened component container.
#[must_use]
pub fn build_container(params: ContainerParams<'_>) -> Container {
    let probe_port = params.ports.first().map(|(_, port)| *port);

    Container {
        name: params.name.into(),
        image: Some(params.image),
        image_pull_policy: Some("IfNotPresent".into()),
        args: (!params.args.is_empty()).then_some(params.args),
        ports: Some(
            params
                .ports
                .iter()
                .map(|(name, port)| ContainerPort {
                    name: Some((*name).into()),
                    container_port: *port,
                    protocol: Some("TCP".into()),
                    ..Default::default()
                })
                .collect(),
        ),
        env: Some(
            params
                .env
                .into_iter()
                .map(|(name, value)| EnvVar {
                    name: name.into(),
                    value: Some(value),
                    ..Default::default()
                })
                .collect(),
        ),
        resources: Some(ResourceRequirements {
            requests: Some(quantities(params.requests.0, params.requests.1)),
            limits: Some(quantities(params.limits.0, params.limits.1)),
            ..Default::default()
        }),
        liveness_probe: probe_port.map(tcp_probe),
        readiness_probe: probe_port.map(tcp_probe),
        security_context: Some(SecurityContext {
            run_as_non_root: Some(true),
            allow_privilege_escalation: Some(false),
            read_only_root_filesystem: Some(true),
            capabilities: Some(Capabilities {
                drop: Some(vec!["ALL".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build a single-replica Deployment running `containers`.
#[must_use]
pub fn build_deployment(
    namespace: &str,
    name: &str,
    component: &str,
    version: &str,
    service_account: &str,
    containers: Vec<Container>,
) -> Deployment {
    let labels = build_component_labels(component, name, version);
    let selector = build_selector_labels(component, name);

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers,
                    service_account_name: Some(service_account.into()),
                    security_context: Some(PodSecurityContext {
                        run_as_user: Some(COMPONENT_NONROOT_UID),
                        run_as_group: Some(COMPONENT_NONROOT_UID),
                        run_as_non_root: Some(true),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
