// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired-state object graphs for each platform component.
//!
//! A component builder turns its custom resource spec into a [`ComponentManifests`]:
//! every object the component needs plus the operator-managed environment variables
//! that are layered onto its Deployments with the customization overlay.
//!
//! - [`pipelines`] - pipeline controller and admission webhook
//! - [`dashboard`] - web dashboard

pub mod common;
pub mod dashboard;
pub mod pipelines;

use crate::allowlist::ClusterScopedAllowList;
use common::kind_gvk;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::core::GroupVersionKind;
use kube::ResourceExt;

/// Everything one component installs.
#[derive(Clone, Debug)]
pub struct ComponentManifests {
    pub namespace: String,
    pub version: String,
    pub service_account: ServiceAccount,
    pub cluster_role: ClusterRole,
    pub cluster_role_binding: ClusterRoleBinding,
    pub config_map: ConfigMap,
    pub deployments: Vec<Deployment>,
    /// Variables set on every container of every Deployment, overriding user input
    pub system_env: Vec<(String, String)>,
}

impl ComponentManifests {
    /// Kinds a component manages, in cleanup order.
    #[must_use]
    pub fn managed_gvks() -> Vec<GroupVersionKind> {
        vec![
            kind_gvk::<Deployment>(),
            kind_gvk::<ConfigMap>(),
            kind_gvk::<ClusterRoleBinding>(),
            kind_gvk::<ClusterRole>(),
            kind_gvk::<ServiceAccount>(),
        ]
    }

    /// Cluster-scoped names cleanup may remove for this component.
    ///
    /// Only the component's own ClusterRole and ClusterRoleBinding are eligible.
    #[must_use]
    pub fn cluster_allow_list(&self) -> ClusterScopedAllowList {
        ClusterScopedAllowList::new()
            .allow(kind_gvk::<ClusterRole>(), [self.cluster_role.name_any()])
            .allow(
                kind_gvk::<ClusterRoleBinding>(),
                [self.cluster_role_binding.name_any()],
            )
    }
}
