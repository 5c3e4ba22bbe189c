// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `PlatformConfig` reconciliation.
//!
//! The root resource owns the target Namespace and one custom resource per enabled
//! component (`PipelineEngine/pipeline`, `Dashboard/dashboard`). Disabling a
//! component removes its resource through orphan cleanup, and the component's own
//! objects are then garbage collected through their owner references.
//!
//! `Ready` aggregates the components' own `Ready` conditions. When `requiredCrds`
//! names CRDs that are confirmed missing, `Ready` is forced to `False`; a failed
//! check only shortens the requeue.

use crate::allowlist::ClusterScopedAllowList;
use crate::capabilities::crd_installed;
use crate::constants::{
    DASHBOARD_NAME, DEFAULT_PLATFORM_VERSION, DEFAULT_TARGET_NAMESPACE, PIPELINE_ENGINE_NAME,
};
use crate::context::Context;
use crate::crd::{
    Condition, Dashboard, DashboardSpec, PipelineEngine, PipelineEngineSpec, PlatformConfig,
    PlatformConfigStatus,
};
use crate::kube_api::ObjectApi;
use crate::labels::COMPONENT_PLATFORM;
use crate::manifests::common::{build_namespace, kind_gvk};
use crate::metrics;
use crate::reconcilers::aggregate::{
    aggregate_ready, apply_dependency_override, combine_dependencies, evaluate_dependency,
    DependencyCheckOutcome, SubCrStatus,
};
use crate::reconcilers::component::record_cleanup;
use crate::reconcilers::status::{conditions_equal, patch_status, set_condition};
use crate::reconcilers::{is_ready, requeue_action};
use crate::tracking::{CleanupOptions, CleanupReport, TrackingClient};
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of applying the root resource.
#[derive(Clone, Debug)]
pub struct PlatformOutcome {
    pub target_namespace: String,
    /// `Ready` after the dependency override
    pub ready: Condition,
    pub dependencies: DependencyCheckOutcome,
    pub cleanup: CleanupReport,
}

/// Namespace the components are installed into.
#[must_use]
pub fn target_namespace(config: &PlatformConfig) -> String {
    config
        .spec
        .target_namespace
        .clone()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_TARGET_NAMESPACE.to_string())
}

/// Kinds owned by the root resource, in cleanup order.
#[must_use]
pub fn platform_gvks() -> Vec<GroupVersionKind> {
    vec![
        kind_gvk::<PipelineEngine>(),
        kind_gvk::<Dashboard>(),
        kind_gvk::<Namespace>(),
    ]
}

/// Cluster-scoped names root cleanup may delete.
///
/// Only the fixed component resource names are eligible; namespaces are never
/// deleted by cleanup.
#[must_use]
pub fn platform_allow_list() -> ClusterScopedAllowList {
    ClusterScopedAllowList::new()
        .allow(kind_gvk::<PipelineEngine>(), [PIPELINE_ENGINE_NAME])
        .allow(kind_gvk::<Dashboard>(), [DASHBOARD_NAME])
        .deny_all(kind_gvk::<Namespace>())
}

/// Desired `PipelineEngine` for a platform.
#[must_use]
pub fn build_pipeline_engine(config: &PlatformConfig, namespace: &str) -> PipelineEngine {
    PipelineEngine::new(
        PIPELINE_ENGINE_NAME,
        PipelineEngineSpec {
            target_namespace: namespace.to_string(),
            options: config.spec.components.pipelines.options.clone(),
        },
    )
}

/// Desired `Dashboard` for a platform.
#[must_use]
pub fn build_dashboard(config: &PlatformConfig, namespace: &str) -> Dashboard {
    Dashboard::new(
        DASHBOARD_NAME,
        DashboardSpec {
            target_namespace: namespace.to_string(),
            console_url: config.spec.console_url.clone(),
            options: config.spec.components.dashboard.options.clone(),
        },
    )
}

/// Conditions reported in the `status` of a component resource as returned by apply.
fn conditions_of(obj: &DynamicObject) -> Vec<Condition> {
    obj.data
        .get("status")
        .and_then(|status| status.get("conditions"))
        .and_then(|conditions| serde_json::from_value(conditions.clone()).ok())
        .unwrap_or_default()
}

/// Check every required CRD.
pub async fn check_dependencies(api: &dyn ObjectApi, required: &[String]) -> DependencyCheckOutcome {
    let mut outcomes = Vec::with_capacity(required.len());
    for name in required {
        let outcome = evaluate_dependency(name, crd_installed(api, name).await);
        debug!(crd = %name, status = ?outcome.condition.status, "Checked required CRD");
        outcomes.push(outcome);
    }
    combine_dependencies(outcomes)
}

/// Apply the root resource's object graph, remove disabled components and compute
/// readiness.
///
/// # Errors
///
/// Returns an error if any apply or the orphan cleanup fails.
pub async fn apply_platform(
    tracker: &TrackingClient,
    api: &dyn ObjectApi,
    config: &PlatformConfig,
) -> Result<PlatformOutcome> {
    let namespace = target_namespace(config);
    let components = &config.spec.components;

    tracker
        .apply_owned_resource(&build_namespace(&namespace, COMPONENT_PLATFORM, DEFAULT_PLATFORM_VERSION))
        .await
        .with_context(|| format!("failed to apply Namespace {namespace}"))?;
    metrics::record_resource_applied("Namespace");

    let mut statuses = Vec::new();
    if components.pipelines.enabled {
        let applied = tracker
            .apply_owned_resource(&build_pipeline_engine(config, &namespace))
            .await
            .context("failed to apply PipelineEngine")?;
        metrics::record_resource_applied("PipelineEngine");
        statuses.push(SubCrStatus::from_conditions(PIPELINE_ENGINE_NAME, &conditions_of(&applied)));
    }
    if components.dashboard.enabled {
        let applied = tracker
            .apply_owned_resource(&build_dashboard(config, &namespace))
            .await
            .context("failed to apply Dashboard")?;
        metrics::record_resource_applied("Dashboard");
        statuses.push(SubCrStatus::from_conditions(DASHBOARD_NAME, &conditions_of(&applied)));
    }

    let ownership = tracker
        .ownership()
        .context("tracking client has no ownership config")?;
    let cleanup = tracker
        .cleanup_orphans(
            &ownership.owner_label_key,
            ownership.owner_label_value(),
            &platform_gvks(),
            &CleanupOptions::with_allow_list(platform_allow_list()),
        )
        .await?;
    record_cleanup(&cleanup);

    let dependencies = check_dependencies(api, &config.spec.required_crds).await;
    let ready = apply_dependency_override(aggregate_ready(&statuses), &dependencies.condition);

    Ok(PlatformOutcome {
        target_namespace: namespace,
        ready,
        dependencies,
        cleanup,
    })
}

/// Reconcile a `PlatformConfig` and patch its status.
///
/// # Errors
///
/// Returns an error if applying, orphan cleanup or the status patch fails.
pub async fn reconcile_platform_config(ctx: Arc<Context>, config: PlatformConfig) -> Result<Action> {
    let name = config.name_any();
    info!(name = %name, "Reconciling PlatformConfig");

    let tracker = ctx.tracking_client(&config, COMPONENT_PLATFORM)?;
    let outcome = apply_platform(&tracker, ctx.api.as_ref(), &config).await?;

    let current = config.status.as_ref();
    let mut conditions = current.map(|s| s.conditions.clone()).unwrap_or_default();
    set_condition(&mut conditions, outcome.ready);
    set_condition(&mut conditions, outcome.dependencies.condition.to_condition());
    let ready = is_ready(&conditions);

    let status = PlatformConfigStatus {
        conditions,
        observed_generation: config.metadata.generation,
        target_namespace: Some(outcome.target_namespace),
    };
    let unchanged = current.is_some_and(|c| {
        conditions_equal(&c.conditions, &status.conditions)
            && c.observed_generation == status.observed_generation
            && c.target_namespace == status.target_namespace
    });
    if unchanged {
        debug!(name = %name, "Status unchanged, skipping patch");
    } else {
        patch_status::<PlatformConfig, _>(&ctx.client, &name, &status).await?;
        info!(name = %name, ready, "Updated PlatformConfig status");
    }

    if outcome.dependencies.requeue_after.is_some() {
        metrics::record_requeue("PlatformConfig", "dependency_wait");
    }
    Ok(requeue_action(ready, outcome.dependencies.requeue_after))
}

#[cfg(test)]
#[path = "platform_config_tests.rs"]
mod platform_config_tests;
