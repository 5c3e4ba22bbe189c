// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared reconcile flow for component resources.
//!
//! `PipelineEngine` and `Dashboard` differ only in the objects they generate. Both
//! customize their Deployments, apply everything through a tracking client, remove
//! orphans and report readiness from their Deployments.

use crate::context::Context;
use crate::crd::{ComponentOptions, ComponentStatus, Condition};
use crate::errors::OverlayError;
use crate::manifests::ComponentManifests;
use crate::metrics;
use crate::overlay::PodOverlay;
use crate::ownership::from_dynamic;
use crate::reconcilers::aggregate::{aggregate_ready, SubCrStatus};
use crate::reconcilers::status::{conditions_equal, create_condition, patch_status, set_condition};
use crate::reconcilers::{is_ready, requeue_action};
use crate::status_reasons::{CONDITION_TYPE_READY, REASON_CUSTOMIZATION_INVALID, STATUS_FALSE};
use crate::tracking::{CleanupOptions, CleanupReport, TrackingClient};
use anyhow::{Context as _, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::core::ClusterResourceScope;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// Result of applying one component.
#[derive(Clone, Debug)]
pub struct ComponentOutcome {
    /// Aggregated `Ready` condition
    pub ready: Condition,
    /// Per-Deployment readiness
    pub deployments: Vec<SubCrStatus>,
    pub cleanup: CleanupReport,
}

/// Build the overlay for one generated Deployment.
///
/// The user customization keyed by the Deployment name is applied first; the
/// component's system variables are then added to every container.
#[must_use]
pub fn overlay_for(
    deployment: &Deployment,
    options: &ComponentOptions,
    system_env: &[(String, String)],
) -> PodOverlay {
    let mut overlay = options
        .deployments
        .get(&deployment.name_any())
        .map(PodOverlay::from_override)
        .unwrap_or_default();

    let containers = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|pod| pod.containers.iter().map(|c| c.name.clone()).collect::<Vec<_>>())
        .unwrap_or_default();

    for container in &containers {
        for (name, value) in system_env {
            overlay = overlay.with_system_env(container, name, value);
        }
    }
    overlay
}

/// Customize every generated Deployment.
///
/// All overlays are validated before any Deployment is modified.
///
/// # Errors
///
/// Returns the first [`OverlayError`]; the Deployments are untouched in that case.
pub fn customize_deployments(
    deployments: &mut [Deployment],
    options: &ComponentOptions,
    system_env: &[(String, String)],
) -> Result<(), OverlayError> {
    for name in options.deployments.keys() {
        if !deployments.iter().any(|d| &d.name_any() == name) {
            warn!(deployment = %name, "Customization names a deployment this component does not generate");
        }
    }

    let overlays: Vec<PodOverlay> = deployments
        .iter()
        .map(|d| overlay_for(d, options, system_env))
        .collect();
    overlays.iter().try_for_each(PodOverlay::validate)?;

    for (deployment, overlay) in deployments.iter_mut().zip(&overlays) {
        overlay.apply_to_deployment(deployment)?;
    }
    Ok(())
}

pub(crate) fn record_cleanup(report: &CleanupReport) {
    for key in &report.deleted {
        metrics::record_orphan_deleted(&key.gvk.kind);
    }
    for (key, reason) in &report.skipped {
        metrics::record_orphan_skipped(&key.gvk.kind, &format!("{reason:?}"));
    }
}

/// Apply a component's object graph and remove its orphans.
///
/// An invalid customization yields a `Ready=False` outcome with reason
/// `CustomizationInvalid` and nothing is applied or cleaned up.
///
/// # Errors
///
/// Returns an error if any apply fails or orphan cleanup fails. Cleanup only runs
/// after every apply succeeded.
pub async fn apply_component(
    tracker: &TrackingClient,
    mut manifests: ComponentManifests,
    options: &ComponentOptions,
) -> Result<ComponentOutcome> {
    if let Err(e) = customize_deployments(&mut manifests.deployments, options, &manifests.system_env) {
        warn!(error = %e, "Rejecting invalid deployment customization");
        return Ok(ComponentOutcome {
            ready: create_condition(
                CONDITION_TYPE_READY,
                STATUS_FALSE,
                REASON_CUSTOMIZATION_INVALID,
                &e.to_string(),
            ),
            deployments: Vec::new(),
            cleanup: CleanupReport::default(),
        });
    }

    tracker
        .apply_owned_resource(&manifests.service_account)
        .await
        .context("failed to apply ServiceAccount")?;
    tracker
        .apply_owned_resource(&manifests.cluster_role)
        .await
        .context("failed to apply ClusterRole")?;
    tracker
        .apply_owned_resource(&manifests.cluster_role_binding)
        .await
        .context("failed to apply ClusterRoleBinding")?;
    tracker
        .apply_owned_resource(&manifests.config_map)
        .await
        .context("failed to apply ConfigMap")?;
    for kind in ["ServiceAccount", "ClusterRole", "ClusterRoleBinding", "ConfigMap"] {
        metrics::record_resource_applied(kind);
    }

    let mut deployments = Vec::with_capacity(manifests.deployments.len());
    for deployment in &manifests.deployments {
        let applied = tracker
            .apply_owned_resource(deployment)
            .await
            .with_context(|| format!("failed to apply Deployment {}", deployment.name_any()))?;
        metrics::record_resource_applied("Deployment");
        let live: Deployment = from_dynamic(&applied)?;
        deployments.push(SubCrStatus::from_deployment(&live));
    }

    let ownership = tracker
        .ownership()
        .context("tracking client has no ownership config")?;
    let cleanup = tracker
        .cleanup_orphans(
            &ownership.owner_label_key,
            ownership.owner_label_value(),
            &ComponentManifests::managed_gvks(),
            &CleanupOptions::with_allow_list(manifests.cluster_allow_list()),
        )
        .await?;
    record_cleanup(&cleanup);

    Ok(ComponentOutcome {
        ready: aggregate_ready(&deployments),
        deployments,
        cleanup,
    })
}

/// Reconcile a component custom resource and patch its status.
///
/// # Errors
///
/// Returns an error if applying, cleanup or the status patch fails.
pub async fn reconcile_component<K>(
    ctx: &Context,
    resource: &K,
    component: &str,
    manifests: ComponentManifests,
    options: &ComponentOptions,
    current: Option<&ComponentStatus>,
) -> Result<Action>
where
    K: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize,
{
    let name = resource.name_any();
    let kind = K::kind(&()).to_string();
    debug!(kind = %kind, name = %name, namespace = %manifests.namespace, "Reconciling component");

    let version = manifests.version.clone();
    let tracker = ctx.tracking_client(resource, component)?;
    let outcome = apply_component(&tracker, manifests, options).await?;
    if outcome.ready.reason.as_deref() == Some(REASON_CUSTOMIZATION_INVALID) {
        metrics::record_error(&kind, "customization");
    }

    let mut conditions = current.map(|s| s.conditions.clone()).unwrap_or_default();
    set_condition(&mut conditions, outcome.ready);
    let ready = is_ready(&conditions);

    let status = ComponentStatus {
        conditions,
        observed_generation: resource.meta().generation,
        version: Some(version),
    };
    let unchanged = current.is_some_and(|c| {
        conditions_equal(&c.conditions, &status.conditions)
            && c.observed_generation == status.observed_generation
            && c.version == status.version
    });
    if unchanged {
        debug!(kind = %kind, name = %name, "Status unchanged, skipping patch");
    } else {
        patch_status::<K, _>(&ctx.client, &name, &status).await?;
        info!(kind = %kind, name = %name, ready, "Updated component status");
    }

    Ok(requeue_action(ready, None))
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod component_tests;
