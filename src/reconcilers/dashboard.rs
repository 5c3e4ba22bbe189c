// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Dashboard` reconciliation.

use crate::context::Context;
use crate::crd::Dashboard;
use crate::labels::COMPONENT_DASHBOARD;
use crate::manifests::dashboard;
use crate::reconcilers::component::reconcile_component;
use anyhow::Result;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// Reconcile a `Dashboard`.
///
/// The console URL is injected as an operator-managed variable, so a user
/// customization cannot point the dashboard elsewhere.
///
/// # Errors
///
/// Returns an error if applying, orphan cleanup or the status patch fails.
pub async fn reconcile_dashboard(ctx: Arc<Context>, resource: Dashboard) -> Result<Action> {
    info!(name = %resource.name_any(), namespace = %resource.spec.target_namespace, "Reconciling Dashboard");

    let manifests = dashboard::build(&resource.spec);
    reconcile_component(
        &ctx,
        &resource,
        COMPONENT_DASHBOARD,
        manifests,
        &resource.spec.options,
        resource.status.as_ref(),
    )
    .await
}
