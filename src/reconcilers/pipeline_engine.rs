// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `PipelineEngine` reconciliation.

use crate::context::Context;
use crate::crd::PipelineEngine;
use crate::labels::COMPONENT_PIPELINES;
use crate::manifests::pipelines;
use crate::reconcilers::component::reconcile_component;
use anyhow::Result;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// Reconcile a `PipelineEngine`: controller, webhook and their RBAC.
///
/// # Errors
///
/// Returns an error if applying, orphan cleanup or the status patch fails.
pub async fn reconcile_pipeline_engine(ctx: Arc<Context>, engine: PipelineEngine) -> Result<Action> {
    info!(name = %engine.name_any(), namespace = %engine.spec.target_namespace, "Reconciling PipelineEngine");

    let manifests = pipelines::build(&engine.spec);
    reconcile_component(
        &ctx,
        &engine,
        COMPONENT_PIPELINES,
        manifests,
        &engine.spec.options,
        engine.status.as_ref(),
    )
    .await
}
