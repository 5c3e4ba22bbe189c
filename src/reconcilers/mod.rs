// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for Plinth resources.
//!
//! Reconcilers are thin: read the custom resource, build its desired object graph,
//! apply it through a [`crate::tracking::TrackingClient`] owned by the resource,
//! clean up orphans, then report status.
//!
//! # Reconciliation Architecture
//!
//! 1. **Build** - Generate the desired objects from the CR spec
//! 2. **Customize** - Layer user Deployment overrides with the overlay
//! 3. **Apply** - Server-side apply every object with ownership metadata
//! 4. **Clean up** - Delete previously owned objects not applied this pass
//! 5. **Status** - Aggregate readiness and patch the status subresource
//!
//! # Available Reconcilers
//!
//! - [`reconcile_platform_config`] - Root resource: namespace and component CRs
//! - [`reconcile_pipeline_engine`] - Pipeline controller and webhook
//! - [`reconcile_dashboard`] - Web dashboard
//!
//! # Example: Using a Reconciler
//!
//! ```rust,no_run
//! use plinth::context::Context;
//! use plinth::crd::PlatformConfig;
//! use plinth::reconcilers::reconcile_platform_config;
//! use std::sync::Arc;
//!
//! async fn reconcile(ctx: Arc<Context>, config: PlatformConfig) -> anyhow::Result<()> {
//!     let _action = reconcile_platform_config(ctx, config).await?;
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod component;
pub mod dashboard;
pub mod pipeline_engine;
pub mod platform_config;
pub mod status;

pub use dashboard::reconcile_dashboard;
pub use pipeline_engine::reconcile_pipeline_engine;
pub use platform_config::reconcile_platform_config;

use crate::constants::{NOT_READY_REQUEUE_DURATION_SECS, READY_REQUEUE_DURATION_SECS};
use crate::crd::Condition;
use crate::status_reasons::{CONDITION_TYPE_READY, STATUS_TRUE};
use kube::runtime::controller::Action;
use std::time::Duration;

/// Returns `true` if the condition list has `Ready=True`.
#[must_use]
pub fn is_ready(conditions: &[Condition]) -> bool {
    status::find_condition(conditions, CONDITION_TYPE_READY)
        .is_some_and(|c| c.status == STATUS_TRUE)
}

/// Requeue interval after a successful reconcile.
///
/// Ready resources are checked every five minutes and others every thirty seconds.
/// A shorter interval requested by a dependency check takes precedence.
#[must_use]
pub fn requeue_interval(ready: bool, dependency_requeue: Option<Duration>) -> Duration {
    let base = if ready {
        Duration::from_secs(READY_REQUEUE_DURATION_SECS)
    } else {
        Duration::from_secs(NOT_READY_REQUEUE_DURATION_SECS)
    };
    dependency_requeue.map_or(base, |d| d.min(base))
}

/// Controller action for [`requeue_interval`].
#[must_use]
pub fn requeue_action(ready: bool, dependency_requeue: Option<Duration>) -> Action {
    Action::requeue(requeue_interval(ready, dependency_requeue))
}
