// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Readiness aggregation across independently reconciled sub-resources.
//!
//! Each sub-resource (a component custom resource, or a Deployment) is first
//! normalized into a [`SubCrStatus`]. [`aggregate_ready`] folds any number of them
//! into one `Ready` condition, and [`apply_dependency_override`] lets a failing
//! external dependency force the aggregate to `False`.
//!
//! The dependency override is asymmetric on purpose: a dependency confirmed missing
//! turns `Ready` to `False`, while a dependency whose check failed transiently
//! (`Unknown`) leaves the aggregate alone and only schedules a quick recheck.

use crate::constants::{DEPENDENCY_CHECK_RETRY_SECS, DEPENDENCY_MISSING_REQUEUE_SECS};
use crate::crd::Condition;
use crate::reconcilers::status::{create_condition, find_condition};
use crate::status_reasons::{
    CONDITION_TYPE_DEPENDENCIES_READY, CONDITION_TYPE_READY, REASON_ALL_READY,
    REASON_DEPENDENCIES_INSTALLED, REASON_DEPENDENCY_CHECK_FAILED, REASON_DEPENDENCY_MISSING,
    REASON_DEPLOYMENT_AVAILABLE, REASON_DEPLOYMENT_UNAVAILABLE, REASON_NOT_READY,
    REASON_NO_COMPONENTS, REASON_PENDING, REASON_PROGRESSING, REASON_PROGRESS_DEADLINE_EXCEEDED,
    STATUS_FALSE, STATUS_TRUE, STATUS_UNKNOWN,
};
use k8s_openapi::api::apps::v1::Deployment;
use std::fmt::Display;
use std::time::Duration;
use tracing::debug;

/// Normalized readiness of one sub-resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubCrStatus {
    pub component_name: String,
    pub ready: bool,
    pub reason: String,
    pub message: String,
}

impl SubCrStatus {
    /// A ready sub-resource.
    #[must_use]
    pub fn ready(component_name: &str, reason: &str, message: &str) -> Self {
        Self {
            component_name: component_name.to_string(),
            ready: true,
            reason: reason.to_string(),
            message: message.to_string(),
        }
    }

    /// A sub-resource that is not ready.
    #[must_use]
    pub fn not_ready(component_name: &str, reason: &str, message: &str) -> Self {
        Self {
            component_name: component_name.to_string(),
            ready: false,
            reason: reason.to_string(),
            message: message.to_string(),
        }
    }

    /// Normalize a custom resource's condition list using its `Ready` condition.
    ///
    /// A resource without a `Ready` condition has not been reconciled yet and is
    /// reported as not ready with reason `Pending`.
    #[must_use]
    pub fn from_conditions(component_name: &str, conditions: &[Condition]) -> Self {
        let Some(ready) = find_condition(conditions, CONDITION_TYPE_READY) else {
            return Self::not_ready(component_name, REASON_PENDING, "waiting for first status");
        };

        let reason = ready.reason.clone().unwrap_or_default();
        let message = ready.message.clone().unwrap_or_default();
        if ready.status == STATUS_TRUE {
            Self::ready(component_name, &reason, &message)
        } else {
            let reason = if reason.is_empty() {
                REASON_NOT_READY.to_string()
            } else {
                reason
            };
            Self::not_ready(component_name, &reason, &message)
        }
    }

    /// Normalize a Deployment's rollout state.
    #[must_use]
    pub fn from_deployment(deployment: &Deployment) -> Self {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        let desired = deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);
        let status = deployment.status.as_ref();

        let deadline_exceeded = status
            .and_then(|s| s.conditions.as_ref())
            .into_iter()
            .flatten()
            .any(|c| {
                c.type_ == "Progressing"
                    && c.reason.as_deref() == Some(REASON_PROGRESS_DEADLINE_EXCEEDED)
            });
        if deadline_exceeded {
            return Self::not_ready(
                &name,
                REASON_PROGRESS_DEADLINE_EXCEEDED,
                "rollout exceeded its progress deadline",
            );
        }

        let observed = status.and_then(|s| s.observed_generation);
        if deployment.metadata.generation.is_some() && observed < deployment.metadata.generation {
            return Self::not_ready(&name, REASON_PROGRESSING, "rollout not yet observed");
        }

        let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
        let message = format!("{available}/{desired} replicas available");
        if available >= desired {
            Self::ready(&name, REASON_DEPLOYMENT_AVAILABLE, &message)
        } else {
            Self::not_ready(&name, REASON_DEPLOYMENT_UNAVAILABLE, &message)
        }
    }
}

/// Fold sub-resource readiness into one `Ready` condition.
///
/// `True` iff every input is ready; an empty input is vacuously ready with reason
/// `NoComponents`. Otherwise the reason and message of the first not-ready input
/// are reported, the message prefixed with its component name.
#[must_use]
pub fn aggregate_ready(statuses: &[SubCrStatus]) -> Condition {
    if statuses.is_empty() {
        return create_condition(
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            REASON_NO_COMPONENTS,
            "No components to wait for",
        );
    }

    match statuses.iter().find(|s| !s.ready) {
        Some(first) => {
            let not_ready = statuses.iter().filter(|s| !s.ready).count();
            debug!(
                component = %first.component_name,
                not_ready,
                total = statuses.len(),
                "Aggregate not ready"
            );
            let message = if first.message.is_empty() {
                format!("{}: not ready", first.component_name)
            } else {
                format!("{}: {}", first.component_name, first.message)
            };
            create_condition(CONDITION_TYPE_READY, STATUS_FALSE, &first.reason, &message)
        }
        None => create_condition(
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            REASON_ALL_READY,
            &format!("All {} components are ready", statuses.len()),
        ),
    }
}

/// Tri-state condition status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => STATUS_TRUE,
            Self::False => STATUS_FALSE,
            Self::Unknown => STATUS_UNKNOWN,
        }
    }
}

/// Result of checking an external dependency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyCondition {
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
}

impl DependencyCondition {
    /// Render as a `DependenciesReady` condition.
    #[must_use]
    pub fn to_condition(&self) -> Condition {
        create_condition(
            CONDITION_TYPE_DEPENDENCIES_READY,
            self.status.as_str(),
            &self.reason,
            &self.message,
        )
    }
}

/// Force the aggregate to `False` when a dependency is confirmed missing.
///
/// `Unknown` and `True` leave the aggregate unchanged.
#[must_use]
pub fn apply_dependency_override(aggregate: Condition, dependency: &DependencyCondition) -> Condition {
    match dependency.status {
        ConditionStatus::False => Condition {
            status: STATUS_FALSE.to_string(),
            reason: Some(dependency.reason.clone()),
            message: Some(dependency.message.clone()),
            ..aggregate
        },
        ConditionStatus::True | ConditionStatus::Unknown => aggregate,
    }
}

/// Dependency condition plus the requeue it calls for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyCheckOutcome {
    pub condition: DependencyCondition,
    pub requeue_after: Option<Duration>,
}

/// Classify the result of a dependency presence check.
///
/// - `Err(_)`: the check itself failed; `Unknown`, retried soon
/// - `Ok(false)`: confirmed missing; `False`, rechecked periodically
/// - `Ok(true)`: installed; `True`, no extra requeue
pub fn evaluate_dependency<E: Display>(name: &str, result: Result<bool, E>) -> DependencyCheckOutcome {
    match result {
        Err(e) => DependencyCheckOutcome {
            condition: DependencyCondition {
                status: ConditionStatus::Unknown,
                reason: REASON_DEPENDENCY_CHECK_FAILED.to_string(),
                message: format!("Failed to check dependency {name}: {e}"),
            },
            requeue_after: Some(Duration::from_secs(DEPENDENCY_CHECK_RETRY_SECS)),
        },
        Ok(false) => DependencyCheckOutcome {
            condition: DependencyCondition {
                status: ConditionStatus::False,
                reason: REASON_DEPENDENCY_MISSING.to_string(),
                message: format!("Required CRD {name} is not installed"),
            },
            requeue_after: Some(Duration::from_secs(DEPENDENCY_MISSING_REQUEUE_SECS)),
        },
        Ok(true) => DependencyCheckOutcome {
            condition: DependencyCondition {
                status: ConditionStatus::True,
                reason: REASON_DEPENDENCIES_INSTALLED.to_string(),
                message: format!("Required CRD {name} is installed"),
            },
            requeue_after: None,
        },
    }
}

/// Combine several dependency outcomes into one.
///
/// The first `False` wins, then the first `Unknown`; with no failures (or no
/// dependencies at all) the result is `True`. The shortest requeue is kept.
#[must_use]
pub fn combine_dependencies(outcomes: Vec<DependencyCheckOutcome>) -> DependencyCheckOutcome {
    let requeue_after = outcomes.iter().filter_map(|o| o.requeue_after).min();
    let pick = |status: ConditionStatus| outcomes.iter().find(|o| o.condition.status == status);

    let condition = match pick(ConditionStatus::False).or_else(|| pick(ConditionStatus::Unknown)) {
        Some(outcome) => outcome.condition.clone(),
        None => DependencyCondition {
            status: ConditionStatus::True,
            reason: REASON_DEPENDENCIES_INSTALLED.to_string(),
            message: format!("All {} required dependencies are installed", outcomes.len()),
        },
    };

    DependencyCheckOutcome {
        condition,
        requeue_after,
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod aggregate_tests;
