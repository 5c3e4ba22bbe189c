// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `aggregate.rs`

#[cfg(test)]
mod tests {
    use crate::constants::{DEPENDENCY_CHECK_RETRY_SECS, DEPENDENCY_MISSING_REQUEUE_SECS};
    use crate::reconcilers::aggregate::{
        aggregate_ready, apply_dependency_override, combine_dependencies, evaluate_dependency,
        ConditionStatus, DependencyCondition, SubCrStatus,
    };
    use crate::reconcilers::status::create_condition;
    use crate::status_reasons::{
        REASON_ALL_READY, REASON_DEPENDENCY_CHECK_FAILED, REASON_DEPENDENCY_MISSING,
        REASON_DEPLOYMENT_AVAILABLE, REASON_DEPLOYMENT_UNAVAILABLE, REASON_NO_COMPONENTS,
        REASON_PENDING, REASON_PROGRESSING, REASON_PROGRESS_DEADLINE_EXCEEDED,
    };
    use k8s_openapi::api::apps::v1::{
        Deployment, DeploymentCondition, DeploymentSpec, DeploymentStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::time::Duration;

    fn ready(name: &str) -> SubCrStatus {
        SubCrStatus::ready(name, "Ready", "ok")
    }

    fn deployment(replicas: i32, available: Option<i32>) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some("plinth-dashboard".into()),
                generation: Some(2),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                observed_generation: Some(2),
                available_replicas: available,
                ..Default::default()
            }),
        }
    }

    // ------------------------------------------------------------------
    // aggregate_ready
    // ------------------------------------------------------------------

    #[test]
    fn test_aggregate_empty_is_vacuously_ready() {
        let condition = aggregate_ready(&[]);
        assert_eq!(condition.r#type, "Ready");
        assert_eq!(condition.status, "True");
        assert_eq!(condition.reason.as_deref(), Some(REASON_NO_COMPONENTS));
    }

    #[test]
    fn test_aggregate_all_ready() {
        let condition = aggregate_ready(&[ready("pipeline"), ready("dashboard")]);
        assert_eq!(condition.status, "True");
        assert_eq!(condition.reason.as_deref(), Some(REASON_ALL_READY));
    }

    #[test]
    fn test_aggregate_reports_first_not_ready_in_order() {
        let statuses = vec![
            ready("pipeline"),
            SubCrStatus::not_ready("dashboard", "DeploymentUnavailable", "0/1 replicas available"),
            SubCrStatus::not_ready("triggers", "Pending", "waiting"),
        ];

        let condition = aggregate_ready(&statuses);

        assert_eq!(condition.status, "False");
        assert_eq!(condition.reason.as_deref(), Some("DeploymentUnavailable"));
        assert_eq!(
            condition.message.as_deref(),
            Some("dashboard: 0/1 replicas available")
        );
    }

    #[test]
    fn test_aggregate_true_iff_all_ready() {
        // Every combination of three ready flags.
        for mask in 0u8..8 {
            let statuses: Vec<SubCrStatus> = (0..3)
                .map(|i| {
                    let name = format!("c{i}");
                    if mask & (1 << i) != 0 {
                        ready(&name)
                    } else {
                        SubCrStatus::not_ready(&name, "NotReady", "")
                    }
                })
                .collect();
            let expected = if mask == 0b111 { "True" } else { "False" };
            assert_eq!(aggregate_ready(&statuses).status, expected, "mask {mask:03b}");
        }
    }

    // ------------------------------------------------------------------
    // SubCrStatus normalization
    // ------------------------------------------------------------------

    #[test]
    fn test_from_conditions_without_ready_is_pending() {
        let status = SubCrStatus::from_conditions("pipeline", &[]);
        assert!(!status.ready);
        assert_eq!(status.reason, REASON_PENDING);
    }

    #[test]
    fn test_from_conditions_reads_ready_condition() {
        let conditions = vec![
            create_condition("DependenciesReady", "True", "DependenciesInstalled", ""),
            create_condition("Ready", "False", "ApplyFailed", "boom"),
        ];
        let status = SubCrStatus::from_conditions("pipeline", &conditions);
        assert!(!status.ready);
        assert_eq!(status.reason, "ApplyFailed");
        assert_eq!(status.message, "boom");

        let ok = SubCrStatus::from_conditions(
            "pipeline",
            &[create_condition("Ready", "True", "AllReady", "fine")],
        );
        assert!(ok.ready);
    }

    #[test]
    fn test_from_deployment_available() {
        let status = SubCrStatus::from_deployment(&deployment(2, Some(2)));
        assert!(status.ready);
        assert_eq!(status.component_name, "plinth-dashboard");
        assert_eq!(status.reason, REASON_DEPLOYMENT_AVAILABLE);
    }

    #[test]
    fn test_from_deployment_unavailable() {
        let status = SubCrStatus::from_deployment(&deployment(2, None));
        assert!(!status.ready);
        assert_eq!(status.reason, REASON_DEPLOYMENT_UNAVAILABLE);
        assert_eq!(status.message, "0/2 replicas available");
    }

    #[test]
    fn test_from_deployment_stale_generation_is_progressing() {
        let mut d = deployment(1, Some(1));
        d.metadata.generation = Some(3);
        let status = SubCrStatus::from_deployment(&d);
        assert!(!status.ready);
        assert_eq!(status.reason, REASON_PROGRESSING);
    }

    #[test]
    fn test_from_deployment_progress_deadline() {
        let mut d = deployment(1, Some(0));
        d.status.as_mut().unwrap().conditions = Some(vec![DeploymentCondition {
            type_: "Progressing".into(),
            status: "False".into(),
            reason: Some(REASON_PROGRESS_DEADLINE_EXCEEDED.into()),
            ..Default::default()
        }]);
        let status = SubCrStatus::from_deployment(&d);
        assert_eq!(status.reason, REASON_PROGRESS_DEADLINE_EXCEEDED);
    }

    // ------------------------------------------------------------------
    // Dependency override
    // ------------------------------------------------------------------

    fn dependency(status: ConditionStatus) -> DependencyCondition {
        DependencyCondition {
            status,
            reason: "DependencyMissing".into(),
            message: "cert-manager missing".into(),
        }
    }

    #[test]
    fn test_override_false_forces_not_ready() {
        let aggregate = aggregate_ready(&[ready("pipeline")]);
        let result = apply_dependency_override(aggregate, &dependency(ConditionStatus::False));
        assert_eq!(result.status, "False");
        assert_eq!(result.reason.as_deref(), Some("DependencyMissing"));
        assert_eq!(result.message.as_deref(), Some("cert-manager missing"));
    }

    #[test]
    fn test_override_unknown_and_true_leave_aggregate() {
        for status in [ConditionStatus::Unknown, ConditionStatus::True] {
            let aggregate = aggregate_ready(&[ready("pipeline")]);
            let result = apply_dependency_override(aggregate.clone(), &dependency(status));
            assert_eq!(result, aggregate);
        }

        let not_ready = aggregate_ready(&[SubCrStatus::not_ready("pipeline", "NotReady", "x")]);
        let result =
            apply_dependency_override(not_ready.clone(), &dependency(ConditionStatus::Unknown));
        assert_eq!(result, not_ready);
    }

    #[test]
    fn test_evaluate_dependency_outcomes() {
        let failed = evaluate_dependency("certificates.cert-manager.io", Err("forbidden"));
        assert_eq!(failed.condition.status, ConditionStatus::Unknown);
        assert_eq!(failed.condition.reason, REASON_DEPENDENCY_CHECK_FAILED);
        assert_eq!(
            failed.requeue_after,
            Some(Duration::from_secs(DEPENDENCY_CHECK_RETRY_SECS))
        );

        let missing = evaluate_dependency::<String>("certificates.cert-manager.io", Ok(false));
        assert_eq!(missing.condition.status, ConditionStatus::False);
        assert_eq!(missing.condition.reason, REASON_DEPENDENCY_MISSING);
        assert_eq!(
            missing.requeue_after,
            Some(Duration::from_secs(DEPENDENCY_MISSING_REQUEUE_SECS))
        );

        let present = evaluate_dependency::<String>("certificates.cert-manager.io", Ok(true));
        assert_eq!(present.condition.status, ConditionStatus::True);
        assert!(present.requeue_after.is_none());
    }

    #[test]
    fn test_dependency_condition_renders_dependencies_ready() {
        let condition = dependency(ConditionStatus::Unknown).to_condition();
        assert_eq!(condition.r#type, "DependenciesReady");
        assert_eq!(condition.status, "Unknown");
    }

    #[test]
    fn test_combine_dependencies_prefers_false_then_unknown() {
        let unknown = evaluate_dependency("a", Err("timeout"));
        let missing = evaluate_dependency::<String>("b", Ok(false));
        let present = evaluate_dependency::<String>("c", Ok(true));

        let combined = combine_dependencies(vec![unknown.clone(), missing.clone(), present.clone()]);
        assert_eq!(combined.condition, missing.condition);
        assert_eq!(
            combined.requeue_after,
            Some(Duration::from_secs(DEPENDENCY_CHECK_RETRY_SECS))
        );

        let combined = combine_dependencies(vec![present.clone(), unknown.clone()]);
        assert_eq!(combined.condition, unknown.condition);

        let combined = combine_dependencies(vec![]);
        assert_eq!(combined.condition.status, ConditionStatus::True);
        assert!(combined.requeue_after.is_none());
    }
}
