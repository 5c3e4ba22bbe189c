// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::Condition;
    use crate::reconcilers::status::{
        conditions_equal, create_condition, find_condition, set_condition,
    };

    const CONDITION_TYPE_READY: &str = "Ready";
    const STATUS_TRUE: &str = "True";
    const STATUS_FALSE: &str = "False";

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition(CONDITION_TYPE_READY, STATUS_TRUE, "AllReady", "ok");

        assert_eq!(condition.r#type, CONDITION_TYPE_READY);
        assert_eq!(condition.status, STATUS_TRUE);
        assert_eq!(condition.reason, Some("AllReady".to_string()));
        assert_eq!(condition.message, Some("ok".to_string()));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_find_condition() {
        let conditions = vec![
            create_condition("Ready", STATUS_TRUE, "AllReady", ""),
            create_condition("DependenciesReady", STATUS_FALSE, "DependencyMissing", ""),
        ];

        assert_eq!(
            find_condition(&conditions, "DependenciesReady").map(|c| c.status.as_str()),
            Some(STATUS_FALSE)
        );
        assert!(find_condition(&conditions, "Degraded").is_none());
    }

    #[test]
    fn test_set_condition_preserves_time_when_status_unchanged() {
        let mut conditions = vec![Condition {
            last_transition_time: Some("2025-01-01T00:00:00+00:00".into()),
            ..create_condition("Ready", STATUS_TRUE, "AllReady", "old")
        }];

        set_condition(
            &mut conditions,
            create_condition("Ready", STATUS_TRUE, "AllReady", "new"),
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message.as_deref(), Some("new"));
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_set_condition_updates_time_on_transition() {
        let mut conditions = vec![Condition {
            last_transition_time: Some("2025-01-01T00:00:00+00:00".into()),
            ..create_condition("Ready", STATUS_TRUE, "AllReady", "")
        }];

        set_condition(
            &mut conditions,
            create_condition("Ready", STATUS_FALSE, "NotReady", "broken"),
        );

        assert_eq!(conditions[0].status, STATUS_FALSE);
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_set_condition_appends_new_type() {
        let mut conditions = vec![create_condition("Ready", STATUS_TRUE, "AllReady", "")];
        set_condition(
            &mut conditions,
            create_condition("DependenciesReady", STATUS_TRUE, "DependenciesInstalled", ""),
        );
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let a = vec![Condition {
            last_transition_time: Some("t1".into()),
            ..create_condition("Ready", STATUS_TRUE, "AllReady", "")
        }];
        let b = vec![Condition {
            last_transition_time: Some("t2".into()),
            ..create_condition("Ready", STATUS_TRUE, "AllReady", "")
        }];
        let c = vec![create_condition("Ready", STATUS_FALSE, "NotReady", "")];

        assert!(conditions_equal(&a, &b));
        assert!(!conditions_equal(&a, &c));
        assert!(!conditions_equal(&a, &[]));
    }
}
