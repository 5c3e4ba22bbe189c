// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Plinth operator.
//!
//! All metrics carry the namespace prefix `operator_plinth_dev_` (prometheus-safe
//! version of "operator.plinth.dev").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliation operations and their outcomes
//! - **Ownership Metrics** - Track applied objects and orphan cleanup decisions
//! - **Error Metrics** - Track error conditions and types
//! - **Cluster Metrics** - Track cluster version changes
//!
//! # Example
//!
//! ```rust,no_run
//! use plinth::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("PlatformConfig", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all Plinth metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "operator_plinth_dev";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `PlatformConfig`, `Dashboard`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`ready`, `not_ready`, `dependency_wait`, `error`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

// ============================================================================
// Ownership Metrics
// ============================================================================

/// Total number of objects applied with ownership metadata
///
/// Labels:
/// - `kind`: Kind of the applied object
pub static RESOURCES_APPLIED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "resources_applied_total",
        "Total number of owned objects applied by kind",
        &["kind"],
    )
});

/// Total number of orphaned objects deleted by cleanup
///
/// Labels:
/// - `kind`: Kind of the deleted object
pub static ORPHANS_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "orphans_deleted_total",
        "Total number of orphaned objects deleted by kind",
        &["kind"],
    )
});

/// Total number of orphan candidates that cleanup refused to delete
///
/// Labels:
/// - `kind`: Kind of the skipped object
/// - `reason`: Why it was skipped (`NotControlledByOwner`, `NotAllowListed`, ...)
pub static ORPHANS_SKIPPED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "orphans_skipped_total",
        "Total number of orphan candidates skipped by kind and reason",
        &["kind", "reason"],
    )
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: Category of error (`apply`, `cleanup`, `customization`, `status`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "errors_total",
        "Total number of errors by resource type and error category",
        &["resource_type", "error_type"],
    )
});

// ============================================================================
// Cluster Metrics
// ============================================================================

/// Total number of cluster version changes observed by the poller
pub static CLUSTER_VERSION_CHANGES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter(
        "cluster_version_changes_total",
        "Total number of observed Kubernetes server version changes",
        &["version"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a requeue
pub fn record_requeue(resource_type: &str, reason: &str) {
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record an owned object applied
pub fn record_resource_applied(kind: &str) {
    RESOURCES_APPLIED_TOTAL.with_label_values(&[kind]).inc();
}

/// Record an orphan deleted by cleanup
pub fn record_orphan_deleted(kind: &str) {
    ORPHANS_DELETED_TOTAL.with_label_values(&[kind]).inc();
}

/// Record an orphan candidate skipped by cleanup
pub fn record_orphan_skipped(kind: &str, reason: &str) {
    ORPHANS_SKIPPED_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

/// Record an error
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Record a cluster version change
pub fn record_cluster_version_change(version: &str) {
    CLUSTER_VERSION_CHANGES_TOTAL
        .with_label_values(&[version])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let resource_type = "TestResource";

        record_reconciliation_success(resource_type, Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "success"]);
        assert!(counter.get() > 0.0);
        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_orphan_outcomes() {
        record_orphan_deleted("OrphanTestKind");
        record_orphan_skipped("OrphanTestKind", "NotAllowListed");

        assert!(
            ORPHANS_DELETED_TOTAL
                .with_label_values(&["OrphanTestKind"])
                .get()
                > 0.0
        );
        assert!(
            ORPHANS_SKIPPED_TOTAL
                .with_label_values(&["OrphanTestKind", "NotAllowListed"])
                .get()
                > 0.0
        );
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("operator_plinth_dev"));
        assert!(metrics_text.contains("reconciliations_total"));
    }
}
