// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster capability checks.
//!
//! - [`crd_installed`] answers whether a `CustomResourceDefinition` exists, the
//!   input of the dependency override on the root resource's `Ready` condition.
//! - [`spawn_version_poller`] watches the API server version and sends a
//!   notification when it changes, so every resource gets reconciled again after a
//!   cluster upgrade.

use crate::constants::{CRD_API_GROUP, KIND_CUSTOM_RESOURCE_DEFINITION};
use crate::errors::ApiError;
use crate::kube_api::ObjectApi;
use crate::metrics;
use crate::ownership::ResourceKey;
use kube::core::GroupVersionKind;
use kube::Client;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// GVK of `CustomResourceDefinition` objects.
#[must_use]
pub fn crd_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk(CRD_API_GROUP, "v1", KIND_CUSTOM_RESOURCE_DEFINITION)
}

/// Check whether a CRD (e.g. `certificates.cert-manager.io`) is installed.
///
/// `Ok(false)` means the API server confirmed it is absent. Any other failure
/// (RBAC, network) is returned as an error so the caller can tell "missing" apart
/// from "could not check".
///
/// # Errors
///
/// Returns the underlying API error when the lookup itself fails.
pub async fn crd_installed(api: &dyn ObjectApi, name: &str) -> Result<bool, ApiError> {
    let key = ResourceKey::cluster(crd_gvk(), name);
    match api.get(&key).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remembers the last observed server version.
#[derive(Debug, Default)]
pub struct VersionTracker {
    last: Option<String>,
}

impl VersionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly observed version.
    ///
    /// Returns `true` when it differs from the previous observation. The first
    /// observation is a baseline and never counts as a change.
    pub fn observe(&mut self, version: &str) -> bool {
        let changed = self.last.as_deref().is_some_and(|last| last != version);
        if self.last.as_deref() != Some(version) {
            self.last = Some(version.to_string());
        }
        changed
    }

    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

/// Send a change notification without blocking.
///
/// A full channel already holds a pending notification, and a closed channel has no
/// listener left; in both cases the notification is dropped. Returns whether it was
/// queued.
pub fn notify_version_change(tx: &Sender<()>) -> bool {
    match tx.try_send(()) {
        Ok(()) => true,
        Err(TrySendError::Full(())) => {
            debug!("Version change notification already pending, dropping");
            false
        }
        Err(TrySendError::Closed(())) => {
            debug!("Version change listener gone, dropping notification");
            false
        }
    }
}

/// Poll the API server version every `interval` and notify every listener on change.
///
/// Poll failures are logged and retried on the next tick. The poller stops once all
/// listeners are gone.
pub fn spawn_version_poller(
    client: Client,
    interval: Duration,
    listeners: Vec<Sender<()>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tracker = VersionTracker::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if listeners.iter().all(Sender::is_closed) {
                debug!("Version change listeners gone, stopping poller");
                return;
            }

            let info = match client.apiserver_version().await {
                Ok(info) => info,
                Err(e) => {
                    warn!(error = %e, "Failed to query Kubernetes server version");
                    continue;
                }
            };

            let previous = tracker.last().map(str::to_string);
            if tracker.observe(&info.git_version) {
                info!(
                    previous = ?previous,
                    current = %info.git_version,
                    "Kubernetes server version changed, triggering reconciliation"
                );
                metrics::record_cluster_version_change(&info.git_version);
                for tx in &listeners {
                    notify_version_change(tx);
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "capabilities_tests.rs"]
mod capabilities_tests;
