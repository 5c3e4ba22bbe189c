// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership-tracked declarative apply with orphan cleanup.
//!
//! A [`TrackingClient`] wraps an [`ObjectApi`] for the duration of one reconcile pass.
//! Every successful write through it records the written object's [`ResourceKey`] in
//! a tracked set. After all desired objects have been applied, the reconciler calls
//! [`TrackingClient::cleanup_orphans`], which lists everything carrying the owner label
//! and deletes the objects that were not written this pass.
//!
//! # Safety against label spoofing
//!
//! A candidate for deletion must pass three checks:
//!
//! 1. it is not in the tracked set
//! 2. its controller `ownerReference` matches the owner's kind, name **and UID**
//! 3. if cluster-scoped, its name is admitted by the [`ClusterScopedAllowList`]
//!
//! A client built without an [`OwnershipConfig`] cannot perform check 2 and therefore
//! deletes nothing unless the caller opts in with [`CleanupOptions::allow_label_only`].
//!
//! # Example
//!
//! ```rust,no_run
//! use plinth::ownership::OwnershipConfig;
//! use plinth::tracking::{CleanupOptions, TrackingClient};
//! use plinth::kube_api::ObjectApi;
//! use k8s_openapi::api::core::v1::ConfigMap;
//! use kube::core::GroupVersionKind;
//! use std::sync::Arc;
//!
//! # async fn example(api: Arc<dyn ObjectApi>, ownership: OwnershipConfig, cm: ConfigMap) -> anyhow::Result<()> {
//! let client = TrackingClient::new(api, Some(ownership.clone()));
//! client.apply_owned_resource(&cm).await?;
//!
//! let gvks = [GroupVersionKind::gvk("", "v1", "ConfigMap")];
//! client
//!     .cleanup_orphans(
//!         &ownership.owner_label_key,
//!         ownership.owner_label_value(),
//!         &gvks,
//!         &CleanupOptions::default(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::allowlist::ClusterScopedAllowList;
use crate::constants::DEFAULT_FIELD_MANAGER;
use crate::errors::{ApiError, TrackingError};
use crate::kube_api::{ObjectApi, ObjectPatch};
use crate::ownership::{is_controlled_by, is_crd, to_dynamic, OwnershipConfig, ResourceKey};
use futures::stream::{FuturesUnordered, StreamExt};
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use kube::Resource;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Outcome of [`TrackingClient::create_or_update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOrUpdateResult {
    /// The object did not exist and was created
    Created,
    /// The object existed and was replaced
    Updated,
    /// The object already matched the desired state
    Unchanged,
}

/// Why an orphan candidate was not deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The controller owner reference does not match the owner (kind, name, UID)
    NotControlledByOwner,
    /// The cluster-scoped name is not admitted by the allow-list
    NotAllowListed,
    /// The client has no ownership config and label-only cleanup was not enabled
    NoOwnershipConfig,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotControlledByOwner => "not controlled by owner",
            Self::NotAllowListed => "not in cluster-scoped allow-list",
            Self::NoOwnershipConfig => "no ownership config",
        };
        f.write_str(reason)
    }
}

/// Options for [`TrackingClient::cleanup_orphans`].
#[derive(Clone, Debug, Default)]
pub struct CleanupOptions {
    /// Restricts which cluster-scoped names may be deleted
    pub allow_list: ClusterScopedAllowList,
    /// Delete on label match alone when the client has no ownership config.
    ///
    /// Owner-reference verification is skipped in this mode, the allow-list still
    /// applies to cluster-scoped objects.
    pub allow_label_only: bool,
}

impl CleanupOptions {
    /// Options with the given allow-list.
    #[must_use]
    pub fn with_allow_list(allow_list: ClusterScopedAllowList) -> Self {
        Self {
            allow_list,
            allow_label_only: false,
        }
    }
}

/// Result of an orphan cleanup pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Objects deleted by this pass
    pub deleted: Vec<ResourceKey>,
    /// Orphan candidates left in place
    pub skipped: Vec<(ResourceKey, SkipReason)>,
}

impl CleanupReport {
    fn merge(&mut self, other: Self) {
        self.deleted.extend(other.deleted);
        self.skipped.extend(other.skipped);
    }

    fn sort(&mut self) {
        self.deleted.sort_by_key(ResourceKey::sort_key);
        self.skipped.sort_by_key(|(key, _)| key.sort_key());
    }

    /// Returns `true` when nothing was deleted or skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.skipped.is_empty()
    }
}

/// Client wrapper that records every object written during one reconcile.
///
/// Create one per reconcile; the tracked set starts empty and only grows.
pub struct TrackingClient {
    api: Arc<dyn ObjectApi>,
    ownership: Option<OwnershipConfig>,
    tracked: Arc<Mutex<HashSet<ResourceKey>>>,
}

impl TrackingClient {
    /// Create a tracking client. Without an ownership config, [`Self::set_ownership`]
    /// and [`Self::apply_owned`] fail and cleanup deletes nothing by default.
    #[must_use]
    pub fn new(api: Arc<dyn ObjectApi>, ownership: Option<OwnershipConfig>) -> Self {
        Self {
            api,
            ownership,
            tracked: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The ownership config this client stamps objects with.
    #[must_use]
    pub fn ownership(&self) -> Option<&OwnershipConfig> {
        self.ownership.as_ref()
    }

    fn tracked_set(&self) -> MutexGuard<'_, HashSet<ResourceKey>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, key: ResourceKey) {
        debug!(resource = %key, "Tracking resource");
        self.tracked_set().insert(key);
    }

    fn field_manager(&self) -> &str {
        self.ownership
            .as_ref()
            .map_or(DEFAULT_FIELD_MANAGER, |cfg| cfg.field_manager.as_str())
    }

    /// Stamp ownership labels and the controller owner reference onto an object.
    ///
    /// Existing unrelated labels are preserved. `CustomResourceDefinition` objects
    /// receive the labels but never an owner reference, so deleting the owner does not
    /// garbage-collect the CRD (and every custom resource of that kind with it).
    ///
    /// # Errors
    ///
    /// - [`TrackingError::MissingOwnershipConfig`] if the client has no ownership config
    /// - [`TrackingError::InvalidObject`] if the object lacks apiVersion, kind or name
    /// - [`TrackingError::AlreadyControlled`] if another owner already controls the object
    pub fn set_ownership(&self, obj: &mut DynamicObject) -> Result<(), TrackingError> {
        let cfg = self
            .ownership
            .as_ref()
            .ok_or(TrackingError::MissingOwnershipConfig {
                operation: "set ownership",
            })?;
        let key = ResourceKey::from_object(obj)?;

        let labels = obj.metadata.labels.get_or_insert_with(BTreeMap::new);
        labels.insert(cfg.owner_label_key.clone(), cfg.owner.name.clone());
        labels.insert(cfg.component_label_key.clone(), cfg.component.clone());

        if is_crd(&key.gvk) {
            return Ok(());
        }

        let refs = obj.metadata.owner_references.get_or_insert_with(Vec::new);
        let mut owner = cfg.owner.clone();
        owner.controller = Some(true);
        owner.block_owner_deletion = Some(true);

        match refs.iter_mut().find(|r| r.controller == Some(true)) {
            Some(existing) if existing.uid != owner.uid => {
                return Err(TrackingError::AlreadyControlled {
                    resource: key.to_string(),
                    kind: existing.kind.clone(),
                    name: existing.name.clone(),
                    uid: existing.uid.clone(),
                });
            }
            Some(existing) => *existing = owner,
            None => {
                refs.retain(|r| r.uid != owner.uid);
                refs.push(owner);
            }
        }
        Ok(())
    }

    /// Stamp ownership, server-side apply the object, and track it on success.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::set_ownership`] or the apply call. Nothing is
    /// tracked when the apply fails.
    pub async fn apply_owned(&self, mut obj: DynamicObject) -> Result<DynamicObject, TrackingError> {
        self.set_ownership(&mut obj)?;
        let key = ResourceKey::from_object(&obj)?;
        obj.metadata.managed_fields = None;
        obj.metadata.resource_version = None;

        debug!(resource = %key, field_manager = %self.field_manager(), "Applying owned resource");
        let applied = self.api.apply(&obj, self.field_manager()).await?;
        self.track(key);
        Ok(applied)
    }

    /// Typed variant of [`Self::apply_owned`].
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Serialization`] if the object cannot be converted, or
    /// any error from [`Self::apply_owned`].
    pub async fn apply_owned_resource<K>(&self, obj: &K) -> Result<DynamicObject, TrackingError>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        self.apply_owned(to_dynamic(obj)?).await
    }

    /// Create an object and track it.
    ///
    /// When the API reports `AlreadyExists` the key is tracked anyway (another writer
    /// created what this reconcile wants to keep) and the error is still returned.
    ///
    /// # Errors
    ///
    /// Returns the API error, including `AlreadyExists`.
    pub async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject, TrackingError> {
        let key = ResourceKey::from_object(obj)?;
        match self.api.create(obj).await {
            Ok(created) => {
                info!(resource = %key, "Created resource");
                self.track(key);
                Ok(created)
            }
            Err(e) if e.is_already_exists() => {
                debug!(resource = %key, "Resource already exists, tracking it anyway");
                self.track(key);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace an existing object and track it.
    ///
    /// # Errors
    ///
    /// Returns the API error; nothing is tracked on failure.
    pub async fn update(&self, obj: &DynamicObject) -> Result<DynamicObject, TrackingError> {
        let key = ResourceKey::from_object(obj)?;
        let updated = self.api.replace(obj).await?;
        debug!(resource = %key, "Updated resource");
        self.track(key);
        Ok(updated)
    }

    /// Patch an existing object and track it.
    ///
    /// # Errors
    ///
    /// Returns the API error; nothing is tracked on failure.
    pub async fn patch(
        &self,
        key: &ResourceKey,
        patch: &ObjectPatch,
    ) -> Result<DynamicObject, TrackingError> {
        let patched = self.api.patch(key, patch, self.field_manager()).await?;
        debug!(resource = %key, "Patched resource");
        self.track(key.clone());
        Ok(patched)
    }

    /// Create the object, or replace it if it differs from the desired state.
    ///
    /// The object is tracked for every successful outcome, including
    /// [`CreateOrUpdateResult::Unchanged`].
    ///
    /// # Errors
    ///
    /// Returns the first failing API error.
    pub async fn create_or_update(
        &self,
        obj: &DynamicObject,
    ) -> Result<(DynamicObject, CreateOrUpdateResult), TrackingError> {
        let key = ResourceKey::from_object(obj)?;
        let existing = match self.api.get(&key).await {
            Ok(existing) => existing,
            Err(ApiError::NotFound { .. }) => {
                let created = self.create(obj).await?;
                return Ok((created, CreateOrUpdateResult::Created));
            }
            Err(e) => return Err(e.into()),
        };

        if is_unchanged(&existing, obj) {
            debug!(resource = %key, "Resource unchanged");
            self.track(key);
            return Ok((existing, CreateOrUpdateResult::Unchanged));
        }

        let mut desired = obj.clone();
        desired
            .metadata
            .resource_version
            .clone_from(&existing.metadata.resource_version);
        let updated = self.update(&desired).await?;
        Ok((updated, CreateOrUpdateResult::Updated))
    }

    /// Returns `true` if the key was written through this client.
    #[must_use]
    pub fn is_tracked(&self, key: &ResourceKey) -> bool {
        self.tracked_set().contains(key)
    }

    /// Sorted snapshot of every tracked key.
    #[must_use]
    pub fn tracked_resources(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.tracked_set().iter().cloned().collect();
        keys.sort_by_key(ResourceKey::sort_key);
        keys
    }

    /// Delete every object labelled `owner_label_key=owner_label_value` of the given
    /// kinds that was not written through this client.
    ///
    /// Kinds are processed concurrently, one task each. The first failure returns
    /// immediately and stops the remaining tasks from issuing further deletes; calls
    /// already in flight complete and their results are discarded. Kinds the cluster
    /// does not serve have nothing to clean up.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Cleanup`] naming the failing kind, or
    /// [`TrackingError::CleanupTask`] if a task panicked.
    pub async fn cleanup_orphans(
        &self,
        owner_label_key: &str,
        owner_label_value: &str,
        gvks: &[GroupVersionKind],
        options: &CleanupOptions,
    ) -> Result<CleanupReport, TrackingError> {
        let selector = format!("{owner_label_key}={owner_label_value}");
        let cancelled = Arc::new(AtomicBool::new(false));
        let options = Arc::new(options.clone());

        let mut pending = FuturesUnordered::new();
        for gvk in gvks {
            let task = CleanupTask {
                api: Arc::clone(&self.api),
                gvk: gvk.clone(),
                selector: selector.clone(),
                tracked: Arc::clone(&self.tracked),
                ownership: self.ownership.clone(),
                options: Arc::clone(&options),
                cancelled: Arc::clone(&cancelled),
            };
            let kind = gvk.kind.clone();
            let handle = tokio::spawn(task.run());
            pending.push(async move { (kind, handle.await) });
        }

        let mut report = CleanupReport::default();
        while let Some((kind, joined)) = pending.next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    cancelled.store(true, Ordering::SeqCst);
                    return Err(TrackingError::CleanupTask {
                        kind,
                        reason: e.to_string(),
                    });
                }
            };
            match result {
                Ok(kind_report) => report.merge(kind_report),
                Err(e) => {
                    cancelled.store(true, Ordering::SeqCst);
                    warn!(kind = %kind, error = %e, "Orphan cleanup failed, aborting");
                    return Err(e);
                }
            }
        }

        report.sort();
        if !report.deleted.is_empty() {
            info!(
                selector = %selector,
                deleted = report.deleted.len(),
                skipped = report.skipped.len(),
                "Orphan cleanup completed"
            );
        }
        Ok(report)
    }
}

/// Work unit for one kind during orphan cleanup.
struct CleanupTask {
    api: Arc<dyn ObjectApi>,
    gvk: GroupVersionKind,
    selector: String,
    tracked: Arc<Mutex<HashSet<ResourceKey>>>,
    ownership: Option<OwnershipConfig>,
    options: Arc<CleanupOptions>,
    cancelled: Arc<AtomicBool>,
}

impl CleanupTask {
    async fn run(self) -> Result<CleanupReport, TrackingError> {
        let mut report = CleanupReport::default();

        let items = match self.api.list(&self.gvk, &self.selector).await {
            Ok(items) => items,
            Err(e) if e.is_missing_kind() => {
                debug!(kind = %self.gvk.kind, "Kind not installed, nothing to clean up");
                return Ok(report);
            }
            Err(source) => {
                return Err(TrackingError::Cleanup {
                    gvk: self.gvk,
                    source,
                })
            }
        };

        for obj in items {
            let Some(name) = obj.metadata.name.clone() else {
                continue;
            };
            // List items carry no apiVersion/kind, so the key is built from the listed GVK.
            let key = ResourceKey {
                gvk: self.gvk.clone(),
                namespace: obj.metadata.namespace.clone().filter(|ns| !ns.is_empty()),
                name,
            };

            if self.is_tracked(&key) {
                continue;
            }

            if let Some(reason) = self.skip_reason(&key, &obj) {
                warn!(resource = %key, reason = %reason, "Skipping orphan candidate");
                report.skipped.push((key, reason));
                continue;
            }

            if self.cancelled.load(Ordering::SeqCst) {
                debug!(kind = %self.gvk.kind, "Cleanup cancelled, stopping deletes");
                return Ok(report);
            }

            match self.api.delete(&key).await {
                Ok(()) => {
                    info!(resource = %key, "Deleted orphaned resource");
                    report.deleted.push(key);
                }
                Err(e) if e.is_not_found() => {
                    debug!(resource = %key, "Orphan already gone");
                }
                Err(source) => {
                    return Err(TrackingError::Cleanup {
                        gvk: self.gvk,
                        source,
                    })
                }
            }
        }

        Ok(report)
    }

    fn is_tracked(&self, key: &ResourceKey) -> bool {
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    fn skip_reason(&self, key: &ResourceKey, obj: &DynamicObject) -> Option<SkipReason> {
        match &self.ownership {
            Some(cfg) if !is_controlled_by(obj, cfg) => {
                return Some(SkipReason::NotControlledByOwner)
            }
            Some(_) => {}
            None if !self.options.allow_label_only => return Some(SkipReason::NoOwnershipConfig),
            None => {}
        }
        if !self.options.allow_list.is_allowed(key) {
            return Some(SkipReason::NotAllowListed);
        }
        None
    }
}

/// Returns `true` when every field of `desired` is already present in `existing`.
fn is_unchanged(existing: &DynamicObject, desired: &DynamicObject) -> bool {
    json_contains(&existing.data, &desired.data)
        && map_contains(
            existing.metadata.labels.as_ref(),
            desired.metadata.labels.as_ref(),
        )
        && map_contains(
            existing.metadata.annotations.as_ref(),
            desired.metadata.annotations.as_ref(),
        )
}

fn map_contains(
    actual: Option<&BTreeMap<String, String>>,
    desired: Option<&BTreeMap<String, String>>,
) -> bool {
    desired.is_none_or(|desired| {
        desired
            .iter()
            .all(|(k, v)| actual.and_then(|a| a.get(k)) == Some(v))
    })
}

fn json_contains(actual: &Value, desired: &Value) -> bool {
    match (actual, desired) {
        (_, Value::Null) => true,
        (Value::Object(actual), Value::Object(desired)) => desired
            .iter()
            .all(|(k, v)| actual.get(k).is_some_and(|a| json_contains(a, v)) || v.is_null()),
        (Value::Array(actual), Value::Array(desired)) => {
            actual.len() == desired.len()
                && actual.iter().zip(desired).all(|(a, d)| json_contains(a, d))
        }
        (actual, desired) => actual == desired,
    }
}

#[cfg(test)]
#[path = "tracking_tests.rs"]
mod tracking_tests;
