// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ObjectApi`] used by unit tests.
//!
//! `FakeObjectApi` keeps objects in a map keyed by [`ResourceKey`], assigns UIDs and
//! resource versions on write, evaluates equality label selectors, and records every
//! delete. Individual kinds can be marked as not installed, and individual lists or
//! deletes can be forced to fail, to exercise the error paths of the tracking client.

use crate::errors::ApiError;
use crate::kube_api::{ObjectApi, ObjectPatch};
use crate::ownership::{api_version_of, ResourceKey};
use async_trait::async_trait;
use kube::api::{DynamicObject, TypeMeta};
use kube::core::{GroupVersionKind, Status};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-memory object store implementing [`ObjectApi`].
#[derive(Default)]
pub struct FakeObjectApi {
    objects: Mutex<HashMap<ResourceKey, DynamicObject>>,
    missing_kinds: Mutex<HashSet<GroupVersionKind>>,
    failing_lists: Mutex<HashSet<GroupVersionKind>>,
    failing_deletes: Mutex<HashSet<ResourceKey>>,
    conflicting_creates: Mutex<HashSet<ResourceKey>>,
    deleted: Mutex<Vec<ResourceKey>>,
    counter: AtomicU64,
}

impl FakeObjectApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, bypassing every failure switch.
    pub fn insert(&self, mut obj: DynamicObject) -> DynamicObject {
        let key = ResourceKey::from_object(&obj).expect("seeded object must have identity");
        self.stamp(&mut obj);
        lock(&self.objects).insert(key, obj.clone());
        obj
    }

    /// Mark a kind as not served by the cluster.
    pub fn set_missing_kind(&self, gvk: GroupVersionKind) {
        lock(&self.missing_kinds).insert(gvk);
    }

    /// Make every list of the kind fail with a server error.
    pub fn fail_list(&self, gvk: GroupVersionKind) {
        lock(&self.failing_lists).insert(gvk);
    }

    /// Make deleting the object fail with a server error.
    pub fn fail_delete(&self, key: ResourceKey) {
        lock(&self.failing_deletes).insert(key);
    }

    /// Make creating the object report `AlreadyExists` even when absent,
    /// simulating a concurrent writer.
    pub fn race_create(&self, key: ResourceKey) {
        lock(&self.conflicting_creates).insert(key);
    }

    pub fn get_object(&self, key: &ResourceKey) -> Option<DynamicObject> {
        lock(&self.objects).get(key).cloned()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        lock(&self.objects).contains_key(key)
    }

    /// Keys deleted so far, in call order.
    pub fn deleted(&self) -> Vec<ResourceKey> {
        lock(&self.deleted).clone()
    }

    fn stamp(&self, obj: &mut DynamicObject) {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if obj.metadata.uid.is_none() {
            obj.metadata.uid = Some(format!("uid-{n}"));
        }
        obj.metadata.resource_version = Some(n.to_string());
    }

    fn check_kind(&self, gvk: &GroupVersionKind) -> Result<(), ApiError> {
        if lock(&self.missing_kinds).contains(gvk) {
            return Err(ApiError::MissingKind {
                kind: gvk.kind.clone(),
                group_version: api_version_of(gvk),
            });
        }
        Ok(())
    }

    fn key_of(obj: &DynamicObject) -> Result<ResourceKey, ApiError> {
        ResourceKey::from_object(obj).map_err(|e| ApiError::InvalidObject {
            reason: e.to_string(),
        })
    }

    fn merge_into(
        &self,
        key: &ResourceKey,
        body: &Value,
        create_missing: bool,
    ) -> Result<DynamicObject, ApiError> {
        self.check_kind(&key.gvk)?;
        let mut objects = lock(&self.objects);
        let mut current = match objects.get(key) {
            Some(existing) => serde_json::to_value(existing)?,
            None if create_missing => serde_json::json!({
                "apiVersion": api_version_of(&key.gvk),
                "kind": key.gvk.kind,
                "metadata": { "name": key.name, "namespace": key.namespace },
            }),
            None => {
                return Err(ApiError::NotFound {
                    resource: key.to_string(),
                })
            }
        };
        json_merge(&mut current, body);
        let mut merged: DynamicObject = serde_json::from_value(current)?;
        merged.types = Some(TypeMeta {
            api_version: api_version_of(&key.gvk),
            kind: key.gvk.kind.clone(),
        });
        if let Some(existing) = objects.get(key) {
            merged.metadata.uid.clone_from(&existing.metadata.uid);
        }
        self.stamp(&mut merged);
        objects.insert(key.clone(), merged.clone());
        Ok(merged)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RFC 7386 JSON merge patch.
fn json_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (k, v) in patch {
                if v.is_null() {
                    target.remove(k);
                } else {
                    json_merge(target.entry(k.clone()).or_insert(Value::Null), v);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

fn server_error(message: &str) -> ApiError {
    ApiError::Kube(kube::Error::Api(
        Status::failure(message, "InternalError").with_code(500).boxed(),
    ))
}

fn matches_selector(labels: Option<&BTreeMap<String, String>>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.and_then(|l| l.get(k)).is_some_and(|actual| actual == v),
            None => labels.is_some_and(|l| l.contains_key(term)),
        })
}

#[async_trait]
impl ObjectApi for FakeObjectApi {
    async fn get(&self, key: &ResourceKey) -> Result<DynamicObject, ApiError> {
        self.check_kind(&key.gvk)?;
        self.get_object(key).ok_or_else(|| ApiError::NotFound {
            resource: key.to_string(),
        })
    }

    async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject, ApiError> {
        let key = Self::key_of(obj)?;
        self.check_kind(&key.gvk)?;
        if lock(&self.conflicting_creates).contains(&key) || self.contains(&key) {
            return Err(ApiError::AlreadyExists {
                resource: key.to_string(),
            });
        }
        let mut stored = obj.clone();
        self.stamp(&mut stored);
        lock(&self.objects).insert(key, stored.clone());
        Ok(stored)
    }

    async fn replace(&self, obj: &DynamicObject) -> Result<DynamicObject, ApiError> {
        let key = Self::key_of(obj)?;
        self.check_kind(&key.gvk)?;
        let mut objects = lock(&self.objects);
        let existing = objects.get(&key).ok_or_else(|| ApiError::NotFound {
            resource: key.to_string(),
        })?;
        let mut stored = obj.clone();
        stored.metadata.uid.clone_from(&existing.metadata.uid);
        self.stamp(&mut stored);
        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn patch(
        &self,
        key: &ResourceKey,
        patch: &ObjectPatch,
        _field_manager: &str,
    ) -> Result<DynamicObject, ApiError> {
        let body = match patch {
            ObjectPatch::Merge(body) | ObjectPatch::Strategic(body) => body,
        };
        self.merge_into(key, body, false)
    }

    async fn apply(
        &self,
        obj: &DynamicObject,
        _field_manager: &str,
    ) -> Result<DynamicObject, ApiError> {
        let key = Self::key_of(obj)?;
        let body = serde_json::to_value(obj)?;
        self.merge_into(&key, &body, true)
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        label_selector: &str,
    ) -> Result<Vec<DynamicObject>, ApiError> {
        self.check_kind(gvk)?;
        if lock(&self.failing_lists).contains(gvk) {
            return Err(server_error("list failed"));
        }
        let mut items: Vec<(ResourceKey, DynamicObject)> = lock(&self.objects)
            .iter()
            .filter(|(key, obj)| {
                &key.gvk == gvk && matches_selector(obj.metadata.labels.as_ref(), label_selector)
            })
            .map(|(key, obj)| (key.clone(), obj.clone()))
            .collect();
        items.sort_by_key(|(key, _)| key.sort_key());
        Ok(items.into_iter().map(|(_, obj)| obj).collect())
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), ApiError> {
        self.check_kind(&key.gvk)?;
        if lock(&self.failing_deletes).contains(key) {
            return Err(server_error("delete failed"));
        }
        match lock(&self.objects).remove(key) {
            Some(_) => {
                lock(&self.deleted).push(key.clone());
                Ok(())
            }
            None => Err(ApiError::NotFound {
                resource: key.to_string(),
            }),
        }
    }
}
