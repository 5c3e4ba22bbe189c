// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Minimal object API used by the tracking client.
//!
//! The tracking client only needs a handful of untyped operations on arbitrary kinds:
//! read, create, replace, patch, server-side apply, list by label and delete. They are
//! expressed by the [`ObjectApi`] trait so the apply and cleanup logic runs unchanged
//! against a live cluster ([`KubeObjectApi`]) or an in-memory fake in unit tests.
//!
//! [`KubeObjectApi`] resolves each GVK through API discovery once and caches the
//! result. Kinds the cluster does not serve are reported as [`ApiError::MissingKind`].

use crate::errors::ApiError;
use crate::ownership::{api_version_of, ResourceKey};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::core::GroupVersionKind;
use kube::discovery::{self, ApiCapabilities, ApiResource, Scope};
use kube::Client;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Patch body accepted by [`ObjectApi::patch`].
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectPatch {
    /// JSON merge patch (RFC 7386)
    Merge(serde_json::Value),
    /// Strategic merge patch
    Strategic(serde_json::Value),
}

/// Untyped object operations the tracking client writes through.
#[async_trait]
pub trait ObjectApi: Send + Sync {
    /// Read one object.
    async fn get(&self, key: &ResourceKey) -> Result<DynamicObject, ApiError>;

    /// Create an object. Fails with [`ApiError::AlreadyExists`] if it exists.
    async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject, ApiError>;

    /// Replace an existing object.
    async fn replace(&self, obj: &DynamicObject) -> Result<DynamicObject, ApiError>;

    /// Patch an existing object.
    async fn patch(
        &self,
        key: &ResourceKey,
        patch: &ObjectPatch,
        field_manager: &str,
    ) -> Result<DynamicObject, ApiError>;

    /// Server-side apply an object, forcing ownership of conflicting fields.
    async fn apply(
        &self,
        obj: &DynamicObject,
        field_manager: &str,
    ) -> Result<DynamicObject, ApiError>;

    /// List objects of one kind across all namespaces matching a label selector.
    async fn list(
        &self,
        gvk: &GroupVersionKind,
        label_selector: &str,
    ) -> Result<Vec<DynamicObject>, ApiError>;

    /// Delete an object.
    async fn delete(&self, key: &ResourceKey) -> Result<(), ApiError>;
}

/// [`ObjectApi`] backed by a live cluster.
pub struct KubeObjectApi {
    client: Client,
    resources: RwLock<HashMap<GroupVersionKind, (ApiResource, ApiCapabilities)>>,
}

impl KubeObjectApi {
    /// Create a new object API using the given client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: RwLock::new(HashMap::new()),
        }
    }

    async fn resolve(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<(ApiResource, ApiCapabilities), ApiError> {
        if let Some(found) = self.resources.read().await.get(gvk).cloned() {
            return Ok(found);
        }

        let found = match discovery::pinned_kind(&self.client, gvk).await {
            Ok(found) => found,
            Err(kube::Error::Discovery(_)) => return Err(missing_kind(gvk)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => return Err(missing_kind(gvk)),
            Err(e) => return Err(e.into()),
        };

        debug!(
            group = %gvk.group,
            version = %gvk.version,
            kind = %gvk.kind,
            plural = %found.0.plural,
            "Resolved API resource"
        );
        self.resources
            .write()
            .await
            .insert(gvk.clone(), found.clone());
        Ok(found)
    }

    async fn api_for(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Result<Api<DynamicObject>, ApiError> {
        let (ar, caps) = self.resolve(gvk).await?;
        let api = match (&caps.scope, namespace) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, &ar),
            _ => Api::all_with(self.client.clone(), &ar),
        };
        Ok(api)
    }
}

fn missing_kind(gvk: &GroupVersionKind) -> ApiError {
    ApiError::MissingKind {
        kind: gvk.kind.clone(),
        group_version: api_version_of(gvk),
    }
}

/// Normalize a kube error for the given resource.
fn classify(err: kube::Error, resource: &ResourceKey) -> ApiError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => ApiError::NotFound {
            resource: resource.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
            ApiError::AlreadyExists {
                resource: resource.to_string(),
            }
        }
        kube::Error::Api(ae) if ae.code == 409 => ApiError::Conflict {
            resource: resource.to_string(),
            message: ae.message,
        },
        other => ApiError::Kube(other),
    }
}

fn object_key(obj: &DynamicObject) -> Result<ResourceKey, ApiError> {
    ResourceKey::from_object(obj).map_err(|e| ApiError::InvalidObject {
        reason: e.to_string(),
    })
}

#[async_trait]
impl ObjectApi for KubeObjectApi {
    async fn get(&self, key: &ResourceKey) -> Result<DynamicObject, ApiError> {
        let api = self.api_for(&key.gvk, key.namespace.as_deref()).await?;
        api.get(&key.name).await.map_err(|e| classify(e, key))
    }

    async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject, ApiError> {
        let key = object_key(obj)?;
        let api = self.api_for(&key.gvk, key.namespace.as_deref()).await?;
        api.create(&PostParams::default(), obj)
            .await
            .map_err(|e| classify(e, &key))
    }

    async fn replace(&self, obj: &DynamicObject) -> Result<DynamicObject, ApiError> {
        let key = object_key(obj)?;
        let api = self.api_for(&key.gvk, key.namespace.as_deref()).await?;
        api.replace(&key.name, &PostParams::default(), obj)
            .await
            .map_err(|e| classify(e, &key))
    }

    async fn patch(
        &self,
        key: &ResourceKey,
        patch: &ObjectPatch,
        field_manager: &str,
    ) -> Result<DynamicObject, ApiError> {
        let api = self.api_for(&key.gvk, key.namespace.as_deref()).await?;
        let params = PatchParams {
            field_manager: Some(field_manager.to_string()),
            ..PatchParams::default()
        };
        let result = match patch {
            ObjectPatch::Merge(body) => api.patch(&key.name, &params, &Patch::Merge(body)).await,
            ObjectPatch::Strategic(body) => {
                api.patch(&key.name, &params, &Patch::Strategic(body)).await
            }
        };
        result.map_err(|e| classify(e, key))
    }

    async fn apply(
        &self,
        obj: &DynamicObject,
        field_manager: &str,
    ) -> Result<DynamicObject, ApiError> {
        let key = object_key(obj)?;
        let api = self.api_for(&key.gvk, key.namespace.as_deref()).await?;
        let params = PatchParams::apply(field_manager).force();
        api.patch(&key.name, &params, &Patch::Apply(obj))
            .await
            .map_err(|e| classify(e, &key))
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        label_selector: &str,
    ) -> Result<Vec<DynamicObject>, ApiError> {
        let api = self.api_for(gvk, None).await?;
        match api.list(&ListParams::default().labels(label_selector)).await {
            Ok(list) => Ok(list.items),
            // The CRD was removed after discovery was cached.
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                self.resources.write().await.remove(gvk);
                Err(missing_kind(gvk))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), ApiError> {
        let api = self.api_for(&key.gvk, key.namespace.as_deref()).await?;
        api.delete(&key.name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, key))
    }
}
