// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource identity and ownership model.
//!
//! [`ResourceKey`] identifies a Kubernetes object (GVK + namespace + name) and is the
//! element type of the tracking client's tracked set. [`OwnershipConfig`] describes how
//! every applied object is stamped so it can later be recognized as owned by one
//! specific custom resource instance and one logical component.
//!
//! Ownership is recorded twice on each generated object:
//!
//! - an owner label (value = owner name) plus a component label, used to *find*
//!   candidates during orphan cleanup
//! - a controller `ownerReference` carrying the owner's UID, used to *prove* ownership
//!   before anything is deleted
//!
//! Labels alone are never trusted for deletion: anyone able to edit an object can add a
//! label, but nobody can forge the UID of a live owner.

use crate::constants::{CRD_API_GROUP, KIND_CUSTOM_RESOURCE_DEFINITION};
use crate::errors::TrackingError;
use crate::labels::{PLINTH_COMPONENT_LABEL, PLINTH_OWNER_LABEL};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DynamicObject, TypeMeta};
use kube::core::GroupVersionKind;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Identity key of a Kubernetes object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    /// Group, version and kind of the object
    pub gvk: GroupVersionKind,
    /// Namespace, `None` for cluster-scoped objects
    pub namespace: Option<String>,
    /// Object name
    pub name: String,
}

impl ResourceKey {
    /// Create a key for a namespaced object.
    #[must_use]
    pub fn namespaced(gvk: GroupVersionKind, namespace: &str, name: &str) -> Self {
        Self {
            gvk,
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
        }
    }

    /// Create a key for a cluster-scoped object.
    #[must_use]
    pub fn cluster(gvk: GroupVersionKind, name: &str) -> Self {
        Self {
            gvk,
            namespace: None,
            name: name.to_string(),
        }
    }

    /// Build the key of a dynamic object.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidObject`] if the object has no type information
    /// or no name.
    pub fn from_object(obj: &DynamicObject) -> Result<Self, TrackingError> {
        let gvk = gvk_of(obj)?;
        let name = obj
            .metadata
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| TrackingError::InvalidObject {
                reason: format!("{} object has no metadata.name", gvk.kind),
            })?;
        Ok(Self {
            gvk,
            namespace: obj.metadata.namespace.clone().filter(|ns| !ns.is_empty()),
            name,
        })
    }

    /// Returns `true` when the key has no namespace.
    #[must_use]
    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_none()
    }

    /// Sort key used to produce deterministic listings of tracked resources.
    pub(crate) fn sort_key(&self) -> (String, String, String, String, String) {
        (
            self.gvk.group.clone(),
            self.gvk.version.clone(),
            self.gvk.kind.clone(),
            self.namespace.clone().unwrap_or_default(),
            self.name.clone(),
        )
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.gvk.kind, ns, self.name),
            None => write!(f, "{}/{}", self.gvk.kind, self.name),
        }
    }
}

/// Describes how newly applied objects are stamped as owned.
///
/// Supplied once per reconcile and immutable for the lifetime of one tracking client.
#[derive(Clone, Debug)]
pub struct OwnershipConfig {
    /// Controller reference to the owning custom resource (must carry its UID)
    pub owner: OwnerReference,
    /// Label key whose value is the owner name
    pub owner_label_key: String,
    /// Label key whose value is the component name
    pub component_label_key: String,
    /// Logical component that generated the objects
    pub component: String,
    /// Field manager for server-side apply
    pub field_manager: String,
}

impl OwnershipConfig {
    /// Build an ownership config for a live custom resource using the default label keys.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::OwnerWithoutUid`] if the owner has not been read from
    /// the API server (no UID), since an owner reference without a UID cannot be
    /// verified later.
    pub fn for_owner<K>(owner: &K, component: &str, field_manager: &str) -> Result<Self, TrackingError>
    where
        K: Resource<DynamicType = ()>,
    {
        let owner_ref = owner
            .controller_owner_ref(&())
            .ok_or_else(|| TrackingError::OwnerWithoutUid {
                kind: K::kind(&()).to_string(),
                name: owner.meta().name.clone().unwrap_or_default(),
            })?;

        Ok(Self {
            owner: owner_ref,
            owner_label_key: PLINTH_OWNER_LABEL.to_string(),
            component_label_key: PLINTH_COMPONENT_LABEL.to_string(),
            component: component.to_string(),
            field_manager: field_manager.to_string(),
        })
    }

    /// Value stamped into the owner label.
    #[must_use]
    pub fn owner_label_value(&self) -> &str {
        &self.owner.name
    }

    /// Returns `true` if the given reference points at this config's owner,
    /// comparing kind, name **and** UID.
    #[must_use]
    pub fn is_owner(&self, reference: &OwnerReference) -> bool {
        reference.uid == self.owner.uid
            && reference.kind == self.owner.kind
            && reference.name == self.owner.name
            && api_group(&reference.api_version) == api_group(&self.owner.api_version)
    }
}

/// Parse the GVK of a dynamic object from its `apiVersion` and `kind`.
///
/// # Errors
///
/// Returns [`TrackingError::InvalidObject`] if type information is missing.
pub fn gvk_of(obj: &DynamicObject) -> Result<GroupVersionKind, TrackingError> {
    let types = obj
        .types
        .as_ref()
        .filter(|t| !t.api_version.is_empty() && !t.kind.is_empty())
        .ok_or_else(|| TrackingError::InvalidObject {
            reason: format!(
                "object {} has no apiVersion/kind",
                obj.metadata.name.as_deref().unwrap_or("<unnamed>")
            ),
        })?;
    Ok(gvk_from_type_meta(types))
}

/// Convert `apiVersion` + `kind` into a [`GroupVersionKind`].
///
/// Core resources use a bare version (`v1`) and map to the empty group.
#[must_use]
pub fn gvk_from_type_meta(types: &TypeMeta) -> GroupVersionKind {
    let (group, version) = match types.api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", types.api_version.as_str()),
    };
    GroupVersionKind::gvk(group, version, &types.kind)
}

/// `apiVersion` string for a GVK.
#[must_use]
pub fn api_version_of(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    }
}

fn api_group(api_version: &str) -> &str {
    api_version.split_once('/').map_or("", |(group, _)| group)
}

/// Returns `true` when the GVK is a `CustomResourceDefinition`.
#[must_use]
pub fn is_crd(gvk: &GroupVersionKind) -> bool {
    gvk.group == CRD_API_GROUP && gvk.kind == KIND_CUSTOM_RESOURCE_DEFINITION
}

/// Returns the controller owner reference of an object, if any.
#[must_use]
pub fn controller_of(obj: &DynamicObject) -> Option<&OwnerReference> {
    obj.metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|owner| owner.controller == Some(true))
}

/// Returns `true` if the object's controller reference matches the config's owner
/// (kind, name and UID).
///
/// A reference with the right name but a different UID (a recreated owner, or a forged
/// reference) does not count as owned.
#[must_use]
pub fn is_controlled_by(obj: &DynamicObject, ownership: &OwnershipConfig) -> bool {
    controller_of(obj).is_some_and(|reference| ownership.is_owner(reference))
}

/// Convert a typed Kubernetes object into a [`DynamicObject`].
///
/// The `apiVersion` and `kind` are always taken from the Rust type so a default-built
/// object without `TypeMeta` still converts.
///
/// # Errors
///
/// Returns [`TrackingError::Serialization`] if the object cannot be serialized.
pub fn to_dynamic<K>(obj: &K) -> Result<DynamicObject, TrackingError>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let mut value = serde_json::to_value(obj)?;
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "apiVersion".to_string(),
            K::api_version(&()).into_owned().into(),
        );
        map.insert("kind".to_string(), K::kind(&()).into_owned().into());
    }
    let mut dynamic: DynamicObject = serde_json::from_value(value)?;
    dynamic.types = Some(TypeMeta {
        api_version: K::api_version(&()).into_owned(),
        kind: K::kind(&()).into_owned(),
    });
    Ok(dynamic)
}

/// Convert a [`DynamicObject`] returned by the API back into a typed object.
///
/// # Errors
///
/// Returns [`TrackingError::Serialization`] if the object does not match `K`.
pub fn from_dynamic<K: DeserializeOwned>(obj: &DynamicObject) -> Result<K, TrackingError> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

#[cfg(test)]
#[path = "ownership_tests.rs"]
mod ownership_tests;
