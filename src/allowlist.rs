// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Allow-list restricting which cluster-scoped objects orphan cleanup may delete.
//!
//! Cluster-scoped objects (`ClusterRole`, `Namespace`, sub custom resources) are visible
//! to every tenant of the cluster, so a label match alone is a weak signal. The
//! allow-list narrows deletion to names the reconciler knows it generates:
//!
//! - namespaced candidates always pass
//! - a GVK absent from the list is unrestricted
//! - a GVK present with an empty name set blocks every deletion of that kind

use crate::ownership::ResourceKey;
use kube::core::GroupVersionKind;
use std::collections::{HashMap, HashSet};

/// Per-GVK set of cluster-scoped names that may be deleted.
#[derive(Clone, Debug, Default)]
pub struct ClusterScopedAllowList {
    names: HashMap<GroupVersionKind, HashSet<String>>,
}

impl ClusterScopedAllowList {
    /// Create an empty allow-list (every GVK unrestricted).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow deletion of the given names for a GVK, restricting it to those names.
    #[must_use]
    pub fn allow<I, S>(mut self, gvk: GroupVersionKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names
            .entry(gvk)
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Block every deletion of a cluster-scoped GVK.
    #[must_use]
    pub fn deny_all(mut self, gvk: GroupVersionKind) -> Self {
        self.names.entry(gvk).or_default();
        self
    }

    /// Returns `true` if the candidate may be deleted.
    #[must_use]
    pub fn is_allowed(&self, key: &ResourceKey) -> bool {
        if !key.is_cluster_scoped() {
            return true;
        }
        self.names
            .get(&key.gvk)
            .is_none_or(|allowed| allowed.contains(&key.name))
    }
}

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod allowlist_tests;
