// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding:
//! - the Kubernetes client, used for typed reads and status patches
//! - the untyped object API the tracking clients write through
//! - operator settings

use crate::errors::TrackingError;
use crate::kube_api::{KubeObjectApi, ObjectApi};
use crate::ownership::OwnershipConfig;
use crate::tracking::TrackingClient;
use kube::{Client, Resource};
use std::sync::Arc;

/// Operator-wide settings resolved at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Field manager for server-side apply
    pub field_manager: String,
}

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Object API shared by every tracking client (discovery cache included)
    pub api: Arc<dyn ObjectApi>,

    pub settings: Settings,
}

impl Context {
    #[must_use]
    pub fn new(client: Client, settings: Settings) -> Self {
        let api: Arc<dyn ObjectApi> = Arc::new(KubeObjectApi::new(client.clone()));
        Self {
            client,
            api,
            settings,
        }
    }

    /// Create a fresh tracking client owned by `owner` for one reconcile.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::OwnerWithoutUid`] if the owner has no UID.
    pub fn tracking_client<K>(&self, owner: &K, component: &str) -> Result<TrackingClient, TrackingError>
    where
        K: Resource<DynamicType = ()>,
    {
        let ownership = OwnershipConfig::for_owner(owner, component, &self.settings.field_manager)?;
        Ok(TrackingClient::new(Arc::clone(&self.api), Some(ownership)))
    }
}
