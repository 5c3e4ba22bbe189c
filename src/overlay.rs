// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deployment customization overlay.
//!
//! A [`PodOverlay`] describes partial changes to a generated `Deployment`: a replica
//! count and, per named container, CPU/memory requests and limits plus environment
//! variables. [`PodOverlay::apply_to_deployment`] layers it onto the Deployment in
//! place without touching anything the overlay does not mention.
//!
//! # Merge rules
//!
//! - each of `requests.cpu`, `requests.memory`, `limits.cpu` and `limits.memory` is set
//!   when present and left alone otherwise
//! - environment variables merge by name; user variables are applied first and system
//!   variables last, so a system variable always replaces a same-named user value
//! - empty values and a replica count of zero or less are ignored
//! - containers the Deployment does not have are skipped
//!
//! Every quantity is validated before the Deployment is modified.
//!
//! # Example
//!
//! ```rust
//! use plinth::overlay::{ContainerOverlay, PodOverlay};
//! use k8s_openapi::api::apps::v1::Deployment;
//!
//! let overlay = PodOverlay::new()
//!     .with_replicas(2)
//!     .with_container(ContainerOverlay::new("dashboard").limits(Some("500m"), None))
//!     .with_system_env("dashboard", "CONSOLE_URL", "https://console.example.com");
//!
//! let mut deployment = Deployment::default();
//! overlay.apply_to_deployment(&mut deployment).unwrap();
//! assert_eq!(deployment.spec.unwrap().replicas, Some(2));
//! ```

use crate::crd::{DeploymentOverride, ResourceQuantities};
use crate::errors::OverlayError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, EnvVar, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::debug;

/// Binary and decimal SI suffixes accepted in Kubernetes quantities.
const QUANTITY_SUFFIXES: [&str; 15] = [
    "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T", "P", "E",
];

/// Partial resource requirements for one container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceOverlay {
    pub requests_cpu: Option<String>,
    pub requests_memory: Option<String>,
    pub limits_cpu: Option<String>,
    pub limits_memory: Option<String>,
}

impl ResourceOverlay {
    fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, _, value)| value.is_none())
    }

    /// `(section, resource, value)` for every non-empty leaf.
    fn fields(&self) -> [(&'static str, &'static str, Option<&str>); 4] {
        [
            ("requests", "cpu", non_empty(self.requests_cpu.as_deref())),
            ("requests", "memory", non_empty(self.requests_memory.as_deref())),
            ("limits", "cpu", non_empty(self.limits_cpu.as_deref())),
            ("limits", "memory", non_empty(self.limits_memory.as_deref())),
        ]
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Changes for one named container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerOverlay {
    pub name: String,
    pub resources: ResourceOverlay,
    /// User supplied variables, applied first
    pub user_env: Vec<(String, String)>,
    /// Operator computed variables, applied last
    pub system_env: Vec<(String, String)>,
}

impl ContainerOverlay {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Set CPU and/or memory requests. `None` leaves the value untouched.
    #[must_use]
    pub fn requests(mut self, cpu: Option<&str>, memory: Option<&str>) -> Self {
        if let Some(cpu) = cpu {
            self.resources.requests_cpu = Some(cpu.to_string());
        }
        if let Some(memory) = memory {
            self.resources.requests_memory = Some(memory.to_string());
        }
        self
    }

    /// Set CPU and/or memory limits. `None` leaves the value untouched.
    #[must_use]
    pub fn limits(mut self, cpu: Option<&str>, memory: Option<&str>) -> Self {
        if let Some(cpu) = cpu {
            self.resources.limits_cpu = Some(cpu.to_string());
        }
        if let Some(memory) = memory {
            self.resources.limits_memory = Some(memory.to_string());
        }
        self
    }

    #[must_use]
    pub fn user_env(mut self, name: &str, value: &str) -> Self {
        self.user_env.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn system_env(mut self, name: &str, value: &str) -> Self {
        self.system_env.push((name.to_string(), value.to_string()));
        self
    }

    fn merge(&mut self, other: Self) {
        let ResourceOverlay {
            requests_cpu,
            requests_memory,
            limits_cpu,
            limits_memory,
        } = other.resources;
        if requests_cpu.is_some() {
            self.resources.requests_cpu = requests_cpu;
        }
        if requests_memory.is_some() {
            self.resources.requests_memory = requests_memory;
        }
        if limits_cpu.is_some() {
            self.resources.limits_cpu = limits_cpu;
        }
        if limits_memory.is_some() {
            self.resources.limits_memory = limits_memory;
        }
        self.user_env.extend(other.user_env);
        self.system_env.extend(other.system_env);
    }

    fn validate(&self) -> Result<(), OverlayError> {
        for (section, resource, value) in self.resources.fields() {
            if let Some(value) = value {
                if !is_valid_quantity(value) {
                    return Err(OverlayError::InvalidQuantity {
                        container: self.name.clone(),
                        field: format!("{section}.{resource}"),
                        value: value.to_string(),
                    });
                }
            }
        }
        if self
            .user_env
            .iter()
            .chain(&self.system_env)
            .any(|(name, _)| name.is_empty())
        {
            return Err(OverlayError::EmptyEnvName {
                container: self.name.clone(),
            });
        }
        Ok(())
    }

    fn apply_to_container(&self, container: &mut Container) {
        if !self.resources.is_empty() {
            let resources = container
                .resources
                .get_or_insert_with(ResourceRequirements::default);
            for (section, resource, value) in self.resources.fields() {
                let Some(value) = value else { continue };
                let target = if section == "requests" {
                    &mut resources.requests
                } else {
                    &mut resources.limits
                };
                target
                    .get_or_insert_with(BTreeMap::new)
                    .insert(resource.to_string(), Quantity(value.to_string()));
            }
        }

        if self.user_env.is_empty() && self.system_env.is_empty() {
            return;
        }
        let env = container.env.get_or_insert_with(Vec::new);
        for (name, value) in self.user_env.iter().chain(&self.system_env) {
            upsert_env(env, name, value);
        }
    }
}

/// Replace the variable with a plain value, or append it.
fn upsert_env(env: &mut Vec<EnvVar>, name: &str, value: &str) {
    match env.iter_mut().find(|var| var.name == name) {
        Some(existing) => {
            existing.value = Some(value.to_string());
            existing.value_from = None;
        }
        None => env.push(EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            value_from: None,
        }),
    }
}

/// Overlay for a whole Deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodOverlay {
    pub replicas: Option<i32>,
    pub containers: Vec<ContainerOverlay>,
}

impl PodOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an overlay from a user customization.
    #[must_use]
    pub fn from_override(custom: &DeploymentOverride) -> Self {
        let mut overlay = Self {
            replicas: custom.replicas,
            containers: Vec::new(),
        };
        for container in &custom.containers {
            let mut entry = ContainerOverlay::new(&container.name);
            if let Some(resources) = &container.resources {
                let (req_cpu, req_mem) = quantities(resources.requests.as_ref());
                let (lim_cpu, lim_mem) = quantities(resources.limits.as_ref());
                entry = entry.requests(req_cpu, req_mem).limits(lim_cpu, lim_mem);
            }
            for var in &container.env {
                entry = entry.user_env(&var.name, &var.value);
            }
            overlay = overlay.with_container(entry);
        }
        overlay
    }

    #[must_use]
    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = Some(replicas);
        self
    }

    /// Add a container overlay, merging with an existing one of the same name.
    #[must_use]
    pub fn with_container(mut self, container: ContainerOverlay) -> Self {
        match self.containers.iter_mut().find(|c| c.name == container.name) {
            Some(existing) => existing.merge(container),
            None => self.containers.push(container),
        }
        self
    }

    /// Add an operator computed variable that always wins over user input.
    #[must_use]
    pub fn with_system_env(self, container: &str, name: &str, value: &str) -> Self {
        self.with_container(ContainerOverlay::new(container).system_env(name, value))
    }

    /// Check every quantity and variable name.
    ///
    /// # Errors
    ///
    /// Returns the first [`OverlayError`] found.
    pub fn validate(&self) -> Result<(), OverlayError> {
        self.containers.iter().try_for_each(ContainerOverlay::validate)
    }

    /// Layer the overlay onto a Deployment in place.
    ///
    /// # Errors
    ///
    /// Returns an [`OverlayError`] if validation fails; the Deployment is not modified
    /// in that case.
    pub fn apply_to_deployment(&self, deployment: &mut Deployment) -> Result<(), OverlayError> {
        self.validate()?;

        if let Some(replicas) = self.replicas.filter(|r| *r > 0) {
            deployment.spec.get_or_insert_with(Default::default).replicas = Some(replicas);
        }

        let Some(pod_spec) = deployment
            .spec
            .as_mut()
            .and_then(|spec| spec.template.spec.as_mut())
        else {
            return Ok(());
        };

        for overlay in &self.containers {
            match pod_spec.containers.iter_mut().find(|c| c.name == overlay.name) {
                Some(container) => overlay.apply_to_container(container),
                None => debug!(
                    container = %overlay.name,
                    deployment = deployment.metadata.name.as_deref().unwrap_or_default(),
                    "Overlay names a container the deployment does not have, skipping"
                ),
            }
        }
        Ok(())
    }
}

fn quantities(q: Option<&ResourceQuantities>) -> (Option<&str>, Option<&str>) {
    q.map_or((None, None), |q| (q.cpu.as_deref(), q.memory.as_deref()))
}

/// Returns `true` for a valid Kubernetes resource quantity (`500m`, `1.5`, `64Mi`, `1e3`).
#[must_use]
pub fn is_valid_quantity(value: &str) -> bool {
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);

    let number = if let Some(suffix) = QUANTITY_SUFFIXES.iter().find(|s| unsigned.ends_with(**s)) {
        &unsigned[..unsigned.len() - suffix.len()]
    } else if let Some((mantissa, exponent)) = unsigned.split_once(['e', 'E']) {
        let exponent = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if exponent.is_empty() || !exponent.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        mantissa
    } else {
        unsigned
    };

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    !(whole.is_empty() && fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod overlay_tests;
