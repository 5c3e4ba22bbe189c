// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator command line and environment configuration.
//!
//! Every flag has an environment fallback so the operator can be configured from a
//! Deployment manifest without changing its arguments.

use crate::constants::{
    DEFAULT_FIELD_MANAGER, DEFAULT_VERSION_POLL_INTERVAL_SECS, METRICS_SERVER_BIND_ADDRESS,
    METRICS_SERVER_PORT,
};
use crate::context::Settings;
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Plinth operator: installs and lifecycle-manages the CI/CD platform.
#[derive(Parser, Debug, Clone)]
#[command(name = "plinth", version, about, long_about = None)]
pub struct OperatorArgs {
    /// Address the metrics server binds to
    #[arg(long, env = "PLINTH_METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: IpAddr,

    /// Port the metrics server listens on
    #[arg(long, env = "PLINTH_METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, ignore_case = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Seconds between Kubernetes server version checks (0 disables the check)
    #[arg(long, env = "PLINTH_VERSION_POLL_INTERVAL", default_value_t = DEFAULT_VERSION_POLL_INTERVAL_SECS)]
    pub version_poll_interval: u64,

    /// Field manager used for server-side apply
    #[arg(long, env = "PLINTH_FIELD_MANAGER", default_value = DEFAULT_FIELD_MANAGER)]
    pub field_manager: String,
}

impl OperatorArgs {
    #[must_use]
    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::new(self.metrics_bind_address, self.metrics_port)
    }

    /// Version poll interval, `None` when polling is disabled.
    #[must_use]
    pub fn version_poll_interval(&self) -> Option<Duration> {
        (self.version_poll_interval > 0).then(|| Duration::from_secs(self.version_poll_interval))
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            field_manager: self.field_manager.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
