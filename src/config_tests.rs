// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::{LogFormat, OperatorArgs};
    use crate::constants::{DEFAULT_FIELD_MANAGER, METRICS_SERVER_PORT};
    use clap::Parser;
    use std::time::Duration;

    // Environment fallbacks are not exercised here; the process environment is
    // shared between tests.

    #[test]
    fn test_explicit_flags() {
        let args = OperatorArgs::try_parse_from([
            "plinth",
            "--metrics-bind-address",
            "127.0.0.1",
            "--metrics-port",
            "9100",
            "--log-format",
            "JSON",
            "--version-poll-interval",
            "60",
            "--field-manager",
            "plinth-dev",
        ])
        .unwrap();

        assert_eq!(args.metrics_addr().to_string(), "127.0.0.1:9100");
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(args.version_poll_interval(), Some(Duration::from_secs(60)));
        assert_eq!(args.settings().field_manager, "plinth-dev");
    }

    #[test]
    fn test_zero_poll_interval_disables_polling() {
        let args =
            OperatorArgs::try_parse_from(["plinth", "--version-poll-interval", "0"]).unwrap();
        assert_eq!(args.version_poll_interval(), None);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(OperatorArgs::try_parse_from(["plinth", "--metrics-port", "http"]).is_err());
        assert!(OperatorArgs::try_parse_from(["plinth", "--log-format", "xml"]).is_err());
        assert!(
            OperatorArgs::try_parse_from(["plinth", "--metrics-bind-address", "localhost"])
                .is_err()
        );
    }

    #[test]
    fn test_defaults_are_constants() {
        // Only meaningful when the fallback variables are unset
        if std::env::var_os("PLINTH_METRICS_PORT").is_some()
            || std::env::var_os("PLINTH_FIELD_MANAGER").is_some()
        {
            return;
        }
        let args = OperatorArgs::try_parse_from(["plinth"]).unwrap();
        assert_eq!(args.metrics_port, METRICS_SERVER_PORT);
        assert_eq!(args.field_manager, DEFAULT_FIELD_MANAGER);
    }
}
