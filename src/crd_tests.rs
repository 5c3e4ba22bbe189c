// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `crd.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{Dashboard, PipelineEngine, PlatformConfig, PlatformConfigSpec};
    use kube::CustomResourceExt;

    #[test]
    fn test_platform_config_defaults() {
        let spec: PlatformConfigSpec = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(spec.target_namespace.is_none());
        assert!(spec.components.pipelines.enabled);
        assert!(spec.components.dashboard.enabled);
        assert!(spec.required_crds.is_empty());
    }

    #[test]
    fn test_platform_config_parses_camel_case() {
        let spec: PlatformConfigSpec = serde_json::from_value(serde_json::json!({
            "targetNamespace": "ci",
            "consoleUrl": "https://console.example.com",
            "components": {
                "dashboard": {
                    "enabled": false,
                    "options": {
                        "deployments": {
                            "plinth-dashboard": {
                                "replicas": 2,
                                "containers": [{
                                    "name": "plinth-dashboard",
                                    "resources": { "limits": { "cpu": "500m" } },
                                    "env": [{ "name": "LOG_LEVEL", "value": "debug" }]
                                }]
                            }
                        }
                    }
                }
            },
            "requiredCrds": ["certificates.cert-manager.io"]
        }))
        .unwrap();

        assert_eq!(spec.target_namespace.as_deref(), Some("ci"));
        assert!(spec.components.pipelines.enabled);
        assert!(!spec.components.dashboard.enabled);
        let custom = &spec.components.dashboard.options.deployments["plinth-dashboard"];
        assert_eq!(custom.replicas, Some(2));
        assert_eq!(
            custom.containers[0]
                .resources
                .as_ref()
                .and_then(|r| r.limits.as_ref())
                .and_then(|l| l.cpu.as_deref()),
            Some("500m")
        );
        assert_eq!(spec.required_crds, vec!["certificates.cert-manager.io"]);
    }

    #[test]
    fn test_crds_are_cluster_scoped() {
        for crd in [PlatformConfig::crd(), PipelineEngine::crd(), Dashboard::crd()] {
            assert_eq!(crd.spec.scope, "Cluster");
            assert_eq!(crd.spec.group, "operator.plinth.dev");
        }
    }
}
