// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ownership.rs`

#[cfg(test)]
mod tests {
    use crate::labels::{PLINTH_COMPONENT_LABEL, PLINTH_OWNER_LABEL};
    use crate::ownership::{
        api_version_of, controller_of, gvk_from_type_meta, gvk_of, is_controlled_by, is_crd,
        to_dynamic, OwnershipConfig, ResourceKey,
    };
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
    use kube::api::{DynamicObject, TypeMeta};
    use kube::core::GroupVersionKind;

    fn owner_configmap(uid: Option<&str>) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("platform".into()),
                uid: uid.map(String::from),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn owner_ref(name: &str, uid: &str, controller: bool) -> OwnerReference {
        OwnerReference {
            api_version: "v1".into(),
            kind: "ConfigMap".into(),
            name: name.into(),
            uid: uid.into(),
            controller: Some(controller),
            block_owner_deletion: Some(true),
        }
    }

    fn dynamic(api_version: &str, kind: &str, name: &str) -> DynamicObject {
        DynamicObject {
            types: Some(TypeMeta {
                api_version: api_version.into(),
                kind: kind.into(),
            }),
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            data: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_resource_key_display_namespaced() {
        let key = ResourceKey::namespaced(
            GroupVersionKind::gvk("apps", "v1", "Deployment"),
            "plinth",
            "controller",
        );
        assert_eq!(key.to_string(), "Deployment/plinth/controller");
        assert!(!key.is_cluster_scoped());
    }

    #[test]
    fn test_resource_key_display_cluster_scoped() {
        let key = ResourceKey::cluster(
            GroupVersionKind::gvk("rbac.authorization.k8s.io", "v1", "ClusterRole"),
            "plinth-admin",
        );
        assert_eq!(key.to_string(), "ClusterRole/plinth-admin");
        assert!(key.is_cluster_scoped());
    }

    #[test]
    fn test_resource_key_from_object_treats_empty_namespace_as_cluster() {
        let mut obj = dynamic("v1", "Namespace", "plinth");
        obj.metadata.namespace = Some(String::new());
        let key = ResourceKey::from_object(&obj).unwrap();
        assert!(key.is_cluster_scoped());
        assert_eq!(key.gvk.group, "");
        assert_eq!(key.gvk.version, "v1");
    }

    #[test]
    fn test_resource_key_from_object_requires_name() {
        let mut obj = dynamic("apps/v1", "Deployment", "x");
        obj.metadata.name = None;
        assert!(ResourceKey::from_object(&obj).is_err());
    }

    #[test]
    fn test_gvk_of_requires_types() {
        let mut obj = dynamic("apps/v1", "Deployment", "x");
        obj.types = None;
        assert!(gvk_of(&obj).is_err());
    }

    #[test]
    fn test_gvk_from_type_meta_splits_group() {
        let gvk = gvk_from_type_meta(&TypeMeta {
            api_version: "operator.plinth.dev/v1alpha1".into(),
            kind: "Dashboard".into(),
        });
        assert_eq!(gvk.group, "operator.plinth.dev");
        assert_eq!(gvk.version, "v1alpha1");
        assert_eq!(gvk.kind, "Dashboard");
        assert_eq!(api_version_of(&gvk), "operator.plinth.dev/v1alpha1");
    }

    #[test]
    fn test_api_version_of_core_group() {
        let gvk = GroupVersionKind::gvk("", "v1", "ConfigMap");
        assert_eq!(api_version_of(&gvk), "v1");
    }

    #[test]
    fn test_is_crd() {
        assert!(is_crd(&GroupVersionKind::gvk(
            "apiextensions.k8s.io",
            "v1",
            "CustomResourceDefinition"
        )));
        assert!(!is_crd(&GroupVersionKind::gvk("apps", "v1", "Deployment")));
    }

    #[test]
    fn test_for_owner_requires_uid() {
        let result = OwnershipConfig::for_owner(&owner_configmap(None), "pipelines", "test");
        assert!(result.is_err());
    }

    #[test]
    fn test_for_owner_uses_default_label_keys() {
        let cfg = OwnershipConfig::for_owner(&owner_configmap(Some("uid-1")), "pipelines", "test")
            .unwrap();
        assert_eq!(cfg.owner_label_key, PLINTH_OWNER_LABEL);
        assert_eq!(cfg.component_label_key, PLINTH_COMPONENT_LABEL);
        assert_eq!(cfg.owner.uid, "uid-1");
        assert_eq!(cfg.owner.controller, Some(true));
        assert_eq!(cfg.owner_label_value(), "platform");
    }

    #[test]
    fn test_is_controlled_by_requires_matching_uid() {
        let cfg = OwnershipConfig::for_owner(&owner_configmap(Some("uid-1")), "pipelines", "test")
            .unwrap();

        let mut owned = dynamic("apps/v1", "Deployment", "d");
        owned.metadata.owner_references = Some(vec![owner_ref("platform", "uid-1", true)]);
        assert!(is_controlled_by(&owned, &cfg));

        let mut spoofed = dynamic("apps/v1", "Deployment", "d");
        spoofed.metadata.owner_references = Some(vec![owner_ref("platform", "uid-2", true)]);
        assert!(!is_controlled_by(&spoofed, &cfg));

        let mut renamed = dynamic("apps/v1", "Deployment", "d");
        renamed.metadata.owner_references = Some(vec![owner_ref("other", "uid-1", true)]);
        assert!(!is_controlled_by(&renamed, &cfg));
    }

    #[test]
    fn test_is_controlled_by_ignores_non_controller_refs() {
        let cfg = OwnershipConfig::for_owner(&owner_configmap(Some("uid-1")), "pipelines", "test")
            .unwrap();
        let mut obj = dynamic("apps/v1", "Deployment", "d");
        obj.metadata.owner_references = Some(vec![owner_ref("platform", "uid-1", false)]);
        assert!(controller_of(&obj).is_none());
        assert!(!is_controlled_by(&obj, &cfg));
    }

    #[test]
    fn test_to_dynamic_fills_type_meta() {
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("settings".into()),
                namespace: Some("plinth".into()),
                ..Default::default()
            },
            data: Some([("key".to_string(), "value".to_string())].into()),
            ..Default::default()
        };
        let obj = to_dynamic(&cm).unwrap();
        let types = obj.types.as_ref().unwrap();
        assert_eq!(types.api_version, "v1");
        assert_eq!(types.kind, "ConfigMap");
        assert_eq!(obj.data["data"]["key"], "value");

        let key = ResourceKey::from_object(&obj).unwrap();
        assert_eq!(key.to_string(), "ConfigMap/plinth/settings");
    }
}
