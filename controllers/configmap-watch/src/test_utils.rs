//! Test utilities for building ConfigMaps and Pods
//!
//! This module provides helpers for creating test data for handler and informer tests.

#[cfg(test)]
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapKeySelector, ConfigMapVolumeSource, Container, EnvVar, EnvVarSource, Pod,
    PodSpec, Volume,
};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

#[cfg(test)]
fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

/// Helper to create a test ConfigMap with the given data entries
#[cfg(test)]
pub fn config_map(namespace: &str, name: &str, data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: meta(namespace, name),
        data: (!data.is_empty()).then(|| {
            data.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }),
        ..Default::default()
    }
}

/// Helper to create a test Pod with a single container and no references
#[cfg(test)]
pub fn bare_pod(namespace: &str, name: &str) -> Pod {
    Pod {
        metadata: meta(namespace, name),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create a test Pod whose container reads `var` from a ConfigMap key
#[cfg(test)]
pub fn pod_with_env_ref(namespace: &str, name: &str, var: &str, cm: &str, key: &str) -> Pod {
    let mut pod = bare_pod(namespace, name);
    if let Some(container) = pod.spec.as_mut().and_then(|s| s.containers.first_mut()) {
        container.env = Some(vec![EnvVar {
            name: var.to_string(),
            value_from: Some(EnvVarSource {
                config_map_key_ref: Some(ConfigMapKeySelector {
                    name: cm.to_string(),
                    key: key.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);
    }
    pod
}

/// Helper to create a test Pod mounting each listed ConfigMap as a volume
#[cfg(test)]
pub fn pod_with_volumes(namespace: &str, name: &str, config_maps: &[&str]) -> Pod {
    let mut pod = bare_pod(namespace, name);
    if let Some(spec) = pod.spec.as_mut() {
        spec.volumes = Some(
            config_maps
                .iter()
                .map(|cm| Volume {
                    name: format!("{cm}-vol"),
                    config_map: Some(ConfigMapVolumeSource {
                        name: cm.to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                })
                .collect(),
        );
    }
    pod
}
