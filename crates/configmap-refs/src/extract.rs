//! ConfigMap reference extraction from Pod specs
//!
//! Scans three reference sites, in order:
//! 1. volumes with a `configMap` source
//! 2. each container's `envFrom[].configMapRef`
//! 3. each container's `env[].valueFrom.configMapKeyRef`
//!
//! References always resolve in the Pod's own namespace. Duplicates across
//! sites are kept in scan order.

use crate::identity::ReferenceKey;
use k8s_openapi::api::core::v1::{Container, Pod};

/// Extract every ConfigMap reference key from a Pod.
///
/// Never fails; a Pod without references (or without a spec) yields an
/// empty vector.
pub fn extract(pod: &Pod) -> Vec<ReferenceKey> {
    let Some(spec) = pod.spec.as_ref() else {
        return Vec::new();
    };
    let ns = pod.metadata.namespace.as_deref().unwrap_or_default();

    let volumes = spec
        .volumes
        .iter()
        .flatten()
        .filter_map(|vol| vol.config_map.as_ref())
        .map(|source| ReferenceKey::new(ns, &source.name));

    let env_from = spec
        .containers
        .iter()
        .flat_map(env_from_sources)
        .map(|name| ReferenceKey::new(ns, name));

    let env = spec
        .containers
        .iter()
        .flat_map(env_value_sources)
        .map(|name| ReferenceKey::new(ns, name));

    volumes.chain(env_from).chain(env).collect()
}

fn env_from_sources(container: &Container) -> impl Iterator<Item = &str> {
    container
        .env_from
        .iter()
        .flatten()
        .filter_map(|source| source.config_map_ref.as_ref())
        .map(|cm| cm.name.as_str())
}

fn env_value_sources(container: &Container) -> impl Iterator<Item = &str> {
    container
        .env
        .iter()
        .flatten()
        .filter_map(|var| var.value_from.as_ref())
        .filter_map(|source| source.config_map_key_ref.as_ref())
        .map(|selector| selector.name.as_str())
}
