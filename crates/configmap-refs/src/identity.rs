//! Resource identities and ConfigMap reference keys
//!
//! A reference key is the `namespace/name` encoding of a ConfigMap identity.
//! `/` is not a legal character in Kubernetes object names or namespaces, so
//! distinct identities never collide.

use crate::error::RefsError;
use kube::Resource;
use serde::Serialize;
use std::fmt;

/// Separator between namespace and name in a reference key.
pub const KEY_SEPARATOR: char = '/';

/// Uniquely identifies an object of a known kind by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceIdentity {
    /// The object namespace
    pub namespace: String,
    /// The object name
    pub name: String,
}

impl ResourceIdentity {
    /// Create an identity from a namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a Kubernetes object.
    ///
    /// Returns `None` when the object has no name. A missing namespace maps to
    /// the empty string.
    pub fn from_resource<K: Resource>(resource: &K) -> Option<Self> {
        let meta = resource.meta();
        let name = meta.name.clone()?;
        Some(Self {
            namespace: meta.namespace.clone().unwrap_or_default(),
            name,
        })
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, KEY_SEPARATOR, self.name)
    }
}

/// Index key naming a ConfigMap as `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReferenceKey(String);

impl ReferenceKey {
    /// Key for the ConfigMap `name` in `namespace`
    pub fn new(namespace: &str, name: &str) -> Self {
        let mut key = String::with_capacity(namespace.len() + name.len() + 1);
        key.push_str(namespace);
        key.push(KEY_SEPARATOR);
        key.push_str(name);
        Self(key)
    }

    /// Key for a ConfigMap identity
    pub fn for_identity(identity: &ResourceIdentity) -> Self {
        Self::new(&identity.namespace, &identity.name)
    }

    /// Parse a `namespace/name` string.
    ///
    /// # Errors
    ///
    /// Returns [`RefsError::InvalidReferenceKey`] when the separator is missing.
    pub fn parse(key: &str) -> Result<Self, RefsError> {
        if key.contains(KEY_SEPARATOR) {
            Ok(Self(key.to_string()))
        } else {
            Err(RefsError::InvalidReferenceKey(key.to_string()))
        }
    }

    /// The raw `namespace/name` string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_identity_from_resource() {
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("app-config".to_string()),
                namespace: Some("ns".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let identity = ResourceIdentity::from_resource(&cm);
        assert_eq!(identity, Some(ResourceIdentity::new("ns", "app-config")));
    }

    #[test]
    fn test_identity_requires_name() {
        let cm = ConfigMap::default();
        assert_eq!(ResourceIdentity::from_resource(&cm), None);
    }

    #[test]
    fn test_identity_is_case_sensitive() {
        assert_ne!(
            ResourceIdentity::new("ns", "Web"),
            ResourceIdentity::new("ns", "web")
        );
    }

    #[test]
    fn test_key_encoding() {
        let key = ReferenceKey::new("ns", "app-config");
        assert_eq!(key.as_str(), "ns/app-config");
        assert_eq!(key.to_string(), "ns/app-config");
        assert_eq!(
            ReferenceKey::for_identity(&ResourceIdentity::new("ns", "app-config")),
            key
        );
    }

    #[test]
    fn test_key_parse_rejects_missing_separator() {
        assert_eq!(
            ReferenceKey::parse("app-config"),
            Err(RefsError::InvalidReferenceKey("app-config".to_string()))
        );
        assert_eq!(
            ReferenceKey::parse("ns/app-config"),
            Ok(ReferenceKey::new("ns", "app-config"))
        );
    }
}
