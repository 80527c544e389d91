//! Lifecycle notification sink
//!
//! Handlers report every lifecycle event and, for ConfigMap updates, the set
//! of affected Pods. The default [`TracingSink`] writes them as structured
//! `tracing` events.

use crate::envelope::{Operation, ResourceKind};
use crate::identity::ResourceIdentity;
use serde::Serialize;
use tracing::info;

/// A resource was added, updated or deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleNotification {
    /// Kind of the resource
    pub kind: ResourceKind,
    /// What happened to it
    pub operation: Operation,
    /// Resource namespace
    pub namespace: String,
    /// Resource name
    pub name: String,
}

impl LifecycleNotification {
    /// Build a notification for an identity
    pub fn new(kind: ResourceKind, operation: Operation, identity: &ResourceIdentity) -> Self {
        Self {
            kind,
            operation,
            namespace: identity.namespace.clone(),
            name: identity.name.clone(),
        }
    }
}

/// Pods referencing an updated ConfigMap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedPods {
    /// ConfigMap namespace
    pub namespace: String,
    /// ConfigMap name
    pub name: String,
    /// Number of affected pods
    pub affected_count: usize,
    /// Affected pod identities, sorted
    pub affected: Vec<ResourceIdentity>,
}

impl AffectedPods {
    /// Build the report for a ConfigMap and its referencing pods
    pub fn new(config_map: &ResourceIdentity, affected: Vec<ResourceIdentity>) -> Self {
        Self {
            namespace: config_map.namespace.clone(),
            name: config_map.name.clone(),
            affected_count: affected.len(),
            affected,
        }
    }
}

/// Receiver of lifecycle notifications.
///
/// Called synchronously from the watch streams; implementations must not
/// block.
pub trait NotificationSink: Send + Sync {
    /// Record a lifecycle event
    fn lifecycle(&self, notification: &LifecycleNotification);

    /// Record the pods affected by a ConfigMap update
    fn affected(&self, report: &AffectedPods);
}

/// Sink writing notifications as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn lifecycle(&self, n: &LifecycleNotification) {
        info!(
            kind = %n.kind,
            operation = %n.operation,
            namespace = %n.namespace,
            name = %n.name,
            "[{}] {}: {}/{}",
            n.operation,
            n.kind,
            n.namespace,
            n.name
        );
    }

    fn affected(&self, report: &AffectedPods) {
        info!(
            namespace = %report.namespace,
            name = %report.name,
            affected_count = report.affected_count,
            "Found {} Pods using this ConfigMap:",
            report.affected_count
        );
        for pod in &report.affected {
            info!(
                namespace = %report.namespace,
                name = %report.name,
                pod = %pod,
                " - {}",
                pod
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_affected_report_counts_pods() {
        let report = AffectedPods::new(
            &ResourceIdentity::new("ns", "shared"),
            vec![ResourceIdentity::new("ns", "a"), ResourceIdentity::new("ns", "b")],
        );
        assert_eq!(report.affected_count, 2);
        assert_eq!(report.name, "shared");
    }

    #[test]
    fn test_notifications_serialize_camel_case() {
        let report = AffectedPods::new(
            &ResourceIdentity::new("ns", "app-config"),
            vec![ResourceIdentity::new("ns", "web")],
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "namespace": "ns",
                "name": "app-config",
                "affectedCount": 1,
                "affected": [{"namespace": "ns", "name": "web"}],
            })
        );

        let lifecycle = LifecycleNotification::new(
            ResourceKind::Pod,
            Operation::Delete,
            &ResourceIdentity::new("ns", "web"),
        );
        assert_eq!(
            serde_json::to_value(&lifecycle).unwrap(),
            json!({
                "kind": "Pod",
                "operation": "DELETE",
                "namespace": "ns",
                "name": "web",
            })
        );
    }
}
