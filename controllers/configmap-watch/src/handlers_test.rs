//! Unit tests for the event handlers

#[cfg(test)]
mod tests {
    use crate::handlers::{Dispatch, Handlers, deliver};
    use crate::test_utils::*;
    use configmap_refs::{
        DeletedObject, Envelope, LifecycleNotification, Notification, Operation, RecordingSink,
        ReferenceKey, ResourceIdentity, ResourceKind, ReverseIndex,
    };
    use k8s_openapi::api::core::v1::{ConfigMap, Pod};
    use std::sync::Arc;

    fn setup() -> (Handlers, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let handlers = Handlers::new(Arc::new(ReverseIndex::new()), Arc::<RecordingSink>::clone(&sink));
        (handlers, sink)
    }

    fn pod_event(handlers: &Handlers, notification: Notification<Pod>) {
        deliver(handlers, ResourceKind::Pod, notification);
    }

    fn config_map_event(handlers: &Handlers, notification: Notification<ConfigMap>) {
        deliver(handlers, ResourceKind::ConfigMap, notification);
    }

    fn update_config_map(handlers: &Handlers, namespace: &str, name: &str) {
        config_map_event(
            handlers,
            Notification::Update {
                old: config_map(namespace, name, &[("x", "1")]),
                new: config_map(namespace, name, &[("x", "2")]),
            },
        );
    }

    fn identity(namespace: &str, name: &str) -> ResourceIdentity {
        ResourceIdentity::new(namespace, name)
    }

    #[test]
    fn test_env_reference_reports_affected_pod() {
        let (handlers, sink) = setup();

        pod_event(
            &handlers,
            Notification::Add(pod_with_env_ref("ns", "web", "FOO", "app-config", "x")),
        );
        update_config_map(&handlers, "ns", "app-config");

        let report = sink.last_report().expect("update should report affected pods");
        assert_eq!(report.namespace, "ns");
        assert_eq!(report.name, "app-config");
        assert_eq!(report.affected_count, 1);
        assert_eq!(report.affected, vec![identity("ns", "web")]);
    }

    #[test]
    fn test_deleted_pod_is_not_reported() {
        let (handlers, sink) = setup();

        pod_event(&handlers, Notification::Add(pod_with_volumes("ns", "a", &["shared"])));
        pod_event(&handlers, Notification::Add(pod_with_volumes("ns", "b", &["shared"])));
        pod_event(
            &handlers,
            Notification::Delete(DeletedObject::Known(pod_with_volumes("ns", "a", &["shared"]))),
        );
        update_config_map(&handlers, "ns", "shared");

        let report = sink.last_report().expect("update should report affected pods");
        assert_eq!(report.affected_count, 1);
        assert_eq!(report.affected, vec![identity("ns", "b")]);
    }

    #[test]
    fn test_tombstone_delete_removes_pod() {
        let (handlers, sink) = setup();

        pod_event(&handlers, Notification::Add(pod_with_volumes("ns", "web", &["cfg"])));
        pod_event(
            &handlers,
            Notification::Delete(DeletedObject::FinalStateUnknown {
                key: "ns/web".to_string(),
                object: Some(pod_with_volumes("ns", "web", &["cfg"])),
            }),
        );

        assert!(handlers.index().is_empty());
        assert_eq!(
            sink.lifecycle_events().last(),
            Some(&LifecycleNotification::new(
                ResourceKind::Pod,
                Operation::Delete,
                &identity("ns", "web"),
            ))
        );
    }

    #[test]
    fn test_unrecoverable_tombstone_is_dropped() {
        let (handlers, sink) = setup();

        pod_event(&handlers, Notification::Add(pod_with_volumes("ns", "web", &["cfg"])));
        pod_event(
            &handlers,
            Notification::Delete(DeletedObject::FinalStateUnknown {
                key: "ns/web".to_string(),
                object: None,
            }),
        );

        // only the add was notified, and the index is untouched
        assert_eq!(sink.lifecycle_events().len(), 1);
        assert_eq!(
            handlers.index().keys_for(&identity("ns", "web")),
            vec![ReferenceKey::new("ns", "cfg")]
        );
    }

    #[test]
    fn test_update_without_referencing_pods_reports_zero() {
        let (handlers, sink) = setup();

        pod_event(&handlers, Notification::Add(bare_pod("ns", "idle")));
        update_config_map(&handlers, "ns", "unused");

        let report = sink.last_report().expect("update should report affected pods");
        assert_eq!(report.affected_count, 0);
        assert!(report.affected.is_empty());
    }

    #[test]
    fn test_pod_update_drops_stale_references() {
        let (handlers, sink) = setup();

        let before = pod_with_volumes("ns", "web", &["old", "kept"]);
        let after = pod_with_volumes("ns", "web", &["kept"]);
        pod_event(&handlers, Notification::Add(before.clone()));
        pod_event(&handlers, Notification::Update { old: before, new: after });

        update_config_map(&handlers, "ns", "old");
        assert_eq!(sink.last_report().map(|r| r.affected_count), Some(0));

        update_config_map(&handlers, "ns", "kept");
        assert_eq!(sink.last_report().map(|r| r.affected_count), Some(1));
    }

    #[test]
    fn test_config_map_add_and_delete_only_notify() {
        let (handlers, sink) = setup();

        pod_event(&handlers, Notification::Add(pod_with_volumes("ns", "web", &["cfg"])));
        config_map_event(&handlers, Notification::Add(config_map("ns", "cfg", &[])));
        config_map_event(
            &handlers,
            Notification::Delete(DeletedObject::FinalStateUnknown {
                key: "ns/cfg".to_string(),
                object: Some(config_map("ns", "cfg", &[])),
            }),
        );

        assert!(sink.affected_reports().is_empty());
        let ops: Vec<_> = sink
            .lifecycle_events()
            .into_iter()
            .filter(|n| n.kind == ResourceKind::ConfigMap)
            .map(|n| n.operation)
            .collect();
        assert_eq!(ops, vec![Operation::Add, Operation::Delete]);
        // deleting the ConfigMap leaves pod membership in place
        assert_eq!(handlers.index().len(), 1);
    }

    #[test]
    fn test_lifecycle_order_for_pod_stream() {
        let (handlers, sink) = setup();
        let pod = bare_pod("ns", "web");

        pod_event(&handlers, Notification::Add(pod.clone()));
        pod_event(&handlers, Notification::Update { old: pod.clone(), new: pod.clone() });
        pod_event(&handlers, Notification::Delete(DeletedObject::Known(pod)));

        let ops: Vec<_> = sink.lifecycle_events().into_iter().map(|n| n.operation).collect();
        assert_eq!(ops, vec![Operation::Add, Operation::Update, Operation::Delete]);
    }

    #[test]
    fn test_nameless_objects_are_ignored() {
        let (handlers, sink) = setup();
        let mut pod = bare_pod("ns", "web");
        pod.metadata.name = None;

        handlers.dispatch(Envelope::decode(ResourceKind::Pod, Notification::Add(pod)).unwrap());

        assert!(sink.lifecycle_events().is_empty());
        assert!(handlers.index().is_empty());
    }
}
