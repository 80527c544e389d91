//! Event handlers.
//!
//! Pod events maintain the reverse index; ConfigMap updates query it and
//! report the affected Pods. Handlers are synchronous and bounded so an
//! in-flight event always finishes quickly during shutdown.

use configmap_refs::{
    AffectedPods, Envelope, LifecycleNotification, Notification, NotificationSink, Operation,
    ReferenceKey, ResourceIdentity, ResourceKind, ReverseIndex, extract,
};
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use std::sync::Arc;
use tracing::{debug, warn};

/// Receives decoded envelopes for one resource kind
pub trait Dispatch<K>: Send + Sync {
    /// Handle one envelope
    fn dispatch(&self, envelope: Envelope<K>);
}

/// Decode a raw notification and hand it to the handler.
///
/// Tombstones without a recoverable object are logged and dropped.
pub fn deliver<K, H>(handler: &H, kind: ResourceKind, notification: Notification<K>)
where
    H: Dispatch<K> + ?Sized,
{
    match Envelope::decode(kind, notification) {
        Ok(envelope) => handler.dispatch(envelope),
        Err(e) => warn!(kind = %kind, "Dropping notification: {}", e),
    }
}

/// Handlers for the ConfigMap and Pod streams, sharing one index.
pub struct Handlers {
    index: Arc<ReverseIndex>,
    sink: Arc<dyn NotificationSink>,
}

impl Handlers {
    /// Creates handlers writing to `sink`.
    pub fn new(index: Arc<ReverseIndex>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { index, sink }
    }

    /// The shared reverse index
    pub fn index(&self) -> &ReverseIndex {
        &self.index
    }

    fn notify(&self, kind: ResourceKind, operation: Operation, identity: &ResourceIdentity) {
        self.sink
            .lifecycle(&LifecycleNotification::new(kind, operation, identity));
    }

    /// Handles a ConfigMap event.
    ///
    /// Updates additionally report every Pod currently referencing the
    /// ConfigMap. Deletes leave the index alone: Pods still referencing a
    /// deleted ConfigMap remain a valid answer.
    pub fn handle_config_map(&self, envelope: &Envelope<ConfigMap>) {
        let Some(identity) = ResourceIdentity::from_resource(envelope.object()) else {
            warn!(operation = %envelope.operation, "Ignoring ConfigMap without a name");
            return;
        };

        self.notify(ResourceKind::ConfigMap, envelope.operation, &identity);

        if envelope.operation == Operation::Update {
            let pods = self.index.lookup(&ReferenceKey::for_identity(&identity));
            self.sink.affected(&AffectedPods::new(&identity, pods));
        }
    }

    /// Handles a Pod event.
    ///
    /// The index is updated before the lifecycle notification so a
    /// concurrent ConfigMap update sees the newest Pod state.
    pub fn handle_pod(&self, envelope: &Envelope<Pod>) {
        let pod = envelope.object();
        let Some(identity) = ResourceIdentity::from_resource(pod) else {
            warn!(operation = %envelope.operation, "Ignoring Pod without a name");
            return;
        };

        match envelope.operation {
            Operation::Add | Operation::Update => {
                let keys = extract(pod);
                debug!(pod = %identity, references = keys.len(), "Indexing pod");
                self.index.upsert(&identity, keys);
            }
            Operation::Delete => self.index.remove(&identity),
        }

        self.notify(ResourceKind::Pod, envelope.operation, &identity);
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl Dispatch<ConfigMap> for Handlers {
    fn dispatch(&self, envelope: Envelope<ConfigMap>) {
        self.handle_config_map(&envelope);
    }
}

impl Dispatch<Pod> for Handlers {
    fn dispatch(&self, envelope: Envelope<Pod>) {
        self.handle_pod(&envelope);
    }
}
