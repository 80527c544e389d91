//! Per-stream event classification.
//!
//! `kube_runtime::watcher` reports applies and deletes without saying whether
//! an apply is a first sighting or a change, and a relist silently drops
//! objects deleted while disconnected. The informer feeds every event into a
//! `reflector` store and reads the store before each write, so it can emit
//! Add/Update/Delete notifications with old and new state, plus
//! final-state-unknown tombstones for objects that disappeared across a
//! relist.

use configmap_refs::{DeletedObject, Notification, ResourceIdentity, ResourceKind};
use kube::Resource;
use kube_runtime::reflector::store::Writer;
use kube_runtime::reflector::{self, ObjectRef, Store};
use kube_runtime::watcher;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// Reflector-backed cache for one resource stream
pub struct Informer<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    kind: ResourceKind,
    writer: Writer<K>,
    store: Store<K>,
}

impl<K> Informer<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Default + Eq + Hash + Clone,
{
    /// Create an informer over an empty store
    pub fn new(kind: ResourceKind) -> Self {
        let (store, writer) = reflector::store();
        Self {
            kind,
            writer,
            store,
        }
    }

    /// Reader for the backing store; ready once the first list completes
    pub fn store(&self) -> Store<K> {
        self.store.clone()
    }

    /// Number of cached objects
    pub fn len(&self) -> usize {
        self.store.state().len()
    }

    /// Translate one watcher event into notifications, in dispatch order.
    pub fn observe(&mut self, event: watcher::Event<K>) -> Vec<Notification<K>> {
        let previous = match &event {
            watcher::Event::Apply(obj) | watcher::Event::InitApply(obj) => {
                self.store.get(&ObjectRef::from_obj(obj))
            }
            _ => None,
        };
        // the writer only swaps in the relisted objects at InitDone
        let before_relist = matches!(event, watcher::Event::InitDone).then(|| self.store.state());

        self.writer.apply_watcher_event(&event);

        match event {
            watcher::Event::Init => {
                debug!(kind = %self.kind, "Relist started");
                Vec::new()
            }
            watcher::Event::Apply(obj) | watcher::Event::InitApply(obj) => {
                vec![match previous {
                    Some(old) => Notification::Update {
                        old: K::clone(&old),
                        new: obj,
                    },
                    None => Notification::Add(obj),
                }]
            }
            watcher::Event::Delete(obj) => vec![Notification::Delete(DeletedObject::Known(obj))],
            watcher::Event::InitDone => self.vanished(before_relist.unwrap_or_default()),
        }
    }

    /// Synthetic updates for every cached object, with `old == new`.
    ///
    /// The store stays empty until the first list completes.
    pub fn resync(&self) -> Vec<Notification<K>> {
        sorted(self.store.state())
            .into_iter()
            .map(|(_, obj)| Notification::Update {
                old: K::clone(&obj),
                new: K::clone(&obj),
            })
            .collect()
    }

    /// Tombstones for objects in `before` that the relist did not bring back
    fn vanished(&self, before: Vec<Arc<K>>) -> Vec<Notification<K>> {
        let missing: Vec<Arc<K>> = before
            .into_iter()
            .filter(|obj| self.store.get(&ObjectRef::from_obj(obj.as_ref())).is_none())
            .collect();

        if !missing.is_empty() {
            debug!(
                kind = %self.kind,
                count = missing.len(),
                "Objects vanished during relist"
            );
        }

        sorted(missing)
            .into_iter()
            .map(|(id, obj)| {
                Notification::Delete(DeletedObject::FinalStateUnknown {
                    key: id.to_string(),
                    object: Some(K::clone(&obj)),
                })
            })
            .collect()
    }
}

/// Named objects ordered by identity
fn sorted<K: Resource>(objects: Vec<Arc<K>>) -> Vec<(ResourceIdentity, Arc<K>)> {
    let mut named: Vec<_> = objects
        .into_iter()
        .filter_map(|obj| ResourceIdentity::from_resource(obj.as_ref()).map(|id| (id, obj)))
        .collect();
    named.sort_by(|a, b| a.0.cmp(&b.0));
    named
}
