//! Reverse index from ConfigMap reference key to referencing Pods
//!
//! Keeps both directions of the relation under a single lock:
//! - forward: pod → keys it currently references
//! - reverse: key → pods currently referencing it
//!
//! The forward map lets `upsert` compute the symmetric difference between a
//! pod's previous and current keys without re-extracting a stale object.

use crate::identity::{ReferenceKey, ResourceIdentity};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

#[derive(Debug, Default)]
struct IndexState {
    forward: HashMap<ResourceIdentity, BTreeSet<ReferenceKey>>,
    reverse: HashMap<ReferenceKey, BTreeSet<ResourceIdentity>>,
}

impl IndexState {
    fn detach(&mut self, pod: &ResourceIdentity, key: &ReferenceKey) {
        if let Some(pods) = self.reverse.get_mut(key) {
            pods.remove(pod);
            if pods.is_empty() {
                self.reverse.remove(key);
            }
        }
    }
}

/// Thread-safe multi-map from reference key to pod identities.
///
/// All operations take the lock exactly once and never suspend while holding
/// it, so each call is atomic with respect to every other call.
#[derive(Debug, Default)]
pub struct ReverseIndex {
    state: Mutex<IndexState>,
}

impl ReverseIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    // Both maps are consistent between statements that can panic, so a
    // poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Replace the pod's membership with exactly `keys`.
    ///
    /// Keys no longer referenced are dropped, duplicated keys collapse to one
    /// membership. Calling twice with the same keys is a no-op.
    pub fn upsert(&self, pod: &ResourceIdentity, keys: impl IntoIterator<Item = ReferenceKey>) {
        let new_keys: BTreeSet<ReferenceKey> = keys.into_iter().collect();
        let mut state = self.lock();

        let old_keys = if new_keys.is_empty() {
            state.forward.remove(pod).unwrap_or_default()
        } else {
            state
                .forward
                .insert(pod.clone(), new_keys.clone())
                .unwrap_or_default()
        };

        for stale in old_keys.difference(&new_keys) {
            state.detach(pod, stale);
        }
        for added in new_keys.difference(&old_keys) {
            state
                .reverse
                .entry(added.clone())
                .or_default()
                .insert(pod.clone());
        }

        trace!(
            pod = %pod,
            keys = new_keys.len(),
            "Updated pod membership in reference index"
        );
    }

    /// Remove the pod from every key. No-op if the pod is unknown.
    pub fn remove(&self, pod: &ResourceIdentity) {
        let mut state = self.lock();
        let Some(old_keys) = state.forward.remove(pod) else {
            return;
        };
        for key in &old_keys {
            state.detach(pod, key);
        }
        trace!(pod = %pod, "Removed pod from reference index");
    }

    /// Pods currently referencing `key`, sorted. Empty for unknown keys.
    pub fn lookup(&self, key: &ReferenceKey) -> Vec<ResourceIdentity> {
        self.lock()
            .reverse
            .get(key)
            .map(|pods| pods.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys the pod is currently indexed under, sorted
    pub fn keys_for(&self, pod: &ResourceIdentity) -> Vec<ReferenceKey> {
        self.lock()
            .forward
            .get(pod)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of pods holding at least one reference
    pub fn len(&self) -> usize {
        self.lock().forward.len()
    }

    /// Whether no pod holds any reference
    pub fn is_empty(&self) -> bool {
        self.lock().forward.is_empty()
    }

    /// Number of keys with at least one referencing pod
    pub fn key_count(&self) -> usize {
        self.lock().reverse.len()
    }
}
