//! Normalized watch notifications
//!
//! Raw notifications arrive as [`Notification`]s whose delete payload may be a
//! tombstone. [`Envelope::decode`] unwraps them at the ingestion boundary so
//! that handlers only ever see typed objects.

use crate::error::DecodeError;
use serde::Serialize;
use std::fmt;

/// Resource kinds observed by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    /// `core/v1` ConfigMap
    ConfigMap,
    /// `core/v1` Pod
    Pod,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConfigMap => "ConfigMap",
            Self::Pod => "Pod",
        })
    }
}

/// Change operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Object first observed
    Add,
    /// Object changed (or resynced)
    Update,
    /// Object removed
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        })
    }
}

/// Payload of a delete notification.
#[derive(Debug, Clone, PartialEq)]
pub enum DeletedObject<K> {
    /// Last state observed directly from the watch
    Known(K),
    /// The delete was inferred (e.g. missed during a disconnect) and only a
    /// possibly-stale cached copy, if any, is available
    FinalStateUnknown {
        /// `namespace/name` of the deleted object
        key: String,
        /// Last cached state, if one was recorded
        object: Option<K>,
    },
}

impl<K> DeletedObject<K> {
    /// Unwrap the deleted object, falling back to the tombstone's cached copy.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Unrecoverable`] for a tombstone without one.
    pub fn recover(self, kind: ResourceKind) -> Result<K, DecodeError> {
        match self {
            Self::Known(obj) => Ok(obj),
            Self::FinalStateUnknown { key, object } => {
                object.ok_or(DecodeError::Unrecoverable { kind, key })
            }
        }
    }
}

/// A raw change notification for one stream
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<K> {
    /// Object added
    Add(K),
    /// Object changed from `old` to `new`
    Update {
        /// Previously cached state
        old: K,
        /// Current state
        new: K,
    },
    /// Object deleted
    Delete(DeletedObject<K>),
}

impl<K> Notification<K> {
    /// Operation carried by this notification
    pub fn operation(&self) -> Operation {
        match self {
            Self::Add(_) => Operation::Add,
            Self::Update { .. } => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }
}

/// Typed payload of a decoded envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<K> {
    /// Single object for Add and Delete
    Object(K),
    /// Both states for Update
    Change {
        /// Previously cached state
        old: K,
        /// Current state
        new: K,
    },
}

/// Normalized notification handed to event handlers
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<K> {
    /// Stream the notification came from
    pub kind: ResourceKind,
    /// What happened
    pub operation: Operation,
    /// Typed object(s)
    pub payload: Payload<K>,
}

impl<K> Envelope<K> {
    /// Decode a raw notification, unwrapping delete tombstones.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Unrecoverable`] for a tombstone that carries no
    /// embedded object.
    pub fn decode(kind: ResourceKind, notification: Notification<K>) -> Result<Self, DecodeError> {
        let operation = notification.operation();
        let payload = match notification {
            Notification::Add(obj) => Payload::Object(obj),
            Notification::Update { old, new } => Payload::Change { old, new },
            Notification::Delete(deleted) => Payload::Object(deleted.recover(kind)?),
        };
        Ok(Self {
            kind,
            operation,
            payload,
        })
    }

    /// The current object: the new state for updates
    pub fn object(&self) -> &K {
        match &self.payload {
            Payload::Object(obj) | Payload::Change { new: obj, .. } => obj,
        }
    }
}
