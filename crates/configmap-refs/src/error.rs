//! Reference index errors

use crate::envelope::ResourceKind;
use thiserror::Error;

/// Errors that can occur when building reference keys
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefsError {
    /// A reference key string without the `namespace/name` separator
    #[error("Invalid reference key: {0}")]
    InvalidReferenceKey(String),
}

/// Errors raised while normalizing a watch notification
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Delete tombstone carrying no embedded object
    #[error("{kind} delete for {key} has no recoverable final state")]
    Unrecoverable {
        /// Stream the notification arrived on
        kind: ResourceKind,
        /// Key recorded in the tombstone
        key: String,
    },
}
