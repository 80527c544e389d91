//! ConfigMap reference index
//!
//! Core types for tracking which Pods reference which ConfigMaps.
//! Provides the reference extractor, the reverse index, the normalized
//! event envelope, and the lifecycle notification sink used by the
//! configmap-watch controller.
//!
//! # Example
//!
//! ```no_run
//! use configmap_refs::{extract, ReferenceKey, ResourceIdentity, ReverseIndex};
//! use k8s_openapi::api::core::v1::Pod;
//!
//! # fn example(pod: &Pod) {
//! let index = ReverseIndex::new();
//!
//! if let Some(identity) = ResourceIdentity::from_resource(pod) {
//!     index.upsert(&identity, extract(pod));
//! }
//!
//! let affected = index.lookup(&ReferenceKey::new("default", "app-config"));
//! println!("{} pods use default/app-config", affected.len());
//! # }
//! ```
//!
//! # Features
//!
//! - **Extraction**: volume, `envFrom` and `valueFrom` ConfigMap references
//! - **Indexing**: pod membership per reference key with symmetric-difference updates
//! - **Envelopes**: typed Add/Update/Delete notifications, including tombstones
//! - **Notifications**: pluggable sink, tracing by default

pub mod envelope;
pub mod error;
pub mod extract;
pub mod identity;
pub mod index;
pub mod notify;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use envelope::*;
pub use error::*;
pub use extract::extract;
pub use identity::*;
pub use index::ReverseIndex;
pub use notify::*;

#[cfg(any(test, feature = "test-util"))]
pub use mock::RecordingSink;
