//! Controller-specific error types.
//!
//! This module defines error types specific to the configmap-watch controller
//! that are not covered by upstream library errors.

use configmap_refs::ResourceKind;
use kube::Error as KubeError;
use kube::config::KubeconfigError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the configmap-watch controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Kubeconfig could not be read or applied
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Initial list-and-replay did not complete
    #[error("Failed to sync caches: {kind} cache not synced after {timeout:?}")]
    CacheSync {
        /// Stream that did not sync
        kind: ResourceKind,
        /// How long the controller waited
        timeout: Duration,
    },

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
