//! In-memory notification sink for tests

use crate::notify::{AffectedPods, LifecycleNotification, NotificationSink};
use std::sync::{Mutex, PoisonError};

/// Sink that records every notification it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    lifecycle: Mutex<Vec<LifecycleNotification>>,
    affected: Mutex<Vec<AffectedPods>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifecycle notifications in arrival order
    pub fn lifecycle_events(&self) -> Vec<LifecycleNotification> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Affected-pod reports in arrival order
    pub fn affected_reports(&self) -> Vec<AffectedPods> {
        self.affected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent affected-pod report
    pub fn last_report(&self) -> Option<AffectedPods> {
        self.affected_reports().pop()
    }
}

impl NotificationSink for RecordingSink {
    fn lifecycle(&self, notification: &LifecycleNotification) {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
    }

    fn affected(&self, report: &AffectedPods) {
        self.affected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
    }
}
