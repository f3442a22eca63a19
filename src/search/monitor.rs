//! Observers of seeker lifecycle events.

use parking_lot::Mutex;

use super::seeker::Seeker;
use crate::types::{ConnectionId, SeekerId};

/// Receives search outcomes for the seekers it is attached to.
///
/// Every method has an empty default so monitors implement only what they
/// need.
pub trait SearchMonitor: Send + Sync {
    /// The seeker found a path (possibly served from the cache).
    fn on_search_completed(&self, _seeker: &Seeker) {}

    /// The seeker's search failed or was stopped.
    fn on_search_failed(&self, _seeker: &Seeker) {}

    /// The graph changed under the seeker's completed solution.
    fn on_seeker_invalidated(&self, _seeker: &Seeker) {}
}

/// What a [`RecordingMonitor`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Search completed with this solution.
    Completed {
        /// Seeker that completed.
        seeker: SeekerId,
        /// Solution at the time of notification.
        solution: Vec<ConnectionId>,
    },
    /// Search failed.
    Failed {
        /// Seeker that failed.
        seeker: SeekerId,
    },
    /// Completed solution invalidated.
    Invalidated {
        /// Seeker that was invalidated.
        seeker: SeekerId,
    },
}

/// Monitor that records every notification, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingMonitor {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().clone()
    }

    /// Take and clear the recorded events.
    pub fn take(&self) -> Vec<MonitorEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SearchMonitor for RecordingMonitor {
    fn on_search_completed(&self, seeker: &Seeker) {
        self.events.lock().push(MonitorEvent::Completed {
            seeker: seeker.id(),
            solution: seeker.solution().to_vec(),
        });
    }

    fn on_search_failed(&self, seeker: &Seeker) {
        self.events.lock().push(MonitorEvent::Failed { seeker: seeker.id() });
    }

    fn on_seeker_invalidated(&self, seeker: &Seeker) {
        self.events
            .lock()
            .push(MonitorEvent::Invalidated { seeker: seeker.id() });
    }
}
