//! Append-only alert history.
//!
//! The history is the engine's audit trail: events are appended in firing
//! order and never updated or deleted. Reads are concurrent; appends take
//! the write lock briefly.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::types::AlertEvent;

/// Append-only, time-ordered log of fired alert events.
///
/// Cloning shares the underlying log.
#[derive(Debug, Clone, Default)]
pub struct AlertHistory {
    events: Arc<RwLock<Vec<AlertEvent>>>,
}

impl AlertHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fired event to the log.
    pub fn append(&self, event: AlertEvent) {
        debug!(
            entity_id = %event.entity_id,
            event_id = %event.id,
            severity = %event.severity,
            "alert event recorded"
        );
        self.events.write().push(event);
    }

    /// Queries the log, optionally filtered by entity and capped in size.
    ///
    /// Results are ordered by timestamp. With a `limit`, only the `limit`
    /// most recent entries are returned, still oldest-first within that
    /// window.
    #[must_use]
    pub fn query(&self, entity_id: Option<&str>, limit: Option<usize>) -> Vec<AlertEvent> {
        let events = self.events.read();
        let mut selected: Vec<AlertEvent> = events
            .iter()
            .filter(|e| entity_id.is_none_or(|id| e.entity_id == id))
            .cloned()
            .collect();

        // Stable sort keeps insertion order for equal timestamps.
        selected.sort_by_key(|e| e.timestamp);

        if let Some(limit) = limit {
            if selected.len() > limit {
                selected.drain(..selected.len() - limit);
            }
        }
        selected
    }

    /// Returns the total number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no event has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}
