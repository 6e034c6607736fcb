//! Per-entity cooldown tracking.
//!
//! The tracker owns every entity's [`CooldownState`]; callers interact only
//! through the atomic [`CooldownTracker::try_fire`] check-and-set. Two
//! simultaneous classifications for the same entity serialize on that
//! entity's lock, while different entities proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// Temporal suppression state for one entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct CooldownState {
    /// When the entity last fired an alert, if ever.
    pub last_fired_at: Option<DateTime<Utc>>,
}

/// The outcome of a cooldown check-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    /// The alert may fire; the entity has entered its cooldown window.
    Allowed,
    /// The entity is still cooling down; no event, no notification.
    Suppressed {
        /// How much of the cooldown window remains.
        remaining: Duration,
    },
}

impl FireDecision {
    /// Returns true if the alert was allowed to fire.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Arena of per-entity cooldown state keyed by entity id.
///
/// Cloning shares the underlying arena.
#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    slots: Arc<RwLock<HashMap<String, Arc<Mutex<CooldownState>>>>>,
}

impl CooldownTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically decides whether an alert for `entity_id` may fire at `now`.
    ///
    /// Fires (and records `now` as the last firing time) if the entity has
    /// never fired or its last firing is at least `cooldown_minutes` old;
    /// otherwise the state is left unchanged and the call reports the
    /// remaining suppression window. A zero cooldown always allows.
    pub fn try_fire(
        &self,
        entity_id: &str,
        now: DateTime<Utc>,
        cooldown_minutes: u32,
    ) -> FireDecision {
        let slot = self.slot(entity_id);
        let mut state = slot.lock();

        let cooldown = Duration::minutes(i64::from(cooldown_minutes));
        if let Some(last) = state.last_fired_at {
            let elapsed = now.signed_duration_since(last);
            if cooldown_minutes > 0 && elapsed < cooldown {
                let remaining = cooldown - elapsed;
                debug!(
                    entity_id = %entity_id,
                    remaining_secs = remaining.num_seconds(),
                    "alert suppressed by cooldown"
                );
                return FireDecision::Suppressed { remaining };
            }
        }

        state.last_fired_at = Some(now);
        FireDecision::Allowed
    }

    /// Returns when the entity last fired, if ever.
    #[must_use]
    pub fn last_fired_at(&self, entity_id: &str) -> Option<DateTime<Utc>> {
        let slots = self.slots.read();
        slots.get(entity_id).and_then(|slot| slot.lock().last_fired_at)
    }

    /// Fetches or creates the entity's slot without holding the outer lock
    /// across the check-and-set.
    fn slot(&self, entity_id: &str) -> Arc<Mutex<CooldownState>> {
        {
            let slots = self.slots.read();
            if let Some(slot) = slots.get(entity_id) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write();
        Arc::clone(slots.entry(entity_id.to_string()).or_default())
    }
}
