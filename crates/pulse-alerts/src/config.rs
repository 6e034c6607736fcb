//! Per-entity alert configuration store.
//!
//! A read-miss is not an error: entities without a stored config get the
//! built-in default (disabled, no recipients). Writes validate the whole
//! candidate object before replacing the stored one, so a failed write
//! leaves the prior config untouched.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::AlertConfig;

/// Key-value store of [`AlertConfig`] keyed by entity id.
///
/// Cloning shares the underlying table. Reads are concurrent; writes
/// serialize on the table but stay short (validation happens outside the
/// lock).
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    configs: Arc<RwLock<HashMap<String, AlertConfig>>>,
}

impl ConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored config for an entity, or the built-in default if
    /// none exists.
    #[must_use]
    pub fn get(&self, entity_id: &str) -> AlertConfig {
        let configs = self.configs.read();
        configs
            .get(entity_id)
            .cloned()
            .unwrap_or_else(|| AlertConfig::default_for(entity_id))
    }

    /// Validates and stores a full replacement config for its entity.
    ///
    /// All-or-nothing: on validation failure the prior config (if any) is
    /// untouched and the error names the offending field.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AlertError::InvalidConfig`] if any invariant fails.
    pub fn set(&self, candidate: AlertConfig) -> Result<AlertConfig> {
        candidate.validate()?;

        let mut configs = self.configs.write();
        info!(
            entity_id = %candidate.entity_id,
            enabled = candidate.enabled,
            recipients = candidate.email_recipients.len(),
            "alert config replaced"
        );
        configs.insert(candidate.entity_id.clone(), candidate.clone());
        Ok(candidate)
    }

    /// Returns true if the entity has an explicitly stored config.
    #[must_use]
    pub fn contains(&self, entity_id: &str) -> bool {
        self.configs.read().contains_key(entity_id)
    }

    /// Returns the number of explicitly stored configs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    /// Returns true if no config has been explicitly stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configs.read().is_empty()
    }

    /// Returns the ids of all entities with a stored config, sorted.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.configs.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Serializes the whole config table to JSON for external persistence.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AlertError::SerializationError`] if encoding fails.
    pub fn export_json(&self) -> Result<String> {
        let configs = self.configs.read();
        Ok(serde_json::to_string_pretty(&*configs)?)
    }

    /// Replaces the whole table from a JSON document produced by
    /// [`export_json`](Self::export_json).
    ///
    /// Every entry is validated (including that the map key matches the
    /// config's own entity id) before anything is applied; a single invalid
    /// entry rejects the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AlertError::SerializationError`] for malformed JSON
    /// or [`crate::AlertError::InvalidConfig`] for an invalid entry.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let incoming: HashMap<String, AlertConfig> = serde_json::from_str(json)?;

        for (key, config) in &incoming {
            config.validate().inspect_err(|_| {
                warn!(entity_id = %key, "rejecting config import");
            })?;
            if *key != config.entity_id {
                warn!(key = %key, entity_id = %config.entity_id, "rejecting config import");
                return Err(crate::AlertError::InvalidConfig {
                    field: "entity_id",
                    reason: format!("key '{key}' does not match entity_id '{}'", config.entity_id),
                });
            }
        }

        let count = incoming.len();
        *self.configs.write() = incoming;
        info!(count, "alert config table imported");
        Ok(count)
    }
}
