//! Core types for the alert engine.
//!
//! This module provides the data model shared by every component:
//! - [`AlertSeverity`]: the severity level of a fired alert
//! - [`AlertThresholds`] and [`AlertConfig`]: per-entity alerting policy
//! - [`AnomalyBatch`]: one evaluation's validated input
//! - [`Classification`]: the threshold evaluator's output
//! - [`AlertEvent`]: the immutable audit record of a fired alert

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AlertError, Result};
use pulse_detect::{Detection, SeriesWindow};

/// Basic email-syntax rule for recipient addresses.
static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|_| unreachable!()));

/// The severity level of a fired alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Warning alert, should be investigated.
    Warning,
    /// Critical alert, requires immediate attention.
    Critical,
}

impl AlertSeverity {
    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Returns the priority of this severity (higher = more urgent).
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Warning => 1,
            Self::Critical => 2,
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Threshold policy controlling when an entity alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Anomaly fraction at which a warning fires, in `(0, 1]`.
    pub warning_threshold: f64,
    /// Anomaly fraction at which a critical fires, in `(0, 1]`; never below
    /// `warning_threshold`.
    pub critical_threshold: f64,
    /// Minimum number of flagged points before any alert fires.
    pub min_anomaly_points: u32,
    /// Minimum minutes between fired alerts for one entity; 0 disables the
    /// cooldown.
    pub cooldown_minutes: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warning_threshold: 0.15,
            critical_threshold: 0.30,
            min_anomaly_points: 3,
            cooldown_minutes: 60,
        }
    }
}

/// Per-entity alerting configuration.
///
/// Mutated only by a full-object validated replace through the config store;
/// entities without a stored config get [`AlertConfig::default_for`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// The entity this config applies to (primary key).
    pub entity_id: String,
    /// Whether alerting is enabled; disabled configs never classify.
    pub enabled: bool,
    /// Recipient addresses, unique, each matching a basic email-syntax rule.
    pub email_recipients: Vec<String>,
    /// The threshold policy.
    pub thresholds: AlertThresholds,
}

impl AlertConfig {
    /// Returns the built-in default config for an entity with no stored
    /// config: disabled, no recipients, default thresholds.
    #[must_use]
    pub fn default_for(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            enabled: false,
            email_recipients: Vec::new(),
            thresholds: AlertThresholds::default(),
        }
    }

    /// Validates every invariant of this config.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::InvalidConfig`] naming the first offending
    /// field: empty entity id, a threshold outside `(0, 1]`,
    /// `critical_threshold < warning_threshold`, `min_anomaly_points < 1`,
    /// a malformed recipient address, or a duplicate recipient.
    pub fn validate(&self) -> Result<()> {
        if self.entity_id.is_empty() {
            return Err(AlertError::InvalidConfig {
                field: "entity_id",
                reason: "must not be empty".to_string(),
            });
        }

        for (field, value) in [
            ("warning_threshold", self.thresholds.warning_threshold),
            ("critical_threshold", self.thresholds.critical_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(AlertError::InvalidConfig {
                    field,
                    reason: format!("{value} is outside (0, 1]"),
                });
            }
        }

        if self.thresholds.critical_threshold < self.thresholds.warning_threshold {
            return Err(AlertError::InvalidConfig {
                field: "critical_threshold",
                reason: format!(
                    "{} is below warning_threshold {}",
                    self.thresholds.critical_threshold, self.thresholds.warning_threshold
                ),
            });
        }

        if self.thresholds.min_anomaly_points < 1 {
            return Err(AlertError::InvalidConfig {
                field: "min_anomaly_points",
                reason: "must be at least 1".to_string(),
            });
        }

        for (i, recipient) in self.email_recipients.iter().enumerate() {
            if !EMAIL_REGEX.is_match(recipient) {
                return Err(AlertError::InvalidConfig {
                    field: "email_recipients",
                    reason: format!("'{recipient}' is not a valid email address"),
                });
            }
            if self.email_recipients[..i].contains(recipient) {
                return Err(AlertError::InvalidConfig {
                    field: "email_recipients",
                    reason: format!("duplicate recipient '{recipient}'"),
                });
            }
        }

        Ok(())
    }
}

/// One evaluation's input: per-point anomaly flags for one entity.
///
/// Construction validates the alignment invariants, so a batch that exists
/// is always well-formed. An empty batch is valid (insufficient data is a
/// non-alerting outcome, not a failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyBatch {
    /// The entity the batch belongs to.
    pub entity_id: String,
    /// Observation timestamps, oldest first.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Metric values, aligned with `timestamps`.
    pub scores: Vec<f64>,
    /// Per-point anomaly flags, aligned with `timestamps`.
    pub anomaly_flags: Vec<bool>,
}

impl AnomalyBatch {
    /// Creates a validated anomaly batch.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::MalformedBatch`] if the entity id is empty, the
    /// three sequences differ in length, or any score is negative or
    /// non-finite. Violating input is rejected whole, never truncated.
    pub fn new(
        entity_id: impl Into<String>,
        timestamps: Vec<DateTime<Utc>>,
        scores: Vec<f64>,
        anomaly_flags: Vec<bool>,
    ) -> Result<Self> {
        let entity_id = entity_id.into();
        if entity_id.is_empty() {
            return Err(AlertError::MalformedBatch {
                reason: "entity_id must not be empty".to_string(),
            });
        }
        if timestamps.len() != scores.len() || scores.len() != anomaly_flags.len() {
            return Err(AlertError::MalformedBatch {
                reason: format!(
                    "sequence lengths differ: {} timestamps, {} scores, {} flags",
                    timestamps.len(),
                    scores.len(),
                    anomaly_flags.len()
                ),
            });
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(AlertError::MalformedBatch {
                reason: format!("score {bad} is negative or not finite"),
            });
        }

        Ok(Self {
            entity_id,
            timestamps,
            scores,
            anomaly_flags,
        })
    }

    /// Builds a batch from a detection-service window and its result.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::MalformedBatch`] if the detection result is not
    /// aligned index-for-index with the window.
    pub fn from_detection(window: &SeriesWindow, detection: Detection) -> Result<Self> {
        detection.check_alignment(window)?;
        Self::new(
            window.entity_id.clone(),
            window.timestamps.clone(),
            window.scores.clone(),
            detection.anomalies,
        )
    }

    /// Returns the number of points in the batch.
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.anomaly_flags.len()
    }

    /// Returns the number of flagged points.
    #[must_use]
    pub fn anomaly_count(&self) -> usize {
        self.anomaly_flags.iter().filter(|a| **a).count()
    }
}

/// The threshold evaluator's output for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The severity the batch classified at, if any.
    pub severity: Option<AlertSeverity>,
    /// Number of flagged points.
    pub anomaly_count: usize,
    /// Number of points in the batch.
    pub total_points: usize,
    /// `anomaly_count / total_points`, or 0 for an empty batch.
    pub anomaly_percentage: f64,
}

impl Classification {
    /// Returns true if the batch classified at some severity.
    #[must_use]
    pub const fn is_alerting(&self) -> bool {
        self.severity.is_some()
    }
}

/// The immutable audit record of a fired alert.
///
/// Created only when the cooldown tracker allows firing; never updated or
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Unique identifier for this event.
    pub id: String,
    /// The entity the alert fired for.
    pub entity_id: String,
    /// When the evaluation fired the alert (evaluation time, not data time).
    pub timestamp: DateTime<Utc>,
    /// The classified severity.
    pub severity: AlertSeverity,
    /// Fraction of points flagged anomalous.
    pub anomaly_percentage: f64,
    /// Number of flagged points.
    pub anomaly_count: usize,
    /// Number of points evaluated.
    pub total_points: usize,
    /// Human-readable summary.
    pub message: String,
}

impl AlertEvent {
    /// Creates an event from a classification that reached `severity`.
    #[must_use]
    pub fn new(
        entity_id: impl Into<String>,
        severity: AlertSeverity,
        classification: &Classification,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let entity_id = entity_id.into();
        let message = format!(
            "{} alert for {}: {:.1}% of {} points flagged anomalous ({} anomalies)",
            severity.as_str().to_uppercase(),
            entity_id,
            classification.anomaly_percentage * 100.0,
            classification.total_points,
            classification.anomaly_count,
        );

        Self {
            id: Uuid::new_v4().to_string(),
            entity_id,
            timestamp,
            severity,
            anomaly_percentage: classification.anomaly_percentage,
            anomaly_count: classification.anomaly_count,
            total_points: classification.total_points,
            message,
        }
    }
}
