//! Time-series window and detection result types.
//!
//! These types describe the contract with the external anomaly-detection
//! service: the engine submits a [`SeriesWindow`] and receives a
//! [`Detection`] whose flags are aligned index-for-index with the window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};

/// Maximum number of points accepted in a single window.
pub const MAX_POINTS: usize = 1000;

/// One entity's metric series over a time window.
///
/// Construction validates the invariants the detection service relies on;
/// a `SeriesWindow` that exists is always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesWindow {
    /// The entity the series belongs to.
    pub entity_id: String,
    /// Observation timestamps, oldest first.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Metric values, aligned with `timestamps`.
    pub scores: Vec<f64>,
}

impl SeriesWindow {
    /// Creates a validated series window.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidWindow`] if the entity id is empty, the
    /// sequences differ in length or are empty, the window exceeds
    /// [`MAX_POINTS`], or any score is negative or non-finite.
    pub fn new(
        entity_id: impl Into<String>,
        timestamps: Vec<DateTime<Utc>>,
        scores: Vec<f64>,
    ) -> Result<Self> {
        let entity_id = entity_id.into();
        if entity_id.is_empty() {
            return Err(DetectError::InvalidWindow {
                field: "entity_id",
                reason: "must not be empty".to_string(),
            });
        }
        if scores.is_empty() {
            return Err(DetectError::InvalidWindow {
                field: "scores",
                reason: "must not be empty".to_string(),
            });
        }
        if timestamps.len() != scores.len() {
            return Err(DetectError::InvalidWindow {
                field: "timestamps",
                reason: format!(
                    "length {} does not match {} scores",
                    timestamps.len(),
                    scores.len()
                ),
            });
        }
        if scores.len() > MAX_POINTS {
            return Err(DetectError::InvalidWindow {
                field: "scores",
                reason: format!("{} points exceeds maximum of {MAX_POINTS}", scores.len()),
            });
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(DetectError::InvalidWindow {
                field: "scores",
                reason: format!("score {bad} is negative or not finite"),
            });
        }

        Ok(Self {
            entity_id,
            timestamps,
            scores,
        })
    }

    /// Returns the number of points in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if the window holds no points.
    ///
    /// Always false for a constructed window; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// The per-point anomaly flags returned by the detection service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// One flag per submitted point, aligned index-for-index.
    pub anomalies: Vec<bool>,
}

impl Detection {
    /// Creates a detection result.
    #[must_use]
    pub fn new(anomalies: Vec<bool>) -> Self {
        Self { anomalies }
    }

    /// Verifies that this result is aligned with the window it answers.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::Misaligned`] on a length mismatch.
    pub fn check_alignment(&self, window: &SeriesWindow) -> Result<()> {
        if self.anomalies.len() == window.len() {
            Ok(())
        } else {
            Err(DetectError::Misaligned {
                expected: window.len(),
                actual: self.anomalies.len(),
            })
        }
    }

    /// Returns the number of flagged points.
    #[must_use]
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.iter().filter(|a| **a).count()
    }
}

/// Client interface to the external anomaly-detection service.
///
/// The engine only depends on this trait; the statistical model behind it
/// is out of scope here.
pub trait DetectionClient: Send + Sync {
    /// Submits a window and returns the per-point anomaly flags.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::Unavailable`] if the service cannot be reached.
    fn detect(
        &self,
        window: &SeriesWindow,
    ) -> impl std::future::Future<Output = Result<Detection>> + Send;
}
