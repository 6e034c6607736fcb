//! Threshold evaluator: pure classification of an anomaly batch.

use crate::types::{AlertConfig, AlertSeverity, AnomalyBatch, Classification};

/// Classifies a batch against an entity's threshold policy.
///
/// Side-effect-free and infallible: malformed input is rejected at
/// [`AnomalyBatch`] construction, and an empty batch is a valid non-alerting
/// outcome. Counts are always computed; a disabled config forces the
/// severity to `None` without discarding them.
///
/// Critical is evaluated before Warning, so a batch satisfying both
/// thresholds reports Critical, never both. Both gates also require the
/// anomaly count to reach `min_anomaly_points`.
#[must_use]
pub fn classify(batch: &AnomalyBatch, config: &AlertConfig) -> Classification {
    let total_points = batch.total_points();
    let anomaly_count = batch.anomaly_count();

    if total_points == 0 {
        return Classification {
            severity: None,
            anomaly_count: 0,
            total_points: 0,
            anomaly_percentage: 0.0,
        };
    }

    let anomaly_percentage = anomaly_count as f64 / total_points as f64;
    let thresholds = &config.thresholds;

    let severity = if anomaly_count < thresholds.min_anomaly_points as usize {
        None
    } else if anomaly_percentage >= thresholds.critical_threshold {
        Some(AlertSeverity::Critical)
    } else if anomaly_percentage >= thresholds.warning_threshold {
        Some(AlertSeverity::Warning)
    } else {
        None
    };

    Classification {
        severity: if config.enabled { severity } else { None },
        anomaly_count,
        total_points,
        anomaly_percentage,
    }
}
