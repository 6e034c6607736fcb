//! Error types for the pulse-alerts crate.

use pulse_detect::DetectError;
use thiserror::Error;

/// Errors that can occur in the alert engine.
///
/// Nothing here is fatal: every variant is scoped to one entity's one
/// evaluation, one config write, or one recipient's one delivery.
#[derive(Debug, Error)]
pub enum AlertError {
    /// An alert config failed validation; the prior config is untouched.
    #[error("invalid alert config: {field}: {reason}")]
    InvalidConfig {
        /// The field that violated an invariant.
        field: &'static str,
        /// Why the field is invalid.
        reason: String,
    },

    /// An anomaly batch violated its structural invariants.
    ///
    /// The evaluation aborts with no partial classification and no cooldown
    /// mutation.
    #[error("malformed anomaly batch: {reason}")]
    MalformedBatch {
        /// Why the batch was rejected.
        reason: String,
    },

    /// Delivery to a single recipient failed.
    ///
    /// Recorded per recipient in the dispatch result; never escalated to
    /// fail the evaluation that produced the event.
    #[error("delivery to {recipient} failed: {reason}")]
    DeliveryFailed {
        /// The recipient that could not be reached.
        recipient: String,
        /// The transport error or timeout description.
        reason: String,
    },

    /// The external detection service could not be reached.
    ///
    /// No alert is evaluated and nothing is written; the caller may retry
    /// the whole window.
    #[error("detection service unavailable: {reason}")]
    DetectionUnavailable {
        /// Why the service was unreachable.
        reason: String,
    },

    /// Serialization/deserialization of the config table failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<DetectError> for AlertError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Unavailable { reason } => Self::DetectionUnavailable { reason },
            malformed @ (DetectError::InvalidWindow { .. } | DetectError::Misaligned { .. }) => {
                Self::MalformedBatch {
                    reason: malformed.to_string(),
                }
            }
        }
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
