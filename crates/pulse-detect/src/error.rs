//! Error types for the detection-service boundary.

use thiserror::Error;

/// Errors that can occur at the detection-service boundary.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The detection service could not be reached.
    ///
    /// The caller may retry the whole window; nothing downstream has run.
    #[error("detection service unavailable: {reason}")]
    Unavailable {
        /// Why the service was unreachable.
        reason: String,
    },

    /// A time-series window failed validation before it was sent.
    #[error("invalid series window: {field}: {reason}")]
    InvalidWindow {
        /// The field that failed validation.
        field: &'static str,
        /// Why the field is invalid.
        reason: String,
    },

    /// The detection result is not aligned index-for-index with the window.
    ///
    /// A misaligned result is never trusted or partially consumed.
    #[error("detection result misaligned: expected {expected} flags, got {actual}")]
    Misaligned {
        /// Number of points in the submitted window.
        expected: usize,
        /// Number of flags the service returned.
        actual: usize,
    },
}

/// Result type for detection-boundary operations.
pub type Result<T> = std::result::Result<T, DetectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unavailable() {
        let err = DetectError::Unavailable {
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "detection service unavailable: connection refused"
        );
    }

    #[test]
    fn error_display_invalid_window() {
        let err = DetectError::InvalidWindow {
            field: "scores",
            reason: "must not be negative".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid series window: scores: must not be negative"
        );
    }

    #[test]
    fn error_display_misaligned() {
        let err = DetectError::Misaligned {
            expected: 10,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "detection result misaligned: expected 10 flags, got 7"
        );
    }
}
