//! Boundary types for the external anomaly-detection service.
//!
//! `pulse-detect` defines the contract between the Pulse alert engine and
//! the detection service that flags anomalous points in an engagement-metric
//! series. It deliberately contains no detection algorithm: the engine
//! submits a validated [`SeriesWindow`] through a [`DetectionClient`] and
//! receives a [`Detection`] whose flags must align index-for-index with the
//! submitted points.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use pulse_detect::{Detection, SeriesWindow};
//!
//! let now = Utc::now();
//! let window = SeriesWindow::new(
//!     "cust-42",
//!     vec![now, now + chrono::Duration::minutes(1)],
//!     vec![120.0, 4.0],
//! ).unwrap();
//!
//! // A detection result must cover every submitted point.
//! let detection = Detection::new(vec![false, true]);
//! assert!(detection.check_alignment(&window).is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

pub use error::{DetectError, Result};
pub use types::{Detection, DetectionClient, SeriesWindow, MAX_POINTS};
