//! Threshold-based alerting over anomaly detection results.
//!
//! The engine turns per-point anomaly flags into notified alerts:
//! per-entity thresholds classify each batch ([`classify`]), a cooldown
//! tracker suppresses repeat firings ([`CooldownTracker`]), fired events
//! land in an append-only history ([`AlertHistory`]), and notifications fan
//! out to recipients with bounded retries ([`Dispatcher`]). The
//! [`AlertEngine`] composes the pipeline behind one `evaluate` call.
//!
//! ```
//! use pulse_alerts::{AlertConfig, AlertEngine, AlertThresholds, AnomalyBatch, LogMailer};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()?;
//! runtime.block_on(async {
//!     let engine = AlertEngine::new(LogMailer::new());
//!     engine.set_config(AlertConfig {
//!         entity_id: "cust-1".to_string(),
//!         enabled: true,
//!         email_recipients: vec!["ops@example.com".to_string()],
//!         thresholds: AlertThresholds::default(),
//!     })?;
//!
//!     let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
//!     let timestamps: Vec<_> = (0..20).map(|i| start + Duration::minutes(i)).collect();
//!     let flags: Vec<bool> = (0..20).map(|i| i < 7).collect();
//!     let batch = AnomalyBatch::new("cust-1", timestamps, vec![1.0; 20], flags)?;
//!
//!     let outcome = engine.evaluate(&batch).await;
//!     assert!(outcome.is_fired());
//!     Ok(())
//! })
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod cooldown;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod types;

pub use config::ConfigStore;
pub use cooldown::{CooldownState, CooldownTracker, FireDecision};
pub use dispatch::{DispatchResult, Dispatcher, DispatcherConfig, LogMailer, Mailer, RecipientStatus};
pub use engine::{AlertEngine, EvaluationOutcome, NoAlertReason};
pub use error::{AlertError, Result};
pub use evaluator::classify;
pub use history::AlertHistory;
pub use types::{
    AlertConfig, AlertEvent, AlertSeverity, AlertThresholds, AnomalyBatch, Classification,
};
