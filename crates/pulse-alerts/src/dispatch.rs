//! Notification dispatch for fired alert events.
//!
//! This module provides the [`Mailer`] trait for delivery backends and the
//! [`Dispatcher`] that fans a fired event out to every configured recipient.
//! Delivery is best-effort and bulkheaded: each recipient is handled
//! independently, a slow or failing recipient never blocks the others, and
//! a failed delivery never retracts the already-recorded event.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::AlertEvent;

/// Delivery backend for alert notifications.
///
/// Implementations deliver one event to one recipient per call; the
/// dispatcher owns fan-out, timeouts, and retries.
pub trait Mailer: Send + Sync {
    /// Delivers the event to a single recipient.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AlertError::DeliveryFailed`] if the transport
    /// rejects the delivery.
    fn deliver(
        &self,
        event: &AlertEvent,
        recipient: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Delivery outcome for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    /// The notification was handed to the transport.
    Delivered,
    /// Delivery failed after all attempts.
    Failed {
        /// The final transport error or timeout description.
        reason: String,
    },
}

impl RecipientStatus {
    /// Returns true if the notification was delivered.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Per-recipient outcomes of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// The event that was dispatched.
    pub event_id: String,
    /// Outcome per recipient, in the config's recipient order.
    pub outcomes: Vec<(String, RecipientStatus)>,
}

impl DispatchResult {
    /// Returns the number of successful deliveries.
    #[must_use]
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, s)| s.is_delivered()).count()
    }

    /// Returns the number of failed deliveries.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.delivered_count()
    }

    /// Returns true if every recipient was delivered to (vacuously true for
    /// no recipients).
    #[must_use]
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(|(_, s)| s.is_delivered())
    }

    /// Returns the outcome for one recipient, if it was dispatched to.
    #[must_use]
    pub fn status_for(&self, recipient: &str) -> Option<&RecipientStatus> {
        self.outcomes
            .iter()
            .find(|(r, _)| r == recipient)
            .map(|(_, s)| s)
    }
}

/// Tuning knobs for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on one delivery attempt; an expired attempt counts as a
    /// failure rather than hanging the batch.
    pub per_recipient_timeout: Duration,
    /// Total attempts per recipient (first try included).
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per subsequent attempt.
    pub retry_backoff: Duration,
    /// Maximum concurrent deliveries.
    pub max_parallel: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            per_recipient_timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(250),
            max_parallel: 4,
        }
    }
}

/// Fans a fired event out to its recipients with bounded parallelism.
#[derive(Debug)]
pub struct Dispatcher<M: Mailer> {
    mailer: M,
    config: DispatcherConfig,
    limiter: Arc<Semaphore>,
}

impl<M: Mailer> Dispatcher<M> {
    /// Creates a dispatcher with default tuning.
    #[must_use]
    pub fn new(mailer: M) -> Self {
        Self::with_config(mailer, DispatcherConfig::default())
    }

    /// Creates a dispatcher with custom tuning.
    ///
    /// `max_parallel` and `max_attempts` are clamped to at least 1.
    #[must_use]
    pub fn with_config(mailer: M, mut config: DispatcherConfig) -> Self {
        config.max_parallel = config.max_parallel.max(1);
        config.max_attempts = config.max_attempts.max(1);
        let limiter = Arc::new(Semaphore::new(config.max_parallel));
        Self {
            mailer,
            config,
            limiter,
        }
    }

    /// Returns the dispatcher's configuration.
    #[must_use]
    pub const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Delivers the event to every recipient independently.
    ///
    /// Per-recipient failures and timeouts are recorded in the result and
    /// never escalate: by the time dispatch runs the event is already in
    /// the history store.
    pub async fn dispatch(&self, event: &AlertEvent, recipients: &[String]) -> DispatchResult {
        if recipients.is_empty() {
            debug!(event_id = %event.id, "no recipients configured, nothing to dispatch");
            return DispatchResult {
                event_id: event.id.clone(),
                outcomes: Vec::new(),
            };
        }

        let deliveries = recipients
            .iter()
            .map(|recipient| self.deliver_with_retry(event, recipient));
        let outcomes = join_all(deliveries).await;

        let result = DispatchResult {
            event_id: event.id.clone(),
            outcomes,
        };
        info!(
            event_id = %event.id,
            delivered = result.delivered_count(),
            failed = result.failed_count(),
            "dispatch complete"
        );
        result
    }

    async fn deliver_with_retry(
        &self,
        event: &AlertEvent,
        recipient: &str,
    ) -> (String, RecipientStatus) {
        let Ok(_permit) = self.limiter.acquire().await else {
            return (
                recipient.to_string(),
                RecipientStatus::Failed {
                    reason: "dispatcher shut down".to_string(),
                },
            );
        };

        let mut last_reason = String::new();
        for attempt in 1..=self.config.max_attempts {
            match timeout(
                self.config.per_recipient_timeout,
                self.mailer.deliver(event, recipient),
            )
            .await
            {
                Ok(Ok(())) => {
                    debug!(event_id = %event.id, recipient = %recipient, attempt, "delivered");
                    return (recipient.to_string(), RecipientStatus::Delivered);
                }
                Ok(Err(err)) => last_reason = err.to_string(),
                Err(_) => {
                    last_reason = format!(
                        "timed out after {}ms",
                        self.config.per_recipient_timeout.as_millis()
                    );
                }
            }

            if attempt < self.config.max_attempts {
                let backoff = self.config.retry_backoff * 2u32.pow(attempt - 1);
                debug!(
                    recipient = %recipient,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    reason = %last_reason,
                    "delivery attempt failed, backing off"
                );
                tokio::time::sleep(backoff).await;
            }
        }

        warn!(
            event_id = %event.id,
            recipient = %recipient,
            attempts = self.config.max_attempts,
            reason = %last_reason,
            "delivery failed"
        );
        (
            recipient.to_string(),
            RecipientStatus::Failed {
                reason: last_reason,
            },
        )
    }
}

/// Mailer that logs deliveries through `tracing` instead of sending them.
///
/// Stands in for an SMTP transport in tests and local runs; always
/// succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl LogMailer {
    /// Creates a new log mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Mailer for LogMailer {
    async fn deliver(&self, event: &AlertEvent, recipient: &str) -> Result<()> {
        info!(
            recipient = %recipient,
            entity_id = %event.entity_id,
            severity = %event.severity,
            message = %event.message,
            "would send alert email"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlertError;
    use crate::types::{AlertSeverity, Classification};
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_event() -> AlertEvent {
        let classification = Classification {
            severity: Some(AlertSeverity::Critical),
            anomaly_count: 7,
            total_points: 20,
            anomaly_percentage: 0.35,
        };
        AlertEvent::new("cust-1", AlertSeverity::Critical, &classification, Utc::now())
    }

    fn recipients(addrs: &[&str]) -> Vec<String> {
        addrs.iter().map(|a| (*a).to_string()).collect()
    }

    /// Records every delivery it is asked to make.
    #[derive(Default)]
    struct MemoryMailer {
        sent: Mutex<Vec<String>>,
    }

    impl Mailer for MemoryMailer {
        async fn deliver(&self, _event: &AlertEvent, recipient: &str) -> Result<()> {
            self.sent.lock().push(recipient.to_string());
            Ok(())
        }
    }

    /// Fails for one specific recipient, succeeds for the rest.
    struct RejectingMailer {
        reject: String,
    }

    impl Mailer for RejectingMailer {
        async fn deliver(&self, _event: &AlertEvent, recipient: &str) -> Result<()> {
            if recipient == self.reject {
                Err(AlertError::DeliveryFailed {
                    recipient: recipient.to_string(),
                    reason: "mailbox unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyMailer {
        failures: usize,
        calls: AtomicUsize,
    }

    impl Mailer for FlakyMailer {
        async fn deliver(&self, _event: &AlertEvent, recipient: &str) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(AlertError::DeliveryFailed {
                    recipient: recipient.to_string(),
                    reason: "transient transport error".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    /// Never completes; exercises the per-recipient timeout.
    struct HangingMailer;

    impl Mailer for HangingMailer {
        async fn deliver(&self, _event: &AlertEvent, _recipient: &str) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn fast_config() -> DispatcherConfig {
        DispatcherConfig {
            per_recipient_timeout: Duration::from_millis(50),
            max_attempts: 1,
            retry_backoff: Duration::from_millis(1),
            max_parallel: 4,
        }
    }

    mod result_tests {
        use super::*;

        #[test]
        fn counts_and_lookup() {
            let result = DispatchResult {
                event_id: "e1".to_string(),
                outcomes: vec![
                    ("a@x.com".to_string(), RecipientStatus::Delivered),
                    (
                        "b@x.com".to_string(),
                        RecipientStatus::Failed {
                            reason: "boom".to_string(),
                        },
                    ),
                ],
            };
            assert_eq!(result.delivered_count(), 1);
            assert_eq!(result.failed_count(), 1);
            assert!(!result.all_delivered());
            assert!(result.status_for("a@x.com").is_some_and(RecipientStatus::is_delivered));
            assert!(result.status_for("missing@x.com").is_none());
        }

        #[test]
        fn empty_result_is_all_delivered() {
            let result = DispatchResult {
                event_id: "e1".to_string(),
                outcomes: vec![],
            };
            assert!(result.all_delivered());
        }

        #[test]
        fn result_serialization_roundtrip() {
            let original = DispatchResult {
                event_id: "e1".to_string(),
                outcomes: vec![(
                    "a@x.com".to_string(),
                    RecipientStatus::Failed {
                        reason: "timed out after 50ms".to_string(),
                    },
                )],
            };
            let json = serde_json::to_string(&original).unwrap();
            let parsed: DispatchResult = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, original);
        }
    }

    mod dispatcher_tests {
        use super::*;

        #[tokio::test]
        async fn delivers_to_every_recipient() {
            let dispatcher = Dispatcher::with_config(MemoryMailer::default(), fast_config());
            let event = test_event();
            let to = recipients(&["a@x.com", "b@x.com", "c@x.com"]);

            let result = dispatcher.dispatch(&event, &to).await;
            assert_eq!(result.delivered_count(), 3);
            assert!(result.all_delivered());

            let mut sent = dispatcher.mailer.sent.lock().clone();
            sent.sort();
            assert_eq!(sent, vec!["a@x.com", "b@x.com", "c@x.com"]);
        }

        #[tokio::test]
        async fn no_recipients_dispatches_nothing() {
            let dispatcher = Dispatcher::with_config(MemoryMailer::default(), fast_config());
            let result = dispatcher.dispatch(&test_event(), &[]).await;
            assert!(result.outcomes.is_empty());
            assert!(result.all_delivered());
        }

        #[tokio::test]
        async fn one_failing_recipient_does_not_abort_the_rest() {
            let mailer = RejectingMailer {
                reject: "b@x.com".to_string(),
            };
            let dispatcher = Dispatcher::with_config(mailer, fast_config());
            let to = recipients(&["a@x.com", "b@x.com", "c@x.com"]);

            let result = dispatcher.dispatch(&test_event(), &to).await;
            assert_eq!(result.delivered_count(), 2);
            assert_eq!(result.failed_count(), 1);
            assert!(result.status_for("a@x.com").is_some_and(RecipientStatus::is_delivered));
            assert!(result.status_for("c@x.com").is_some_and(RecipientStatus::is_delivered));
            match result.status_for("b@x.com") {
                Some(RecipientStatus::Failed { reason }) => {
                    assert!(reason.contains("mailbox unavailable"));
                }
                other => panic!("expected failure for b@x.com, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn hanging_recipient_times_out() {
            let dispatcher = Dispatcher::with_config(HangingMailer, fast_config());
            let to = recipients(&["slow@x.com"]);

            let result = dispatcher.dispatch(&test_event(), &to).await;
            match result.status_for("slow@x.com") {
                Some(RecipientStatus::Failed { reason }) => {
                    assert!(reason.contains("timed out"), "reason: {reason}");
                }
                other => panic!("expected timeout failure, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn transient_failure_recovers_within_retry_budget() {
            let mailer = FlakyMailer {
                failures: 2,
                calls: AtomicUsize::new(0),
            };
            let config = DispatcherConfig {
                max_attempts: 3,
                ..fast_config()
            };
            let dispatcher = Dispatcher::with_config(mailer, config);

            let result = dispatcher.dispatch(&test_event(), &recipients(&["a@x.com"])).await;
            assert!(result.all_delivered());
            assert_eq!(dispatcher.mailer.calls.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn retries_are_bounded() {
            let mailer = FlakyMailer {
                failures: 10,
                calls: AtomicUsize::new(0),
            };
            let config = DispatcherConfig {
                max_attempts: 2,
                ..fast_config()
            };
            let dispatcher = Dispatcher::with_config(mailer, config);

            let result = dispatcher.dispatch(&test_event(), &recipients(&["a@x.com"])).await;
            assert_eq!(result.failed_count(), 1);
            assert_eq!(dispatcher.mailer.calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn parallelism_is_bounded() {
            /// Tracks the highest number of simultaneously running deliveries.
            #[derive(Default)]
            struct GaugeMailer {
                current: AtomicUsize,
                peak: AtomicUsize,
            }

            impl Mailer for GaugeMailer {
                async fn deliver(&self, _event: &AlertEvent, _recipient: &str) -> Result<()> {
                    let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                    self.peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    self.current.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            }

            let config = DispatcherConfig {
                max_parallel: 2,
                ..fast_config()
            };
            let dispatcher = Dispatcher::with_config(GaugeMailer::default(), config);
            let to: Vec<String> = (0..8).map(|i| format!("r{i}@x.com")).collect();

            let result = dispatcher.dispatch(&test_event(), &to).await;
            assert!(result.all_delivered());
            assert!(dispatcher.mailer.peak.load(Ordering::SeqCst) <= 2);
        }

        #[tokio::test]
        async fn log_mailer_always_succeeds() {
            let dispatcher = Dispatcher::new(LogMailer::new());
            let result = dispatcher
                .dispatch(&test_event(), &recipients(&["ops@example.com"]))
                .await;
            assert!(result.all_delivered());
        }

        #[test]
        fn zero_parallelism_is_clamped() {
            let config = DispatcherConfig {
                max_parallel: 0,
                max_attempts: 0,
                ..DispatcherConfig::default()
            };
            let dispatcher = Dispatcher::with_config(LogMailer::new(), config);
            assert_eq!(dispatcher.config().max_parallel, 1);
            assert_eq!(dispatcher.config().max_attempts, 1);
        }
    }
}
