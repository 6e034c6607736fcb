//! The alert engine: orchestration of one evaluation cycle.
//!
//! [`AlertEngine::evaluate`] runs the full pipeline for a batch: load the
//! entity's config, classify against thresholds, consult the cooldown
//! tracker, record the event, and dispatch notifications. The outcome is a
//! discriminated [`EvaluationOutcome`] so callers never have to infer what
//! happened from side effects.

use chrono::Utc;
use tracing::{debug, info};

use crate::config::ConfigStore;
use crate::cooldown::CooldownTracker;
use crate::dispatch::{DispatchResult, Dispatcher, Mailer};
use crate::error::Result;
use crate::evaluator::classify;
use crate::history::AlertHistory;
use crate::types::{AlertConfig, AlertEvent, AnomalyBatch, Classification};
use pulse_detect::{DetectionClient, SeriesWindow};

/// Why an evaluation produced no alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoAlertReason {
    /// Alerting is disabled for the entity.
    Disabled,
    /// The batch was empty, or too few points were flagged to clear the
    /// minimum even though the percentage alone would have alerted.
    InsufficientData,
    /// The anomaly percentage stayed below the warning threshold.
    BelowThresholds,
}

/// The outcome of one evaluation cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// The batch did not classify at any severity.
    NoAlert {
        /// Why nothing fired.
        reason: NoAlertReason,
        /// The counts the evaluator computed anyway.
        classification: Classification,
    },
    /// The batch classified but the entity is still cooling down; no event
    /// was recorded and nothing was dispatched.
    Suppressed {
        /// The classification that would have fired.
        classification: Classification,
    },
    /// An alert fired: the event is in the history and notifications were
    /// dispatched.
    Fired {
        /// The recorded event.
        event: AlertEvent,
        /// Per-recipient delivery outcomes.
        dispatch: DispatchResult,
    },
}

impl EvaluationOutcome {
    /// Returns true if an alert fired.
    #[must_use]
    pub const fn is_fired(&self) -> bool {
        matches!(self, Self::Fired { .. })
    }
}

/// Composes the config store, evaluator, cooldown tracker, history store,
/// and dispatcher into one evaluation pipeline.
#[derive(Debug)]
pub struct AlertEngine<M: Mailer> {
    configs: ConfigStore,
    cooldowns: CooldownTracker,
    history: AlertHistory,
    dispatcher: Dispatcher<M>,
}

impl<M: Mailer> AlertEngine<M> {
    /// Creates an engine with fresh state and a default-tuned dispatcher.
    #[must_use]
    pub fn new(mailer: M) -> Self {
        Self::with_dispatcher(Dispatcher::new(mailer))
    }

    /// Creates an engine around a pre-configured dispatcher.
    #[must_use]
    pub fn with_dispatcher(dispatcher: Dispatcher<M>) -> Self {
        Self {
            configs: ConfigStore::new(),
            cooldowns: CooldownTracker::new(),
            history: AlertHistory::new(),
            dispatcher,
        }
    }

    /// Returns the config store.
    #[must_use]
    pub const fn configs(&self) -> &ConfigStore {
        &self.configs
    }

    /// Returns the alert history.
    #[must_use]
    pub const fn history(&self) -> &AlertHistory {
        &self.history
    }

    /// Returns the cooldown tracker.
    #[must_use]
    pub const fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Returns the effective config for an entity (stored or default).
    #[must_use]
    pub fn config(&self, entity_id: &str) -> AlertConfig {
        self.configs.get(entity_id)
    }

    /// Validates and stores a full replacement config.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AlertError::InvalidConfig`] if any invariant fails;
    /// the prior config is untouched.
    pub fn set_config(&self, config: AlertConfig) -> Result<AlertConfig> {
        self.configs.set(config)
    }

    /// Runs one evaluation cycle for a validated batch.
    ///
    /// Infallible: batches are validated at construction, classification is
    /// pure, and delivery failures are recorded per recipient in the
    /// [`EvaluationOutcome::Fired`] result rather than escalating. A fired
    /// event is in the history before dispatch starts, so notification
    /// failures never retract it.
    pub async fn evaluate(&self, batch: &AnomalyBatch) -> EvaluationOutcome {
        let config = self.configs.get(&batch.entity_id);
        let classification = classify(batch, &config);

        let Some(severity) = classification.severity else {
            let reason = no_alert_reason(&config, &classification);
            debug!(
                entity_id = %batch.entity_id,
                reason = ?reason,
                anomaly_count = classification.anomaly_count,
                total_points = classification.total_points,
                "no alert"
            );
            return EvaluationOutcome::NoAlert {
                reason,
                classification,
            };
        };

        let now = Utc::now();
        if !self
            .cooldowns
            .try_fire(&batch.entity_id, now, config.thresholds.cooldown_minutes)
            .is_allowed()
        {
            info!(
                entity_id = %batch.entity_id,
                severity = %severity,
                "alert suppressed by cooldown"
            );
            return EvaluationOutcome::Suppressed { classification };
        }

        let event = AlertEvent::new(&batch.entity_id, severity, &classification, now);
        info!(
            entity_id = %event.entity_id,
            event_id = %event.id,
            severity = %event.severity,
            anomaly_count = event.anomaly_count,
            total_points = event.total_points,
            "alert fired"
        );
        self.history.append(event.clone());

        let dispatch = self
            .dispatcher
            .dispatch(&event, &config.email_recipients)
            .await;
        EvaluationOutcome::Fired { event, dispatch }
    }

    /// Detects anomalies for a raw series window, then evaluates the result.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AlertError::DetectionUnavailable`] if the detection
    /// client fails, or [`crate::AlertError::MalformedBatch`] if its result
    /// does not align with the window. Detection failure produces no event
    /// and no notification.
    pub async fn evaluate_series<D: DetectionClient>(
        &self,
        client: &D,
        window: &SeriesWindow,
    ) -> Result<EvaluationOutcome> {
        let detection = client.detect(window).await?;
        let batch = AnomalyBatch::from_detection(window, detection)?;
        Ok(self.evaluate(&batch).await)
    }
}

/// Distinguishes the non-alerting cases for an enabled or disabled config.
fn no_alert_reason(config: &AlertConfig, classification: &Classification) -> NoAlertReason {
    if !config.enabled {
        return NoAlertReason::Disabled;
    }
    if classification.total_points == 0 {
        return NoAlertReason::InsufficientData;
    }
    let below_min = classification.anomaly_count < config.thresholds.min_anomaly_points as usize;
    if below_min && classification.anomaly_percentage >= config.thresholds.warning_threshold {
        return NoAlertReason::InsufficientData;
    }
    NoAlertReason::BelowThresholds
}
