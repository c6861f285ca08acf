//! Gate between the classifier and the user.
//!
//! A prediction is surfaced only when every check passes, in this order:
//!
//! 1. Cold start: enough labeled examples over enough distinct destinations
//! 2. Absolute confidence of the top candidate
//! 3. Margin between the top two candidates
//! 4. No negative pattern matching the file targets the predicted destination
//! 5. Optional caller allow-list
//!
//! Model failures and timeouts fail closed. Runtime drift (low acceptance or
//! high override rate over the outcome window) rolls back to the last accepted
//! model version, or disables predictions when there is none.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::classifier::{Classifier, FileFeatures, TrainingExample, TrainingRecord};
use super::window::{OutcomeWindow, PredictionOutcome};
use crate::config::GateConfig;
use crate::error::ModelError;
use crate::models::{Destination, FileView, Suggestion, SuggestionSource};
use crate::patterns::{LearnedPattern, PatternMatcher};
use crate::ports::{ActivityEvent, ActivityLog, PersistentStore};
use crate::utils::format_percent;

/// A prediction that passed every check
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub destination: Destination,
    pub confidence: f64,
    /// Top confidence minus the runner-up's
    pub margin: f64,
    pub version: Option<String>,
}

impl Prediction {
    pub fn into_suggestion(self) -> Suggestion {
        Suggestion {
            reason: format!("Predicted with {} confidence", format_percent(self.confidence)),
            destination: self.destination,
            confidence: self.confidence,
            source: SuggestionSource::Prediction,
            rule_id: None,
        }
    }
}

/// Why no prediction was surfaced. These are normal outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GateRejection {
    Disabled,
    ColdStart { examples: usize, destinations: usize },
    ModelUnavailable(ModelError),
    NoCandidates,
    BelowConfidence(f64),
    AmbiguousMargin(f64),
    NegativePattern,
    NotAllowed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Accepted(Prediction),
    Rejected(GateRejection),
}

/// Why a retrain is due
#[derive(Debug, Clone, PartialEq)]
pub enum RetrainReason {
    Untrained,
    LowAcceptance(f64),
    HighOverride(f64),
    Stale { hours: i64 },
    NewExamples(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    RolledBack { from: Option<String>, to: String },
    Disabled { from: Option<String> },
}

#[derive(Debug)]
struct GateState {
    example_count: usize,
    destinations: HashSet<Destination>,
    new_examples: usize,
    window: OutcomeWindow,
    history: Vec<TrainingRecord>,
    last_trained_at: Option<DateTime<Utc>>,
    disabled: bool,
}

pub struct PredictionGate {
    classifier: Arc<dyn Classifier>,
    config: GateConfig,
    matcher: PatternMatcher,
    state: Mutex<GateState>,
    store: Option<Arc<dyn PersistentStore>>,
    activity: Option<Arc<dyn ActivityLog>>,
}

impl PredictionGate {
    pub fn new(classifier: Arc<dyn Classifier>, config: GateConfig) -> Self {
        let window = OutcomeWindow::new(config.window_size());
        Self {
            classifier,
            config,
            matcher: PatternMatcher::default(),
            state: Mutex::new(GateState {
                example_count: 0,
                destinations: HashSet::new(),
                new_examples: 0,
                window,
                history: Vec::new(),
                last_trained_at: None,
                disabled: false,
            }),
            store: None,
            activity: None,
        }
    }

    /// Persist training records through `store`
    pub fn with_store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_activity(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Restore training history loaded from the store
    pub fn with_history(self, history: Vec<TrainingRecord>) -> Self {
        {
            let mut state = self.state();
            state.last_trained_at = history.iter().map(|r| r.trained_at).max();
            state.history = history;
        }
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn history(&self) -> Vec<TrainingRecord> {
        self.state().history.clone()
    }

    pub fn is_disabled(&self) -> bool {
        self.state().disabled
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Count a labeled example toward cold start and retraining
    pub fn observe_example(&self, example: &TrainingExample) {
        let mut state = self.state();
        state.example_count += 1;
        state.new_examples += 1;
        state.destinations.insert(example.destination.clone());
    }

    /// Run the gate for one file
    pub async fn evaluate<F: FileView + Sync + ?Sized>(
        &self,
        file: &F,
        patterns: &[LearnedPattern],
        allow_list: Option<&[Destination]>,
        now: DateTime<Utc>,
    ) -> GateDecision {
        {
            let state = self.state();
            if state.disabled {
                return GateDecision::Rejected(GateRejection::Disabled);
            }
            if state.example_count < self.config.min_training_examples
                || state.destinations.len() < self.config.min_distinct_destinations
            {
                return GateDecision::Rejected(GateRejection::ColdStart {
                    examples: state.example_count,
                    destinations: state.destinations.len(),
                });
            }
        }

        let features = FileFeatures::from_file(file, now);
        let timeout = std::time::Duration::from_millis(self.config.prediction_timeout_ms);
        let predicted = match tokio::time::timeout(timeout, self.classifier.predict(&features)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(self.config.prediction_timeout_ms)),
        };
        let mut candidates = match predicted {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(file = file.name(), "[PredictionGate] Model unavailable: {}", e);
                return GateDecision::Rejected(GateRejection::ModelUnavailable(e));
            }
        };

        if let Some(bad) = candidates
            .iter()
            .find(|c| !c.confidence.is_finite() || !(0.0..=1.0).contains(&c.confidence))
        {
            let error = ModelError::Corrupt(format!(
                "confidence {} for {}",
                bad.confidence,
                bad.destination.display_name()
            ));
            tracing::warn!(file = file.name(), "[PredictionGate] Model unavailable: {}", error);
            return GateDecision::Rejected(GateRejection::ModelUnavailable(error));
        }

        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let Some(top) = candidates.first() else {
            return GateDecision::Rejected(GateRejection::NoCandidates);
        };

        if top.confidence < self.config.min_confidence {
            return GateDecision::Rejected(GateRejection::BelowConfidence(top.confidence));
        }

        let runner_up = candidates.get(1).map(|c| c.confidence).unwrap_or(0.0);
        let margin = top.confidence - runner_up;
        if margin < self.config.min_margin {
            return GateDecision::Rejected(GateRejection::AmbiguousMargin(margin));
        }

        if self
            .matcher
            .blocks_destination(file, &top.destination, patterns, now)
        {
            tracing::debug!(file = file.name(), "[PredictionGate] Blocked by negative pattern");
            return GateDecision::Rejected(GateRejection::NegativePattern);
        }

        if let Some(allowed) = allow_list {
            if !allowed.contains(&top.destination) {
                return GateDecision::Rejected(GateRejection::NotAllowed);
            }
        }

        let version = self.classifier.current_version().await.map(|v| v.id);
        GateDecision::Accepted(Prediction {
            destination: top.destination.clone(),
            confidence: top.confidence,
            margin,
            version,
        })
    }

    fn degradation(&self, window: &OutcomeWindow) -> Option<RetrainReason> {
        if window.len() < self.config.min_window_samples {
            return None;
        }
        if let Some(rate) = window.acceptance_rate() {
            if rate < self.config.min_acceptance_rate {
                return Some(RetrainReason::LowAcceptance(rate));
            }
        }
        if let Some(rate) = window.override_rate() {
            if rate > self.config.max_override_rate {
                return Some(RetrainReason::HighOverride(rate));
            }
        }
        None
    }

    /// Record what the user did with a prediction; rolls back on drift
    pub async fn record_outcome(
        &self,
        outcome: PredictionOutcome,
        now: DateTime<Utc>,
    ) -> Option<RollbackOutcome> {
        let degraded = {
            let mut state = self.state();
            if state.disabled {
                return None;
            }
            state.window.push(outcome);
            self.degradation(&state.window)
        };

        let reason = degraded?;
        tracing::warn!("[PredictionGate] Model degraded at runtime: {:?}", reason);
        Some(self.rollback(now).await)
    }

    /// Whether and why the model should be retrained
    pub fn retrain_reason(&self, now: DateTime<Utc>) -> Option<RetrainReason> {
        let state = self.state();
        if state.example_count < self.config.min_training_examples
            || state.destinations.len() < self.config.min_distinct_destinations
        {
            return None;
        }
        if let Some(reason) = self.degradation(&state.window) {
            return Some(reason);
        }

        let Some(last) = state.last_trained_at else {
            return Some(RetrainReason::Untrained);
        };
        let age = now - last;
        let max_age = Duration::try_hours(self.config.max_model_age_hours);
        if max_age.is_some_and(|max| age > max) {
            return Some(RetrainReason::Stale {
                hours: age.num_hours(),
            });
        }
        if state.new_examples >= self.config.retrain_after_new_examples {
            return Some(RetrainReason::NewExamples(state.new_examples));
        }
        None
    }

    /// Train a new version and activate it if it validates
    pub async fn retrain(
        &self,
        examples: &[TrainingExample],
        now: DateTime<Utc>,
    ) -> Result<TrainingRecord, ModelError> {
        let metrics = match self.classifier.train(examples).await {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::warn!("[PredictionGate] Training failed: {}", e);
                return Err(e);
            }
        };

        let mut accepted = metrics.validation_accuracy >= self.config.min_validation_accuracy;
        if accepted {
            if let Err(e) = self.classifier.activate_version(&metrics.version).await {
                tracing::warn!(version = %metrics.version, "[PredictionGate] Activation failed: {}", e);
                accepted = false;
            }
        } else {
            tracing::info!(
                version = %metrics.version,
                accuracy = metrics.validation_accuracy,
                "[PredictionGate] New version failed validation, keeping current"
            );
        }

        let record = TrainingRecord {
            version: metrics.version,
            trained_at: now,
            example_count: metrics.example_count,
            label_count: metrics.label_count,
            validation_accuracy: metrics.validation_accuracy,
            accepted,
            rejected_at: None,
        };

        {
            let mut state = self.state();
            state.history.push(record.clone());
            state.last_trained_at = Some(now);
            state.new_examples = 0;
            if accepted {
                state.window.clear();
                state.disabled = false;
            }
        }
        self.persist(&record);

        if accepted {
            tracing::info!(version = %record.version, "[PredictionGate] Activated new model version");
        }
        Ok(record)
    }

    /// Reject the active version and fall back to the last accepted one
    pub async fn rollback(&self, now: DateTime<Utc>) -> RollbackOutcome {
        let current = self.classifier.current_version().await.map(|v| v.id);

        let (rejected, target) = {
            let mut state = self.state();
            let mut rejected = Vec::new();
            if let Some(id) = &current {
                for record in state.history.iter_mut().filter(|r| r.version == *id) {
                    record.rejected_at = Some(now);
                    rejected.push(record.clone());
                }
            }
            state.window.clear();
            let target = state
                .history
                .iter()
                .rev()
                .find(|r| r.is_usable() && Some(&r.version) != current.as_ref())
                .map(|r| r.version.clone());
            (rejected, target)
        };
        for record in &rejected {
            self.persist(record);
        }

        if let Some(to) = target {
            match self.classifier.activate_version(&to).await {
                Ok(()) => {
                    tracing::info!(from = ?current, to = %to, "[PredictionGate] Rolled back model");
                    self.log(ActivityEvent::ModelRolledBack {
                        from_version: current.clone(),
                        to_version: Some(to.clone()),
                    });
                    return RollbackOutcome::RolledBack { from: current, to };
                }
                Err(e) => {
                    tracing::warn!(version = %to, "[PredictionGate] Rollback target unusable: {}", e);
                }
            }
        }

        if let Err(e) = self.classifier.deactivate_current().await {
            tracing::warn!("[PredictionGate] Failed to deactivate model: {}", e);
        }
        self.state().disabled = true;
        tracing::warn!(from = ?current, "[PredictionGate] No usable model, predictions disabled");
        self.log(ActivityEvent::ModelRolledBack {
            from_version: current.clone(),
            to_version: None,
        });
        RollbackOutcome::Disabled { from: current }
    }

    fn persist(&self, record: &TrainingRecord) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_training_record(record) {
                tracing::warn!(version = %record.version, "[PredictionGate] Failed to save training record: {}", e);
            }
        }
    }

    fn log(&self, event: ActivityEvent) {
        if let Some(activity) = &self.activity {
            activity.record(event);
        }
    }
}
