//! Layered decision pipeline.
//!
//! For every pending file, in strict precedence:
//!
//! ```text
//! rules ──match──► ready (rule)
//!   │ none
//! patterns ──match──► ready (pattern)
//!   │ none
//! prediction gate ──accepted──► ready (prediction)
//!   │ rejected
//! stays pending
//! ```
//!
//! Files that are not pending are left untouched.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Destination, FileStatus, FileView, OrganizedFile};
use crate::patterns::{LearnedPattern, PatternMatcher};
use crate::ports::{ActivityEvent, ActivityLog};
use crate::prediction::{GateDecision, PredictionGate};
use crate::rules::{RuleAction, RuleEngine};

/// Counts per decision source for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionSummary {
    pub by_rule: usize,
    pub by_pattern: usize,
    pub by_prediction: usize,
    /// Pending files no stage could decide
    pub unresolved: usize,
    /// Files skipped because they were not pending
    pub untouched: usize,
    /// Rule actions other than `Move`, keyed by file id
    pub actions: HashMap<String, RuleAction>,
}

impl DecisionSummary {
    pub fn decided(&self) -> usize {
        self.by_rule + self.by_pattern + self.by_prediction
    }

    /// Action to execute for a decided file
    pub fn action_for(&self, file_id: &str) -> RuleAction {
        self.actions.get(file_id).copied().unwrap_or(RuleAction::Move)
    }
}

pub struct DecisionPipeline {
    matcher: PatternMatcher,
    gate: Option<Arc<PredictionGate>>,
    activity: Option<Arc<dyn ActivityLog>>,
}

impl DecisionPipeline {
    pub fn new(matcher: PatternMatcher) -> Self {
        Self {
            matcher,
            gate: None,
            activity: None,
        }
    }

    /// Enable the prediction stage
    pub fn with_gate(mut self, gate: Arc<PredictionGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_activity(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Decorate pending files with a destination, confidence and source
    pub async fn decide(
        &self,
        files: &mut [OrganizedFile],
        rules: &RuleEngine,
        patterns: &[LearnedPattern],
        allow_list: Option<&[Destination]>,
        now: DateTime<Utc>,
    ) -> DecisionSummary {
        let mut summary = DecisionSummary::default();

        for file in files.iter_mut() {
            if file.status() != FileStatus::Pending {
                summary.untouched += 1;
                continue;
            }

            let suppressed = self.matcher.suppressed_rules(&*file, patterns, now);
            if let Some(verdict) = rules.evaluate_with(&*file, now, |id| suppressed.contains(id)) {
                if verdict.action != RuleAction::Move {
                    summary.actions.insert(file.id().to_string(), verdict.action);
                }
                if let Some(activity) = &self.activity {
                    activity.record(ActivityEvent::RuleApplied {
                        rule_id: verdict.rule_id.to_string(),
                        file_name: file.name().to_string(),
                    });
                }
                file.apply_suggestion(verdict.into_suggestion());
                summary.by_rule += 1;
                continue;
            }

            if let Some(verdict) = self.matcher.evaluate(&*file, patterns, now) {
                file.apply_suggestion(verdict.into_suggestion());
                summary.by_pattern += 1;
                continue;
            }

            if let Some(gate) = &self.gate {
                match gate.evaluate(&*file, patterns, allow_list, now).await {
                    GateDecision::Accepted(prediction) => {
                        file.apply_suggestion(prediction.into_suggestion());
                        summary.by_prediction += 1;
                        continue;
                    }
                    GateDecision::Rejected(reason) => {
                        tracing::debug!(file = file.name(), "[Pipeline] No prediction: {:?}", reason);
                    }
                }
            }

            summary.unresolved += 1;
        }

        tracing::info!(
            rules = summary.by_rule,
            patterns = summary.by_pattern,
            predictions = summary.by_prediction,
            unresolved = summary.unresolved,
            "[Pipeline] Decided {} of {} files",
            summary.decided(),
            files.len()
        );
        summary
    }
}

impl Default for DecisionPipeline {
    fn default() -> Self {
        Self::new(PatternMatcher::default())
    }
}
