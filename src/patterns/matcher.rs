//! Suggests destinations from learned patterns.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use super::pattern::LearnedPattern;
use crate::config::PatternPolicy;
use crate::models::{Destination, FileView, Suggestion, SuggestionSource};
use crate::rules::evaluate_spec;

/// A positive pattern that matched a file and survived suppression
#[derive(Debug, Clone, PartialEq)]
pub struct PatternVerdict {
    pub pattern_id: Uuid,
    pub destination: Destination,
    pub confidence: f64,
    pub reason: String,
}

impl PatternVerdict {
    pub fn into_suggestion(self) -> Suggestion {
        Suggestion {
            destination: self.destination,
            confidence: self.confidence,
            source: SuggestionSource::Pattern,
            reason: self.reason,
            rule_id: None,
        }
    }
}

/// Evaluates learned patterns with anti-pattern suppression
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    policy: PatternPolicy,
}

impl PatternMatcher {
    pub fn new(policy: PatternPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PatternPolicy {
        &self.policy
    }

    /// Whether a positive pattern may produce suggestions at all
    pub fn is_eligible(&self, pattern: &LearnedPattern) -> bool {
        !pattern.is_negative
            && pattern.confidence >= self.policy.min_confidence
            && pattern.rejection_count <= self.policy.max_rejections
            && pattern.occurrence_count >= self.policy.min_occurrences
    }

    /// Best surviving suggestion for a file.
    ///
    /// Candidates are tried by descending confidence, then occurrence count,
    /// then id. A candidate is dropped when any negative pattern shares a
    /// condition with it and targets the same destination.
    pub fn evaluate<F: FileView + ?Sized>(
        &self,
        file: &F,
        patterns: &[LearnedPattern],
        now: DateTime<Utc>,
    ) -> Option<PatternVerdict> {
        let negatives: Vec<&LearnedPattern> = patterns.iter().filter(|p| p.is_negative).collect();

        let mut candidates: Vec<&LearnedPattern> =
            patterns.iter().filter(|p| self.is_eligible(p)).collect();
        candidates.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| b.occurrence_count.cmp(&a.occurrence_count))
                .then_with(|| a.id.cmp(&b.id))
        });

        for candidate in candidates {
            let Some(spec_match) = evaluate_spec(candidate, file, now) else {
                continue;
            };

            if let Some(blocker) = negatives.iter().find(|n| suppresses(n, candidate)) {
                tracing::debug!(
                    pattern = %candidate.id,
                    negative = %blocker.id,
                    file = file.name(),
                    "[PatternMatcher] Suggestion suppressed by negative pattern"
                );
                continue;
            }

            let confidence = spec_match.bucket.score().min(candidate.confidence);
            return Some(PatternVerdict {
                pattern_id: candidate.id,
                destination: candidate.destination.clone(),
                confidence,
                reason: format!(
                    "Learned from {} similar moves: {}",
                    candidate.occurrence_count,
                    spec_match.reason()
                ),
            });
        }

        None
    }

    /// Rule ids vetoed for this file by matching negative patterns
    pub fn suppressed_rules<F: FileView + ?Sized>(
        &self,
        file: &F,
        patterns: &[LearnedPattern],
        now: DateTime<Utc>,
    ) -> HashSet<Uuid> {
        patterns
            .iter()
            .filter(|p| p.is_negative && !p.suppressed_rule_ids.is_empty())
            .filter(|p| evaluate_spec(*p, file, now).is_some())
            .flat_map(|p| p.suppressed_rule_ids.iter().copied())
            .collect()
    }

    /// Whether a negative pattern matching this file targets `destination`
    pub fn blocks_destination<F: FileView + ?Sized>(
        &self,
        file: &F,
        destination: &Destination,
        patterns: &[LearnedPattern],
        now: DateTime<Utc>,
    ) -> bool {
        patterns.iter().any(|p| {
            p.is_negative && p.destination == *destination && evaluate_spec(p, file, now).is_some()
        })
    }
}

/// A negative pattern suppresses a candidate on condition overlap plus same destination
fn suppresses(negative: &LearnedPattern, candidate: &LearnedPattern) -> bool {
    negative.destination == candidate.destination && negative.overlaps(candidate)
}
