//! Combines a rule's conditions into a match verdict.
//!
//! Confidence buckets:
//!
//! | operator / match                         | bucket |
//! |------------------------------------------|--------|
//! | `and` with two or more conditions        | High   |
//! | `single` or one-condition `and`, strong  | Medium |
//! | `single` or one-condition `and`, weak    | Low    |
//! | `or` with two or more true conditions    | Medium |
//! | `or` with one true condition, strong     | Medium |
//! | `or` with one true condition, weak       | Low    |
//!
//! A rule that survived at least one exclusion gets `EXCLUSION_BONUS` on top.

use chrono::{DateTime, Utc};

use super::condition::Condition;
use super::rule::{LogicalOperator, MatchSpec, Rule, RuleAction};
use crate::models::{Destination, FileView, Suggestion, SuggestionSource};

/// Added when a match survived explicit exclusions
pub const EXCLUSION_BONUS: f64 = 0.02;

/// Coarse confidence levels for rule and pattern matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceBucket {
    Low,
    Medium,
    High,
}

impl ConfidenceBucket {
    pub fn score(&self) -> f64 {
        match self {
            ConfidenceBucket::High => 0.95,
            ConfidenceBucket::Medium => 0.80,
            ConfidenceBucket::Low => 0.60,
        }
    }
}

/// Result of primary condition evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct SpecMatch<'a> {
    pub bucket: ConfidenceBucket,
    /// Conditions that evaluated true
    pub matched: Vec<&'a Condition>,
}

impl SpecMatch<'_> {
    /// "extension is .pdf and name contains \"invoice\""
    pub fn reason(&self) -> String {
        self.matched
            .iter()
            .map(|c| c.describe())
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

/// Evaluate primary conditions and exclusions of any `MatchSpec`.
///
/// Returns `None` when the primary conditions fail or any exclusion holds.
pub fn evaluate_spec<'a, S, F>(spec: &'a S, file: &F, now: DateTime<Utc>) -> Option<SpecMatch<'a>>
where
    S: MatchSpec + ?Sized,
    F: FileView + ?Sized,
{
    let conditions = spec.conditions();

    let matched: Vec<&Condition> = match spec.operator() {
        LogicalOperator::Single => {
            let first = conditions.first()?;
            if !first.evaluate(file, now) {
                return None;
            }
            vec![first]
        }
        LogicalOperator::And => {
            if conditions.is_empty() || !conditions.iter().all(|c| c.evaluate(file, now)) {
                return None;
            }
            conditions.iter().collect()
        }
        LogicalOperator::Or => {
            let hits: Vec<&Condition> = conditions.iter().filter(|c| c.evaluate(file, now)).collect();
            if hits.is_empty() {
                return None;
            }
            hits
        }
    };

    // Exclusions are an implicit OR and always veto
    if spec.exclusions().iter().any(|c| c.evaluate(file, now)) {
        return None;
    }

    let bucket = bucket_for(spec.operator(), conditions.len(), &matched);
    Some(SpecMatch { bucket, matched })
}

fn bucket_for(
    operator: LogicalOperator,
    condition_count: usize,
    matched: &[&Condition],
) -> ConfidenceBucket {
    let strength = |c: &Condition| {
        if c.is_strong() {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    };

    match operator {
        LogicalOperator::And if condition_count >= 2 => ConfidenceBucket::High,
        LogicalOperator::Or if matched.len() >= 2 => ConfidenceBucket::Medium,
        _ => matched
            .first()
            .map(|c| strength(*c))
            .unwrap_or(ConfidenceBucket::Low),
    }
}

/// A rule that matched a file
#[derive(Debug, Clone, PartialEq)]
pub struct RuleVerdict {
    pub rule_id: uuid::Uuid,
    pub destination: Destination,
    pub action: RuleAction,
    pub confidence: f64,
    pub reason: String,
}

impl RuleVerdict {
    pub fn into_suggestion(self) -> Suggestion {
        Suggestion {
            destination: self.destination,
            confidence: self.confidence,
            source: SuggestionSource::Rule,
            reason: self.reason,
            rule_id: Some(self.rule_id),
        }
    }
}

/// Matches one rule against one file
pub struct RuleMatcher;

impl RuleMatcher {
    pub fn evaluate<F: FileView + ?Sized>(
        rule: &Rule,
        file: &F,
        now: DateTime<Utc>,
    ) -> Option<RuleVerdict> {
        let spec_match = evaluate_spec(rule, file, now)?;

        let mut confidence = spec_match.bucket.score();
        if !rule.exclusions.is_empty() {
            confidence = (confidence + EXCLUSION_BONUS).min(1.0);
        }

        Some(RuleVerdict {
            rule_id: rule.id,
            destination: rule.destination.clone(),
            action: rule.action,
            confidence,
            reason: format!("Rule \"{}\": {}", rule.name, spec_match.reason()),
        })
    }
}
