//! Learned behavioral patterns.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::Destination;
use crate::rules::{Condition, LogicalOperator, MatchSpec};

/// When a pattern was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemporalContext {
    /// Hour of day, 0-23
    pub hour: u32,
    /// Day of week, 0 = Monday
    pub weekday: u32,
    /// Monday-Friday, 09:00-17:59
    pub is_work_hours: bool,
}

impl TemporalContext {
    pub fn at(time: DateTime<Utc>) -> Self {
        let hour = time.hour();
        let weekday = time.weekday().num_days_from_monday();
        Self {
            hour,
            weekday,
            is_work_hours: weekday < 5 && (9..18).contains(&hour),
        }
    }
}

/// A placement habit learned from user behavior.
///
/// Positive patterns suggest a destination. Negative patterns record what the
/// user keeps rejecting and suppress matching suggestions.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnedPattern {
    pub id: Uuid,
    pub conditions: Vec<Condition>,
    pub operator: LogicalOperator,
    pub destination: Destination,
    /// 0.0-1.0
    pub confidence: f64,
    pub occurrence_count: u32,
    pub rejection_count: u32,
    pub is_negative: bool,
    /// Rules this (negative) pattern vetoes for matching files
    pub suppressed_rule_ids: Vec<Uuid>,
    pub temporal_contexts: Vec<TemporalContext>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl LearnedPattern {
    /// A positive pattern with a single observation
    pub fn new(conditions: Vec<Condition>, destination: Destination) -> Self {
        let now = Utc::now();
        let operator = if conditions.len() > 1 {
            LogicalOperator::And
        } else {
            LogicalOperator::Single
        };
        Self {
            id: Uuid::new_v4(),
            conditions,
            operator,
            destination,
            confidence: 1.0,
            occurrence_count: 1,
            rejection_count: 0,
            is_negative: false,
            suppressed_rule_ids: Vec::new(),
            temporal_contexts: Vec::new(),
            created_at: now,
            last_seen_at: now,
        }
    }

    /// A negative pattern
    pub fn negative(conditions: Vec<Condition>, destination: Destination) -> Self {
        Self {
            is_negative: true,
            ..Self::new(conditions, destination)
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_counts(mut self, occurrences: u32, rejections: u32) -> Self {
        self.occurrence_count = occurrences;
        self.rejection_count = rejections;
        self
    }

    pub fn suppressing_rule(mut self, rule_id: Uuid) -> Self {
        if !self.suppressed_rule_ids.contains(&rule_id) {
            self.suppressed_rule_ids.push(rule_id);
        }
        self
    }

    /// Confidence derived from accept / reject history
    pub fn recompute_confidence(&mut self) {
        let total = self.occurrence_count + self.rejection_count;
        self.confidence = if total == 0 {
            0.0
        } else {
            f64::from(self.occurrence_count) / f64::from(total)
        };
    }

    /// Case-folded condition set used for overlap checks
    pub fn condition_set(&self) -> HashSet<Condition> {
        self.conditions.iter().map(Condition::normalized).collect()
    }

    /// Whether the two patterns share at least one condition
    pub fn overlaps(&self, other: &LearnedPattern) -> bool {
        let mine = self.condition_set();
        other
            .conditions
            .iter()
            .any(|c| mine.contains(&c.normalized()))
    }

    /// Record an observation time, keeping at most `max_samples`
    pub fn push_temporal_sample(&mut self, context: TemporalContext, max_samples: usize) {
        self.temporal_contexts.push(context);
        if self.temporal_contexts.len() > max_samples {
            let excess = self.temporal_contexts.len() - max_samples;
            self.temporal_contexts.drain(..excess);
        }
    }

    /// Share of observations made during work hours
    pub fn work_hours_ratio(&self) -> Option<f64> {
        if self.temporal_contexts.is_empty() {
            return None;
        }
        let work = self.temporal_contexts.iter().filter(|t| t.is_work_hours).count();
        Some(work as f64 / self.temporal_contexts.len() as f64)
    }
}

impl MatchSpec for LearnedPattern {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn operator(&self) -> LogicalOperator {
        self.operator
    }
}
