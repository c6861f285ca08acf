//! Learns placement patterns from user decisions.
//!
//! Pattern lifecycle:
//!
//! ```text
//! manual placement ──► new positive pattern (1 occurrence)
//!        │                   │ same extension + location + destination
//!        ▼                   ▼
//!   reinforce: occurrences += 1, temporal sample recorded
//!
//! suggestion rejected ──► rejections += 1, confidence recomputed
//! rule suggestion rejected N times ──► negative pattern suppressing the rule
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use super::pattern::{LearnedPattern, TemporalContext};
use crate::config::PatternPolicy;
use crate::models::{Destination, FileView};
use crate::rules::Condition;

/// What a learning call changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningOutcome {
    Created(Uuid),
    Reinforced(Uuid),
    Weakened(Uuid),
    Unchanged,
}

/// Maintains the learned pattern set
#[derive(Debug, Clone, Default)]
pub struct PatternLearner {
    policy: PatternPolicy,
    patterns: Vec<LearnedPattern>,
    /// (rule id, conditions key) -> rejection count, until a negative pattern exists
    pending_rule_rejections: HashMap<(Uuid, Vec<Condition>), u32>,
}

impl PatternLearner {
    pub fn new(policy: PatternPolicy, patterns: Vec<LearnedPattern>) -> Self {
        Self {
            policy,
            patterns,
            pending_rule_rejections: HashMap::new(),
        }
    }

    pub fn patterns(&self) -> &[LearnedPattern] {
        &self.patterns
    }

    pub fn into_patterns(self) -> Vec<LearnedPattern> {
        self.patterns
    }

    /// Conditions a placement of this file is generalized to
    fn signature<F: FileView + ?Sized>(file: &F) -> Vec<Condition> {
        let mut conditions = Vec::with_capacity(2);
        if let Some(ext) = file.extension() {
            conditions.push(Condition::extension(ext));
        } else {
            conditions.push(Condition::kind(file.kind()));
        }
        if !file.source_location().is_empty() {
            conditions.push(Condition::source_location(&file.source_location().to_lowercase()));
        }
        conditions
    }

    fn find_mut(
        &mut self,
        conditions: &[Condition],
        destination: &Destination,
        negative: bool,
    ) -> Option<&mut LearnedPattern> {
        self.patterns.iter_mut().find(|p| {
            p.is_negative == negative && p.destination == *destination && p.conditions == conditions
        })
    }

    /// The user placed `file` into `destination` by hand
    pub fn record_placement<F: FileView + ?Sized>(
        &mut self,
        file: &F,
        destination: &Destination,
        at: DateTime<Utc>,
    ) -> LearningOutcome {
        let conditions = Self::signature(file);
        let max_samples = self.policy.max_temporal_samples;
        let context = TemporalContext::at(at);

        if let Some(pattern) = self.find_mut(&conditions, destination, false) {
            pattern.occurrence_count += 1;
            pattern.last_seen_at = at;
            pattern.recompute_confidence();
            pattern.push_temporal_sample(context, max_samples);
            tracing::debug!(
                pattern = %pattern.id,
                occurrences = pattern.occurrence_count,
                "[PatternLearner] Reinforced pattern"
            );
            return LearningOutcome::Reinforced(pattern.id);
        }

        let mut pattern = LearnedPattern::new(conditions, destination.clone());
        pattern.created_at = at;
        pattern.last_seen_at = at;
        pattern.push_temporal_sample(context, max_samples);
        let id = pattern.id;
        tracing::debug!(pattern = %id, destination = destination.display_name(), "[PatternLearner] New pattern");
        self.patterns.push(pattern);
        LearningOutcome::Created(id)
    }

    /// The user rejected a suggestion that came from `pattern_id`
    pub fn record_rejection(&mut self, pattern_id: Uuid) -> LearningOutcome {
        match self.patterns.iter_mut().find(|p| p.id == pattern_id) {
            Some(pattern) => {
                pattern.rejection_count += 1;
                pattern.recompute_confidence();
                LearningOutcome::Weakened(pattern.id)
            }
            None => LearningOutcome::Unchanged,
        }
    }

    /// The user rejected a rule's suggestion for `file`.
    ///
    /// After `negative_after_rejections` rejections for similar files, a
    /// negative pattern suppressing the rule is created (or extended).
    pub fn record_rule_rejection<F: FileView + ?Sized>(
        &mut self,
        rule_id: Uuid,
        file: &F,
        destination: &Destination,
        at: DateTime<Utc>,
    ) -> LearningOutcome {
        let conditions = Self::signature(file);

        if let Some(existing) = self.find_mut(&conditions, destination, true) {
            existing.rejection_count += 1;
            existing.last_seen_at = at;
            if !existing.suppressed_rule_ids.contains(&rule_id) {
                existing.suppressed_rule_ids.push(rule_id);
            }
            return LearningOutcome::Reinforced(existing.id);
        }

        let key = (rule_id, conditions.clone());
        let count = self.pending_rule_rejections.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count < self.policy.negative_after_rejections {
            return LearningOutcome::Unchanged;
        }
        self.pending_rule_rejections.remove(&key);

        let mut pattern = LearnedPattern::negative(conditions, destination.clone())
            .with_counts(0, self.policy.negative_after_rejections)
            .suppressing_rule(rule_id);
        pattern.created_at = at;
        pattern.last_seen_at = at;
        let id = pattern.id;
        tracing::info!(rule = %rule_id, pattern = %id, "[PatternLearner] Rule suppressed for similar files");
        self.patterns.push(pattern);
        LearningOutcome::Created(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrganizedFile;
    use crate::patterns::PatternMatcher;

    fn file(name: &str) -> OrganizedFile {
        OrganizedFile::new(format!("/Users/me/Downloads/{}", name), 10)
            .unwrap()
            .with_source_location("Downloads")
    }

    fn docs() -> Destination {
        Destination::folder("docs", "Documents")
    }

    #[test]
    fn test_repeated_placements_become_suggestible() {
        let mut learner = PatternLearner::default();
        let matcher = PatternMatcher::default();
        let now = Utc::now();

        let first = learner.record_placement(&file("a.pdf"), &docs(), now);
        assert!(matches!(first, LearningOutcome::Created(_)));
        assert!(matcher.evaluate(&file("z.pdf"), learner.patterns(), now).is_none());

        learner.record_placement(&file("b.PDF"), &docs(), now);
        let third = learner.record_placement(&file("c.pdf"), &docs(), now);
        assert!(matches!(third, LearningOutcome::Reinforced(_)));
        assert_eq!(learner.patterns().len(), 1);
        assert_eq!(learner.patterns()[0].occurrence_count, 3);
        assert_eq!(learner.patterns()[0].temporal_contexts.len(), 3);

        let verdict = matcher.evaluate(&file("z.pdf"), learner.patterns(), now).unwrap();
        assert_eq!(verdict.destination, docs());
    }

    #[test]
    fn test_rejections_lower_confidence() {
        let mut learner = PatternLearner::default();
        let now = Utc::now();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            learner.record_placement(&file(name), &docs(), now);
        }
        let id = learner.patterns()[0].id;

        assert_eq!(learner.record_rejection(id), LearningOutcome::Weakened(id));
        assert_eq!(learner.patterns()[0].confidence, 0.75);
        assert_eq!(learner.record_rejection(Uuid::new_v4()), LearningOutcome::Unchanged);
    }

    #[test]
    fn test_rule_rejections_create_negative_pattern() {
        let mut learner = PatternLearner::default();
        let matcher = PatternMatcher::default();
        let rule_id = Uuid::new_v4();
        let now = Utc::now();

        assert_eq!(
            learner.record_rule_rejection(rule_id, &file("a.pdf"), &docs(), now),
            LearningOutcome::Unchanged
        );
        learner.record_rule_rejection(rule_id, &file("b.pdf"), &docs(), now);
        let created = learner.record_rule_rejection(rule_id, &file("c.pdf"), &docs(), now);
        assert!(matches!(created, LearningOutcome::Created(_)));

        let suppressed = matcher.suppressed_rules(&file("d.pdf"), learner.patterns(), now);
        assert!(suppressed.contains(&rule_id));

        let again = learner.record_rule_rejection(rule_id, &file("e.pdf"), &docs(), now);
        assert!(matches!(again, LearningOutcome::Reinforced(_)));
        assert_eq!(learner.patterns().len(), 1);
    }
}
