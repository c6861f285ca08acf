//! First-match-wins rule evaluation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::matcher::{RuleMatcher, RuleVerdict};
use super::rule::Rule;
use crate::models::FileView;

/// Evaluates a priority-ordered rule set.
///
/// Rules are ordered by `sort_order`, then `created_at`, then id. The first
/// matching rule wins and later rules are never evaluated.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    /// Build an engine from any rule set; disabled rules are dropped
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut rules: Vec<Rule> = rules.into_iter().filter(|r| r.enabled).collect();
        rules.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { rules }
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Return the verdict of the first matching rule
    pub fn evaluate<F: FileView + ?Sized>(&self, file: &F, now: DateTime<Utc>) -> Option<RuleVerdict> {
        self.evaluate_with(file, now, |_| false)
    }

    /// Like `evaluate`, skipping rules for which `is_suppressed` returns true.
    ///
    /// A suppressed rule behaves as if it did not match; evaluation continues
    /// with the next rule.
    pub fn evaluate_with<F, S>(&self, file: &F, now: DateTime<Utc>, is_suppressed: S) -> Option<RuleVerdict>
    where
        F: FileView + ?Sized,
        S: Fn(&Uuid) -> bool,
    {
        for rule in &self.rules {
            if let Some(verdict) = RuleMatcher::evaluate(rule, file, now) {
                if is_suppressed(&rule.id) {
                    tracing::debug!(rule = %rule.name, file = file.name(), "[RuleEngine] Match suppressed");
                    continue;
                }
                return Some(verdict);
            }
        }
        None
    }

    /// Evaluate each file independently
    pub fn evaluate_batch<'a, F: FileView + 'a>(
        &self,
        files: impl IntoIterator<Item = &'a F>,
        now: DateTime<Utc>,
    ) -> Vec<Option<RuleVerdict>> {
        files.into_iter().map(|f| self.evaluate(f, now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Destination, OrganizedFile};
    use crate::rules::Condition;
    use chrono::Duration;
    use std::cell::Cell;

    fn file(name: &str) -> OrganizedFile {
        OrganizedFile::new(format!("/downloads/{}", name), 10).unwrap()
    }

    #[test]
    fn test_lowest_sort_order_wins() {
        let generic = Rule::new(
            "Generic",
            Condition::extension("pdf"),
            Destination::folder("g", "Documents/Generic"),
        )
        .with_sort_order(1);
        let finance = Rule::new(
            "Finance",
            Condition::extension("pdf"),
            Destination::folder("f", "Documents/Finance"),
        )
        .with_sort_order(0);

        let engine = RuleEngine::new(vec![generic, finance]);
        let verdict = engine.evaluate(&file("invoice.pdf"), Utc::now()).unwrap();
        assert_eq!(verdict.destination.display_name(), "Documents/Finance");
    }

    #[test]
    fn test_ties_broken_by_creation_then_id() {
        let base = Utc::now();
        let newer = Rule::new("newer", Condition::extension("pdf"), Destination::folder("n", "Newer"))
            .with_created_at(base);
        let older = Rule::new("older", Condition::extension("pdf"), Destination::folder("o", "Older"))
            .with_created_at(base - Duration::days(1));

        let engine = RuleEngine::new(vec![newer.clone(), older]);
        let verdict = engine.evaluate(&file("a.pdf"), Utc::now()).unwrap();
        assert_eq!(verdict.destination.display_name(), "Older");

        let mut twin_a = newer.clone();
        let mut twin_b = newer;
        twin_a.id = Uuid::from_u128(2);
        twin_b.id = Uuid::from_u128(1);
        twin_b.destination = Destination::folder("b", "B");
        let engine = RuleEngine::new(vec![twin_a, twin_b]);
        assert_eq!(engine.rules()[0].id, Uuid::from_u128(1));
    }

    #[test]
    fn test_disabled_rules_are_ignored() {
        let rule = Rule::new("PDF", Condition::extension("pdf"), Destination::Trash).disabled();
        let engine = RuleEngine::new(vec![rule]);
        assert!(engine.is_empty());
        assert!(engine.evaluate(&file("a.pdf"), Utc::now()).is_none());
    }

    #[test]
    fn test_stops_after_first_match() {
        // The suppression hook is consulted once per matching rule, so it
        // doubles as a probe for how many rules were evaluated.
        let rules: Vec<Rule> = (0..5)
            .map(|i| {
                Rule::new(format!("r{}", i), Condition::extension("pdf"), Destination::Trash)
                    .with_sort_order(i)
            })
            .collect();
        let engine = RuleEngine::new(rules);
        let calls = Cell::new(0);
        let verdict = engine.evaluate_with(&file("a.pdf"), Utc::now(), |_| {
            calls.set(calls.get() + 1);
            false
        });
        assert!(verdict.is_some());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_suppressed_rule_falls_through() {
        let first = Rule::new("first", Condition::extension("pdf"), Destination::folder("a", "A"));
        let second = Rule::new("second", Condition::extension("pdf"), Destination::folder("b", "B"))
            .with_sort_order(1);
        let first_id = first.id;
        let engine = RuleEngine::new(vec![first, second]);

        let verdict = engine
            .evaluate_with(&file("a.pdf"), Utc::now(), |id| *id == first_id)
            .unwrap();
        assert_eq!(verdict.destination.display_name(), "B");
    }

    #[test]
    fn test_deterministic_and_batch_independent() {
        let engine = RuleEngine::new(vec![
            Rule::new("pdf", Condition::extension("pdf"), Destination::folder("p", "P")),
            Rule::new("png", Condition::extension("png"), Destination::folder("i", "I")).with_sort_order(1),
        ]);
        let now = Utc::now();
        let files = vec![file("a.pdf"), file("b.txt"), file("c.png")];

        let first = engine.evaluate_batch(&files, now);
        let second = engine.evaluate_batch(&files, now);
        assert_eq!(first, second);
        assert!(first[0].is_some());
        assert!(first[1].is_none());
        assert_eq!(first[2].as_ref().unwrap().destination.display_name(), "I");
    }
}
