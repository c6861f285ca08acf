//! Explicit organization rules.
//!
//! Rules are built from a small condition grammar and evaluated in priority
//! order. Example rules:
//! - `extension == pdf` → Documents/Finance
//! - `extension == pdf AND name contains "invoice"`, except `name contains "draft"`
//! - `NOT kind == image` → Misc
//! - `dmg created more than 30 days ago` → Trash

pub mod condition;
pub mod engine;
pub mod matcher;
pub mod rule;

pub use condition::Condition;
pub use engine::RuleEngine;
pub use matcher::{evaluate_spec, ConfidenceBucket, RuleMatcher, RuleVerdict, SpecMatch};
pub use rule::{LogicalOperator, MatchSpec, Rule, RuleAction};
