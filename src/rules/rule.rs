//! User-defined organization rules.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::condition::Condition;
use crate::models::Destination;

/// How a rule's primary conditions combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    /// Only the first condition is tested
    Single,
    /// Every condition must hold
    And,
    /// At least one condition must hold
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::Single => "single",
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(LogicalOperator::Single),
            "and" => Some(LogicalOperator::And),
            "or" => Some(LogicalOperator::Or),
            _ => None,
        }
    }
}

/// What happens to a file once a rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleAction {
    Move,
    Copy,
    Delete,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Move => "move",
            RuleAction::Copy => "copy",
            RuleAction::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "move" => Some(RuleAction::Move),
            "copy" => Some(RuleAction::Copy),
            "delete" => Some(RuleAction::Delete),
            _ => None,
        }
    }
}

/// Anything evaluated with the rule grammar: rules and learned patterns
pub trait MatchSpec {
    fn conditions(&self) -> &[Condition];
    fn operator(&self) -> LogicalOperator;
    /// Conditions that veto a match. Empty for patterns.
    fn exclusions(&self) -> &[Condition] {
        &[]
    }
}

/// An explicit, user-authored organization rule
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    pub conditions: Vec<Condition>,
    pub operator: LogicalOperator,
    pub exclusions: Vec<Condition>,
    pub destination: Destination,
    pub action: RuleAction,
    /// Ascending: 0 is evaluated first
    pub sort_order: i32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub category: Option<String>,
}

impl Rule {
    /// A single-condition move rule
    pub fn new(name: impl Into<String>, condition: Condition, destination: Destination) -> Self {
        Self::with_conditions(name, LogicalOperator::Single, vec![condition], destination)
    }

    /// A compound rule combining several conditions
    pub fn compound(
        name: impl Into<String>,
        operator: LogicalOperator,
        conditions: Vec<Condition>,
        destination: Destination,
    ) -> Self {
        Self::with_conditions(name, operator, conditions, destination)
    }

    fn with_conditions(
        name: impl Into<String>,
        operator: LogicalOperator,
        conditions: Vec<Condition>,
        destination: Destination,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            conditions,
            operator,
            exclusions: Vec::new(),
            destination,
            action: RuleAction::Move,
            sort_order: 0,
            enabled: true,
            created_at: Utc::now(),
            category: None,
        }
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<Condition>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.action = action;
        if action == RuleAction::Delete {
            self.destination = Destination::Trash;
        }
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl MatchSpec for Rule {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn operator(&self) -> LogicalOperator {
        self.operator
    }

    fn exclusions(&self) -> &[Condition] {
        &self.exclusions
    }
}
