//! Learned behavioral patterns
//!
//! ## Modules
//! - `pattern` - `LearnedPattern` and temporal samples
//! - `matcher` - suggestion with negative-pattern suppression
//! - `learner` - pattern creation and reinforcement from user decisions

pub mod learner;
pub mod matcher;
pub mod pattern;

pub use learner::{LearningOutcome, PatternLearner};
pub use matcher::{PatternMatcher, PatternVerdict};
pub use pattern::{LearnedPattern, TemporalContext};
