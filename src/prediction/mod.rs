//! Gated machine-learned predictions.
//!
//! ## Modules
//!
//! - `classifier` - Classifier port, features and training records
//! - `window` - Sliding window of prediction outcomes
//! - `gate` - Five-stage gate with drift rollback

pub mod classifier;
pub mod gate;
pub mod window;

pub use classifier::{
    Candidate, Classifier, FileFeatures, ModelVersion, TrainingExample, TrainingMetrics,
    TrainingRecord,
};
pub use gate::{GateDecision, GateRejection, Prediction, PredictionGate, RetrainReason, RollbackOutcome};
pub use window::{OutcomeWindow, PredictionOutcome};
