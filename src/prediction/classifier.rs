//! Classifier port and the values exchanged with it.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::ModelError;
use crate::models::{Destination, FileView};

/// Inputs a classifier predicts from
#[derive(Debug, Clone, PartialEq)]
pub struct FileFeatures {
    pub name: String,
    pub extension: Option<String>,
    pub kind: String,
    pub size: u64,
    pub source_location: String,
    /// Days since creation, if known
    pub age_days: Option<i64>,
    pub hour: u32,
    /// 0 = Monday
    pub weekday: u32,
}

impl FileFeatures {
    pub fn from_file<F: FileView + ?Sized>(file: &F, now: DateTime<Utc>) -> Self {
        Self {
            name: file.name().to_string(),
            extension: file.extension().map(str::to_string),
            kind: file.kind().to_string(),
            size: file.size(),
            source_location: file.source_location().to_string(),
            age_days: file.created_at().map(|c| (now - c).num_days()),
            hour: now.hour(),
            weekday: now.weekday().num_days_from_monday(),
        }
    }
}

/// One scored destination
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub destination: Destination,
    pub confidence: f64,
}

/// A labeled placement used for training
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub features: FileFeatures,
    pub destination: Destination,
}

/// What a training run reports back
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMetrics {
    pub version: String,
    pub example_count: usize,
    pub label_count: usize,
    pub validation_accuracy: f64,
}

/// The version a classifier is currently serving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVersion {
    pub id: String,
    pub trained_at: DateTime<Utc>,
}

/// Persisted outcome of one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub example_count: usize,
    pub label_count: usize,
    pub validation_accuracy: f64,
    /// Passed validation and was activated
    pub accepted: bool,
    /// Set when runtime drift forced a rollback away from this version
    pub rejected_at: Option<DateTime<Utc>>,
}

impl TrainingRecord {
    /// Whether this version may be rolled back to
    pub fn is_usable(&self) -> bool {
        self.accepted && self.rejected_at.is_none()
    }
}

/// A trainable destination classifier.
///
/// Only the lifecycle contract matters to the gate; how predictions are
/// computed is up to the implementation. Every method may fail and the gate
/// treats all failures as "no prediction".
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Candidates for a file, in any order
    async fn predict(&self, features: &FileFeatures) -> Result<Vec<Candidate>, ModelError>;

    /// Train a new version without activating it
    async fn train(&self, examples: &[TrainingExample]) -> Result<TrainingMetrics, ModelError>;

    /// Currently active version, if any
    async fn current_version(&self) -> Option<ModelVersion>;

    async fn activate_version(&self, version: &str) -> Result<(), ModelError>;

    /// Stop serving predictions entirely
    async fn deactivate_current(&self) -> Result<(), ModelError>;
}
