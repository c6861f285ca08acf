//! Organizer configuration
//!
//! Tunable thresholds for the pattern matcher, the prediction gate and the
//! undo history, stored as JSON next to other app settings.
//!
//! File location: `<config dir>/sortwise/config.json`
//!
//! Environment overrides (a `.env` file is honored):
//! - `SORTWISE_MAX_UNDO`
//! - `SORTWISE_MIN_PREDICTION_CONFIDENCE`
//! - `SORTWISE_TRASH_DIR`

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const APP_DIR_NAME: &str = "sortwise";
const CONFIG_FILE_NAME: &str = "config.json";

/// When learned patterns may be suggested, and how they are learned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatternPolicy {
    /// Patterns below this confidence are never suggested
    pub min_confidence: f64,
    /// Patterns rejected more often than this are never suggested
    pub max_rejections: u32,
    /// Observations needed before a pattern is suggested
    pub min_occurrences: u32,
    /// Rejections of a rule's suggestion before a negative pattern is created
    pub negative_after_rejections: u32,
    /// Temporal samples kept per pattern
    pub max_temporal_samples: usize,
}

impl Default for PatternPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            max_rejections: 3,
            min_occurrences: 3,
            negative_after_rejections: 3,
            max_temporal_samples: 50,
        }
    }
}

/// Prediction gating and model lifecycle thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GateConfig {
    /// Labeled examples required before any prediction
    pub min_training_examples: usize,
    /// Distinct destinations required before any prediction
    pub min_distinct_destinations: usize,
    /// Minimum top-candidate confidence
    pub min_confidence: f64,
    /// Minimum gap between the top two candidates
    pub min_margin: f64,
    /// Outcomes kept in the drift window (clamped to 100..=200)
    pub outcome_window: usize,
    /// Outcomes required before rates are trusted
    pub min_window_samples: usize,
    /// Retrain / roll back below this acceptance rate
    pub min_acceptance_rate: f64,
    /// Retrain / roll back above this override rate
    pub max_override_rate: f64,
    /// Retrain when the active model is older than this
    pub max_model_age_hours: i64,
    /// Retrain once this many labeled examples arrived since the last training
    pub retrain_after_new_examples: usize,
    /// A trained version is only activated at or above this accuracy
    pub min_validation_accuracy: f64,
    /// Predictions taking longer than this are dropped
    pub prediction_timeout_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_training_examples: 50,
            min_distinct_destinations: 3,
            min_confidence: 0.7,
            min_margin: 0.15,
            outcome_window: 150,
            min_window_samples: 20,
            min_acceptance_rate: 0.5,
            max_override_rate: 0.3,
            max_model_age_hours: 24 * 7,
            retrain_after_new_examples: 25,
            min_validation_accuracy: 0.7,
            prediction_timeout_ms: 500,
        }
    }
}

impl GateConfig {
    /// Window size actually used
    pub fn window_size(&self) -> usize {
        self.outcome_window.clamp(100, 200)
    }
}

/// Undo / redo bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    pub max_undo: usize,
    pub max_redo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo: 50,
            max_redo: 50,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct OrganizerConfig {
    pub patterns: PatternPolicy,
    pub gate: GateConfig,
    pub history: HistoryConfig,
    /// Holding area for deleted files; defaults to the local data dir
    pub trash_dir: Option<PathBuf>,
}

impl OrganizerConfig {
    /// Get the path to the config file
    pub fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location with environment overrides.
    ///
    /// A missing file yields defaults; a malformed file is logged and ignored.
    pub fn load() -> Self {
        let mut config = match Self::file_path() {
            Some(path) if path.exists() => Self::from_path(&path).unwrap_or_else(|e| {
                tracing::warn!("[Config] Ignoring {}: {}", path.display(), e);
                Self::default()
            }),
            _ => Self::default(),
        };

        let _ = dotenvy::dotenv();
        if let Err(e) = config.apply_env_overrides() {
            tracing::warn!("[Config] {}", e);
        }
        config
    }

    /// Read a config file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::file_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)
    }

    /// Apply `SORTWISE_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SORTWISE_MAX_UNDO") {
            let max = value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnv {
                key: "SORTWISE_MAX_UNDO".to_string(),
                value: value.clone(),
            })?;
            self.history.max_undo = max;
            self.history.max_redo = max;
        }

        if let Some(value) = lookup("SORTWISE_MIN_PREDICTION_CONFIDENCE") {
            let min = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| (0.0..=1.0).contains(v))
                .ok_or_else(|| ConfigError::InvalidEnv {
                    key: "SORTWISE_MIN_PREDICTION_CONFIDENCE".to_string(),
                    value: value.clone(),
                })?;
            self.gate.min_confidence = min;
        }

        if let Some(value) = lookup("SORTWISE_TRASH_DIR") {
            if !value.trim().is_empty() {
                self.trash_dir = Some(PathBuf::from(value.trim()));
            }
        }

        Ok(())
    }

    /// Holding area deleted files are moved into
    pub fn resolved_trash_dir(&self) -> PathBuf {
        self.trash_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME)
                .join("Trash")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "gate": { "minConfidence": 0.9 } }"#).unwrap();

        let config = OrganizerConfig::from_path(&path).unwrap();
        assert_eq!(config.gate.min_confidence, 0.9);
        assert_eq!(config.gate.min_margin, GateConfig::default().min_margin);
        assert_eq!(config.history, HistoryConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = OrganizerConfig::default();
        config.patterns.min_occurrences = 7;
        config.save_to(&path).unwrap();

        assert_eq!(OrganizerConfig::from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            OrganizerConfig::from_path(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SORTWISE_MAX_UNDO", "5"),
            ("SORTWISE_MIN_PREDICTION_CONFIDENCE", "0.85"),
            ("SORTWISE_TRASH_DIR", "/tmp/holding"),
        ]
        .into_iter()
        .collect();

        let mut config = OrganizerConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.history.max_undo, 5);
        assert_eq!(config.history.max_redo, 5);
        assert_eq!(config.gate.min_confidence, 0.85);
        assert_eq!(config.resolved_trash_dir(), PathBuf::from("/tmp/holding"));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = OrganizerConfig::default();
        let result = config.apply_overrides(|k| {
            (k == "SORTWISE_MIN_PREDICTION_CONFIDENCE").then(|| "1.5".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_window_is_clamped() {
        let mut gate = GateConfig::default();
        gate.outcome_window = 20;
        assert_eq!(gate.window_size(), 100);
        gate.outcome_window = 1000;
        assert_eq!(gate.window_size(), 200);
    }
}
