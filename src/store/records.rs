//! Serialized shapes of persisted entities.
//!
//! Domain types carry no serde derives; every persisted entity goes through a
//! record here. Loading validates enum strings and file invariants, so a bad
//! row surfaces as `StoreError::InvalidRecord` instead of a panic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Destination, FileStatus, FileView, OrganizedFile, SuggestionSource};
use crate::patterns::{LearnedPattern, TemporalContext};
use crate::prediction::TrainingRecord;
use crate::rules::{Condition, LogicalOperator, Rule, RuleAction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DestinationRecord {
    Trash,
    #[serde(rename_all = "camelCase")]
    Folder {
        access_token: String,
        display_name: String,
    },
}

impl From<&Destination> for DestinationRecord {
    fn from(destination: &Destination) -> Self {
        match destination {
            Destination::Trash => DestinationRecord::Trash,
            Destination::Folder {
                access_token,
                display_name,
            } => DestinationRecord::Folder {
                access_token: access_token.clone(),
                display_name: display_name.clone(),
            },
        }
    }
}

impl From<DestinationRecord> for Destination {
    fn from(record: DestinationRecord) -> Self {
        match record {
            DestinationRecord::Trash => Destination::Trash,
            DestinationRecord::Folder {
                access_token,
                display_name,
            } => Destination::Folder {
                access_token,
                display_name,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ConditionRecord {
    ExtensionEquals(String),
    NameContains(String),
    NameStartsWith(String),
    NameEndsWith(String),
    OlderThan { days: u32, extension: Option<String> },
    SizeLargerThan(u64),
    ModifiedOlderThan(u32),
    AccessedOlderThan(u32),
    KindEquals(String),
    SourceLocationEquals(String),
    Not(Box<ConditionRecord>),
}

impl From<&Condition> for ConditionRecord {
    fn from(condition: &Condition) -> Self {
        match condition {
            Condition::ExtensionEquals(v) => ConditionRecord::ExtensionEquals(v.clone()),
            Condition::NameContains(v) => ConditionRecord::NameContains(v.clone()),
            Condition::NameStartsWith(v) => ConditionRecord::NameStartsWith(v.clone()),
            Condition::NameEndsWith(v) => ConditionRecord::NameEndsWith(v.clone()),
            Condition::OlderThan { days, extension } => ConditionRecord::OlderThan {
                days: *days,
                extension: extension.clone(),
            },
            Condition::SizeLargerThan(v) => ConditionRecord::SizeLargerThan(*v),
            Condition::ModifiedOlderThan(v) => ConditionRecord::ModifiedOlderThan(*v),
            Condition::AccessedOlderThan(v) => ConditionRecord::AccessedOlderThan(*v),
            Condition::KindEquals(v) => ConditionRecord::KindEquals(v.clone()),
            Condition::SourceLocationEquals(v) => ConditionRecord::SourceLocationEquals(v.clone()),
            Condition::Not(inner) => ConditionRecord::Not(Box::new(ConditionRecord::from(inner.as_ref()))),
        }
    }
}

impl From<ConditionRecord> for Condition {
    fn from(record: ConditionRecord) -> Self {
        match record {
            ConditionRecord::ExtensionEquals(v) => Condition::extension(&v),
            ConditionRecord::NameContains(v) => Condition::NameContains(v),
            ConditionRecord::NameStartsWith(v) => Condition::NameStartsWith(v),
            ConditionRecord::NameEndsWith(v) => Condition::NameEndsWith(v),
            ConditionRecord::OlderThan { days, extension } => {
                Condition::older_than(days, extension.as_deref())
            }
            ConditionRecord::SizeLargerThan(v) => Condition::SizeLargerThan(v),
            ConditionRecord::ModifiedOlderThan(v) => Condition::ModifiedOlderThan(v),
            ConditionRecord::AccessedOlderThan(v) => Condition::AccessedOlderThan(v),
            ConditionRecord::KindEquals(v) => Condition::KindEquals(v),
            ConditionRecord::SourceLocationEquals(v) => Condition::SourceLocationEquals(v),
            ConditionRecord::Not(inner) => Condition::Not(Box::new(Condition::from(*inner))),
        }
    }
}

fn conditions_to_records(conditions: &[Condition]) -> Vec<ConditionRecord> {
    conditions.iter().map(ConditionRecord::from).collect()
}

fn conditions_from_records(records: Vec<ConditionRecord>) -> Vec<Condition> {
    records.into_iter().map(Condition::from).collect()
}

fn parse_operator(value: &str) -> Result<LogicalOperator, StoreError> {
    LogicalOperator::parse(value)
        .ok_or_else(|| StoreError::InvalidRecord(format!("unknown operator '{}'", value)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub id: Uuid,
    pub name: String,
    pub conditions: Vec<ConditionRecord>,
    pub operator: String,
    #[serde(default)]
    pub exclusions: Vec<ConditionRecord>,
    pub destination: DestinationRecord,
    pub action: String,
    pub sort_order: i32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<&Rule> for RuleRecord {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id,
            name: rule.name.clone(),
            conditions: conditions_to_records(&rule.conditions),
            operator: rule.operator.as_str().to_string(),
            exclusions: conditions_to_records(&rule.exclusions),
            destination: DestinationRecord::from(&rule.destination),
            action: rule.action.as_str().to_string(),
            sort_order: rule.sort_order,
            enabled: rule.enabled,
            created_at: rule.created_at,
            category: rule.category.clone(),
        }
    }
}

impl TryFrom<RuleRecord> for Rule {
    type Error = StoreError;

    fn try_from(record: RuleRecord) -> Result<Self, Self::Error> {
        let action = RuleAction::parse(&record.action)
            .ok_or_else(|| StoreError::InvalidRecord(format!("unknown action '{}'", record.action)))?;
        Ok(Rule {
            id: record.id,
            name: record.name,
            conditions: conditions_from_records(record.conditions),
            operator: parse_operator(&record.operator)?,
            exclusions: conditions_from_records(record.exclusions),
            destination: record.destination.into(),
            action,
            sort_order: record.sort_order,
            enabled: record.enabled,
            created_at: record.created_at,
            category: record.category,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalContextRecord {
    pub hour: u32,
    pub weekday: u32,
    pub is_work_hours: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
    pub id: Uuid,
    pub conditions: Vec<ConditionRecord>,
    pub operator: String,
    pub destination: DestinationRecord,
    pub confidence: f64,
    pub occurrence_count: u32,
    pub rejection_count: u32,
    pub is_negative: bool,
    #[serde(default)]
    pub suppressed_rule_ids: Vec<Uuid>,
    #[serde(default)]
    pub temporal_contexts: Vec<TemporalContextRecord>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl From<&LearnedPattern> for PatternRecord {
    fn from(pattern: &LearnedPattern) -> Self {
        Self {
            id: pattern.id,
            conditions: conditions_to_records(&pattern.conditions),
            operator: pattern.operator.as_str().to_string(),
            destination: DestinationRecord::from(&pattern.destination),
            confidence: pattern.confidence,
            occurrence_count: pattern.occurrence_count,
            rejection_count: pattern.rejection_count,
            is_negative: pattern.is_negative,
            suppressed_rule_ids: pattern.suppressed_rule_ids.clone(),
            temporal_contexts: pattern
                .temporal_contexts
                .iter()
                .map(|c| TemporalContextRecord {
                    hour: c.hour,
                    weekday: c.weekday,
                    is_work_hours: c.is_work_hours,
                })
                .collect(),
            created_at: pattern.created_at,
            last_seen_at: pattern.last_seen_at,
        }
    }
}

impl TryFrom<PatternRecord> for LearnedPattern {
    type Error = StoreError;

    fn try_from(record: PatternRecord) -> Result<Self, Self::Error> {
        Ok(LearnedPattern {
            id: record.id,
            conditions: conditions_from_records(record.conditions),
            operator: parse_operator(&record.operator)?,
            destination: record.destination.into(),
            confidence: record.confidence.clamp(0.0, 1.0),
            occurrence_count: record.occurrence_count,
            rejection_count: record.rejection_count,
            is_negative: record.is_negative,
            suppressed_rule_ids: record.suppressed_rule_ids,
            temporal_contexts: record
                .temporal_contexts
                .into_iter()
                .map(|c| TemporalContext {
                    hour: c.hour,
                    weekday: c.weekday,
                    is_work_hours: c.is_work_hours,
                })
                .collect(),
            created_at: record.created_at,
            last_seen_at: record.last_seen_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub path: PathBuf,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub kind: String,
    pub source_location: String,
    pub status: String,
    pub destination: Option<DestinationRecord>,
    pub match_reason: Option<String>,
    pub confidence: Option<f64>,
    pub matched_rule_id: Option<Uuid>,
    pub suggestion_source: Option<String>,
}

impl From<&OrganizedFile> for FileRecord {
    fn from(file: &OrganizedFile) -> Self {
        Self {
            id: file.id().to_string(),
            path: file.path().to_path_buf(),
            size: file.size(),
            created_at: file.created_at(),
            modified_at: file.modified_at(),
            accessed_at: file.accessed_at(),
            kind: file.kind().to_string(),
            source_location: file.source_location().to_string(),
            status: file.status().as_str().to_string(),
            destination: file.destination().map(DestinationRecord::from),
            match_reason: file.match_reason().map(str::to_string),
            confidence: file.confidence(),
            matched_rule_id: file.matched_rule_id(),
            suggestion_source: file.suggestion_source().map(|s| s.as_str().to_string()),
        }
    }
}

impl TryFrom<FileRecord> for OrganizedFile {
    type Error = StoreError;

    fn try_from(record: FileRecord) -> Result<Self, Self::Error> {
        let status = FileStatus::parse(&record.status)
            .ok_or_else(|| StoreError::InvalidRecord(format!("unknown status '{}'", record.status)))?;
        let suggestion_source = match record.suggestion_source {
            Some(s) => Some(
                SuggestionSource::parse(&s)
                    .ok_or_else(|| StoreError::InvalidRecord(format!("unknown source '{}'", s)))?,
            ),
            None => None,
        };

        OrganizedFile::from_parts(
            record.id,
            record.path,
            record.size,
            [record.created_at, record.modified_at, record.accessed_at],
            record.kind,
            record.source_location,
            status,
            record.destination.map(Destination::from),
            record.match_reason,
            record.confidence,
            record.matched_rule_id,
            suggestion_source,
        )
        .map_err(|e| StoreError::InvalidRecord(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecordRow {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub example_count: usize,
    pub label_count: usize,
    pub validation_accuracy: f64,
    pub accepted: bool,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
}

impl From<&TrainingRecord> for TrainingRecordRow {
    fn from(record: &TrainingRecord) -> Self {
        Self {
            version: record.version.clone(),
            trained_at: record.trained_at,
            example_count: record.example_count,
            label_count: record.label_count,
            validation_accuracy: record.validation_accuracy,
            accepted: record.accepted,
            rejected_at: record.rejected_at,
        }
    }
}

impl From<TrainingRecordRow> for TrainingRecord {
    fn from(row: TrainingRecordRow) -> Self {
        Self {
            version: row.version,
            trained_at: row.trained_at,
            example_count: row.example_count,
            label_count: row.label_count,
            validation_accuracy: row.validation_accuracy,
            accepted: row.accepted,
            rejected_at: row.rejected_at,
        }
    }
}
