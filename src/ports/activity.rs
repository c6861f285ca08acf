//! Activity events and the two built-in sinks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

use super::ActivityLog;

/// Something worth keeping in the user's activity history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ActivityEvent {
    #[serde(rename_all = "camelCase")]
    Scanned { root: String, file_count: usize },

    #[serde(rename_all = "camelCase")]
    FileOrganized {
        file_id: String,
        file_name: String,
        destination: String,
    },

    #[serde(rename_all = "camelCase")]
    FileSkipped { file_id: String, file_name: String },

    #[serde(rename_all = "camelCase")]
    OrganizeFailed { file_name: String, error: String },

    #[serde(rename_all = "camelCase")]
    BulkCompleted { success_count: usize },

    #[serde(rename_all = "camelCase")]
    BulkPartialFailure {
        success_count: usize,
        failed_count: usize,
        first_error: String,
    },

    #[serde(rename_all = "camelCase")]
    RuleApplied { rule_id: String, file_name: String },

    Undo { description: String },

    Redo { description: String },

    #[serde(rename_all = "camelCase")]
    ModelRolledBack {
        from_version: Option<String>,
        to_version: Option<String>,
    },
}

/// An event with the time it was recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ActivityEvent,
}

/// Keeps events in memory; used by tests and short-lived sessions
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ActivityRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn events(&self) -> Vec<ActivityEvent> {
        self.records().into_iter().map(|r| r.event).collect()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn record(&self, event: ActivityEvent) {
        let record = ActivityRecord {
            at: Utc::now(),
            event,
        };
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

/// Writes events to the tracing subscriber as JSON payloads
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(&self, event: ActivityEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_else(|e| format!("{:?} ({})", event, e));
        match &event {
            ActivityEvent::OrganizeFailed { .. } | ActivityEvent::BulkPartialFailure { .. } => {
                tracing::warn!(target: "sortwise::activity", "{}", payload)
            }
            _ => tracing::info!(target: "sortwise::activity", "{}", payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_keeps_order() {
        let log = MemoryActivityLog::new();
        log.record(ActivityEvent::Scanned {
            root: "/d".into(),
            file_count: 2,
        });
        log.record(ActivityEvent::Undo {
            description: "Move a.pdf".into(),
        });

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ActivityEvent::Scanned { file_count: 2, .. }));
        assert!(matches!(events[1], ActivityEvent::Undo { .. }));
    }

    #[test]
    fn test_event_serialization() {
        let event = ActivityEvent::BulkPartialFailure {
            success_count: 9,
            failed_count: 1,
            first_error: "Permission denied: /d/5.pdf".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "bulkPartialFailure");
        assert_eq!(json["successCount"], 9);
        assert_eq!(json["failedCount"], 1);
    }
}
