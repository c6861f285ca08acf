//! SQLite-backed `PersistentStore`.
//!
//! Each entity is stored as a JSON record next to the few columns used for
//! ordering and lookups. A connection is opened per operation.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::records::{FileRecord, PatternRecord, RuleRecord, TrainingRecordRow};
use crate::error::StoreError;
use crate::models::OrganizedFile;
use crate::patterns::LearnedPattern;
use crate::ports::PersistentStore;
use crate::prediction::TrainingRecord;
use crate::rules::Rule;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS files (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        record TEXT NOT NULL,
        updated_at TEXT DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_files_status ON files(status);

    CREATE TABLE IF NOT EXISTS rules (
        id TEXT PRIMARY KEY,
        sort_order INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        record TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS patterns (
        id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL,
        record TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS training_records (
        version TEXT PRIMARY KEY,
        trained_at TEXT NOT NULL,
        record TEXT NOT NULL
    );
"#;

pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create the database inside `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        Self::open_file(data_dir.join("sortwise.db"))
    }

    /// Open or create the database at an exact path
    pub fn open_file(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.into(),
        };
        store.conn()?.execute_batch(SCHEMA)?;
        tracing::info!(path = %store.db_path.display(), "[SqliteStore] Opened");
        Ok(store)
    }

    /// Default location under the platform data directory
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("sortwise"))
    }

    fn conn(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.db_path)?)
    }

    fn load_records<T: serde::de::DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }
}

impl PersistentStore for SqliteStore {
    fn save_file(&self, file: &OrganizedFile) -> Result<(), StoreError> {
        let record = serde_json::to_string(&FileRecord::from(file))?;
        self.conn()?.execute(
            r#"
            INSERT INTO files (id, status, record, updated_at)
            VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                record = excluded.record,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![file.id(), file.status().as_str(), record],
        )?;
        Ok(())
    }

    fn fetch_files(
        &self,
        predicate: &dyn Fn(&OrganizedFile) -> bool,
    ) -> Result<Vec<OrganizedFile>, StoreError> {
        let records: Vec<FileRecord> = self.load_records("SELECT record FROM files ORDER BY rowid")?;
        let mut files = Vec::with_capacity(records.len());
        for record in records {
            let file = OrganizedFile::try_from(record)?;
            if predicate(&file) {
                files.push(file);
            }
        }
        Ok(files)
    }

    fn fetch_file(&self, id: &str) -> Result<Option<OrganizedFile>, StoreError> {
        let conn = self.conn()?;
        let record: Option<String> = conn
            .query_row("SELECT record FROM files WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        match record {
            Some(json) => {
                let record: FileRecord = serde_json::from_str(&json)?;
                Ok(Some(OrganizedFile::try_from(record)?))
            }
            None => Ok(None),
        }
    }

    fn save_rule(&self, rule: &Rule) -> Result<(), StoreError> {
        let record = serde_json::to_string(&RuleRecord::from(rule))?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO rules (id, sort_order, created_at, record) VALUES (?1, ?2, ?3, ?4)",
            params![
                rule.id.to_string(),
                rule.sort_order,
                rule.created_at.to_rfc3339(),
                record
            ],
        )?;
        Ok(())
    }

    fn delete_rule(&self, id: Uuid) -> Result<(), StoreError> {
        self.conn()?
            .execute("DELETE FROM rules WHERE id = ?1", [id.to_string()])?;
        Ok(())
    }

    fn fetch_rules(&self) -> Result<Vec<Rule>, StoreError> {
        let records: Vec<RuleRecord> =
            self.load_records("SELECT record FROM rules ORDER BY sort_order, created_at")?;
        records.into_iter().map(Rule::try_from).collect()
    }

    fn save_pattern(&self, pattern: &LearnedPattern) -> Result<(), StoreError> {
        let record = serde_json::to_string(&PatternRecord::from(pattern))?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO patterns (id, created_at, record) VALUES (?1, ?2, ?3)",
            params![pattern.id.to_string(), pattern.created_at.to_rfc3339(), record],
        )?;
        Ok(())
    }

    fn fetch_patterns(&self) -> Result<Vec<LearnedPattern>, StoreError> {
        let records: Vec<PatternRecord> =
            self.load_records("SELECT record FROM patterns ORDER BY created_at")?;
        records.into_iter().map(LearnedPattern::try_from).collect()
    }

    fn save_training_record(&self, record: &TrainingRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(&TrainingRecordRow::from(record))?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO training_records (version, trained_at, record) VALUES (?1, ?2, ?3)",
            params![record.version, record.trained_at.to_rfc3339(), json],
        )?;
        Ok(())
    }

    fn fetch_training_records(&self) -> Result<Vec<TrainingRecord>, StoreError> {
        let rows: Vec<TrainingRecordRow> =
            self.load_records("SELECT record FROM training_records ORDER BY trained_at, rowid")?;
        Ok(rows.into_iter().map(TrainingRecord::from).collect())
    }
}
