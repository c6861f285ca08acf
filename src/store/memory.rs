//! In-memory `PersistentStore` for tests and ephemeral sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::OrganizedFile;
use crate::patterns::LearnedPattern;
use crate::ports::PersistentStore;
use crate::prediction::TrainingRecord;
use crate::rules::Rule;

#[derive(Debug, Default)]
struct Tables {
    files: HashMap<String, OrganizedFile>,
    /// Insertion order of file ids, for stable fetches
    file_order: Vec<String>,
    rules: HashMap<Uuid, Rule>,
    patterns: HashMap<Uuid, LearnedPattern>,
    training: Vec<TrainingRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl PersistentStore for MemoryStore {
    fn save_file(&self, file: &OrganizedFile) -> Result<(), StoreError> {
        let mut tables = self.tables();
        if tables.files.insert(file.id().to_string(), file.clone()).is_none() {
            tables.file_order.push(file.id().to_string());
        }
        Ok(())
    }

    fn fetch_files(
        &self,
        predicate: &dyn Fn(&OrganizedFile) -> bool,
    ) -> Result<Vec<OrganizedFile>, StoreError> {
        let tables = self.tables();
        Ok(tables
            .file_order
            .iter()
            .filter_map(|id| tables.files.get(id))
            .filter(|f| predicate(f))
            .cloned()
            .collect())
    }

    fn fetch_file(&self, id: &str) -> Result<Option<OrganizedFile>, StoreError> {
        Ok(self.tables().files.get(id).cloned())
    }

    fn save_rule(&self, rule: &Rule) -> Result<(), StoreError> {
        self.tables().rules.insert(rule.id, rule.clone());
        Ok(())
    }

    fn delete_rule(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables().rules.remove(&id);
        Ok(())
    }

    fn fetch_rules(&self) -> Result<Vec<Rule>, StoreError> {
        let mut rules: Vec<Rule> = self.tables().rules.values().cloned().collect();
        rules.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(rules)
    }

    fn save_pattern(&self, pattern: &LearnedPattern) -> Result<(), StoreError> {
        self.tables().patterns.insert(pattern.id, pattern.clone());
        Ok(())
    }

    fn fetch_patterns(&self) -> Result<Vec<LearnedPattern>, StoreError> {
        let mut patterns: Vec<LearnedPattern> = self.tables().patterns.values().cloned().collect();
        patterns.sort_by_key(|p| p.created_at);
        Ok(patterns)
    }

    fn save_training_record(&self, record: &TrainingRecord) -> Result<(), StoreError> {
        let mut tables = self.tables();
        match tables.training.iter_mut().find(|r| r.version == record.version) {
            Some(existing) => *existing = record.clone(),
            None => tables.training.push(record.clone()),
        }
        Ok(())
    }

    fn fetch_training_records(&self) -> Result<Vec<TrainingRecord>, StoreError> {
        Ok(self.tables().training.clone())
    }
}
