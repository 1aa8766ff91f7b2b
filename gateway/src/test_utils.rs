use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::store::{DocumentStore, FieldMatch, StoreError};

/// In-memory document store. Matching is a case-insensitive comparison of the
/// whole field value, which is close enough to an analyzed single-token match.
#[derive(Default)]
pub(crate) struct MemoryStore {
    docs: Mutex<BTreeMap<String, String>>,
    write_attempts: Mutex<Vec<String>>,
    fail_reads: AtomicBool,
    pending_write_failures: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_document(self, id: &str, source: &str) -> Self {
        self.docs
            .lock()
            .unwrap()
            .insert(id.to_string(), source.to_string());
        self
    }

    pub(crate) fn fail_reads(&self, enabled: bool) {
        self.fail_reads.store(enabled, Ordering::SeqCst);
    }

    /// The next `count` writes are rejected after being recorded as attempts.
    pub(crate) fn fail_next_writes(&self, count: usize) {
        self.pending_write_failures.store(count, Ordering::SeqCst);
    }

    pub(crate) fn write_attempts(&self) -> Vec<String> {
        self.write_attempts.lock().unwrap().clone()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.docs.lock().unwrap().contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
        self.check_reads()?;
        Ok(self.docs.lock().unwrap().get(id).cloned())
    }

    async fn search(&self, query: &FieldMatch) -> Result<Vec<String>, StoreError> {
        self.check_reads()?;
        let text = query.text.to_lowercase();
        let docs = self.docs.lock().unwrap();
        Ok(docs
            .values()
            .filter(|source| {
                serde_json::from_str::<Value>(source)
                    .ok()
                    .and_then(|doc| doc.get(&query.field)?.as_str().map(str::to_lowercase))
                    .is_some_and(|value| value == text)
            })
            .cloned()
            .collect())
    }

    async fn index(&self, id: &str, document: &Value) -> Result<String, StoreError> {
        let failed = self
            .pending_write_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !failed {
            self.docs
                .lock()
                .unwrap()
                .insert(id.to_string(), document.to_string());
        }
        // Recorded last so an observed attempt always has its outcome settled.
        self.write_attempts.lock().unwrap().push(id.to_string());
        if failed {
            return Err(StoreError::Status {
                status: 503,
                body: "unavailable_shards_exception".to_string(),
            });
        }
        Ok(id.to_string())
    }
}
