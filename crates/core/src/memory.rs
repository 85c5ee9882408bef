//! In-process [`PersistenceGateway`] backed by `RwLock`ed maps.
//!
//! Used by tests and local development. Payloads are kept in their stored
//! JSON form so reads go through the same decoding path as the database.
//! Faults can be switched on to exercise failure handling.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::assessment::{Assessment, Decision, Outcome};
use crate::gateway::{PersistenceGateway, StorageError, StorageResult};
use crate::step_data::{StepData, StepRecord};
use crate::types::{SubjectId, Timestamp};

/// A stored step row: the untagged payload plus its completion time.
#[derive(Debug, Clone)]
struct StoredStep {
    step_data: serde_json::Value,
    completed_at: Timestamp,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryGateway {
    assessments: RwLock<HashMap<SubjectId, Assessment>>,
    steps: RwLock<HashMap<(SubjectId, u8), StoredStep>>,
    decisions: RwLock<Vec<Decision>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_pointer_writes: AtomicBool,
    fail_reads_after_write: AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with [`StorageError::Backend`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with [`StorageError::Backend`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make only pointer writes fail, leaving record writes working.
    pub fn set_fail_pointer_writes(&self, fail: bool) {
        self.fail_pointer_writes.store(fail, Ordering::SeqCst);
    }

    /// Start failing reads once the next write has gone through.
    pub fn set_fail_reads_after_next_write(&self, fail: bool) {
        self.fail_reads_after_write.store(fail, Ordering::SeqCst);
    }

    /// Decisions recorded so far, oldest first.
    pub async fn decisions(&self) -> Vec<Decision> {
        self.decisions.read().await.clone()
    }

    /// Insert a raw payload for a step, bypassing schema encoding.
    pub async fn put_raw_step(&self, subject: SubjectId, step: u8, step_data: serde_json::Value) {
        self.steps.write().await.insert(
            (subject, step),
            StoredStep {
                step_data,
                completed_at: chrono::Utc::now(),
            },
        );
    }

    /// Overwrite the completion time of a stored step.
    pub async fn set_completed_at(&self, subject: SubjectId, step: u8, completed_at: Timestamp) {
        if let Some(stored) = self.steps.write().await.get_mut(&(subject, step)) {
            stored.completed_at = completed_at;
        }
    }

    fn check_read(&self) -> StorageResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("simulated read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("simulated write failure".into()));
        }
        if self.fail_reads_after_write.swap(false, Ordering::SeqCst) {
            self.fail_reads.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn health_check(&self) -> StorageResult<()> {
        self.check_read()
    }

    async fn get_assessment(&self, subject: SubjectId) -> StorageResult<Option<Assessment>> {
        self.check_read()?;
        Ok(self.assessments.read().await.get(&subject).cloned())
    }

    async fn initialize_assessment(&self, subject: SubjectId) -> StorageResult<()> {
        self.check_write()?;
        self.assessments
            .write()
            .await
            .entry(subject)
            .or_insert_with(|| Assessment::started(subject, chrono::Utc::now()));
        Ok(())
    }

    async fn get_step_data(
        &self,
        subject: SubjectId,
        step: u8,
    ) -> StorageResult<Option<StepRecord>> {
        self.check_read()?;
        let Some(stored) = self.steps.read().await.get(&(subject, step)).cloned() else {
            return Ok(None);
        };
        let step_data = StepData::from_json(step, stored.step_data)?;
        Ok(Some(StepRecord {
            subject,
            step_number: step,
            step_data,
            completed_at: stored.completed_at,
        }))
    }

    async fn completed_steps(&self, subject: SubjectId) -> StorageResult<BTreeSet<u8>> {
        self.check_read()?;
        Ok(self
            .steps
            .read()
            .await
            .keys()
            .filter(|(s, _)| *s == subject)
            .map(|(_, step)| *step)
            .collect())
    }

    async fn save_step_data(
        &self,
        subject: SubjectId,
        data: &StepData,
    ) -> StorageResult<StepRecord> {
        self.check_write()?;
        let completed_at = chrono::Utc::now();
        let step_number = data.step_number();
        self.steps.write().await.insert(
            (subject, step_number),
            StoredStep {
                step_data: data.to_json(),
                completed_at,
            },
        );
        Ok(StepRecord {
            subject,
            step_number,
            step_data: data.clone(),
            completed_at,
        })
    }

    async fn set_current_step(&self, subject: SubjectId, step: u8) -> StorageResult<()> {
        self.check_write()?;
        if self.fail_pointer_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("simulated pointer write failure".into()));
        }
        let now = chrono::Utc::now();
        let mut assessments = self.assessments.write().await;
        let row = assessments
            .entry(subject)
            .or_insert_with(|| Assessment::started(subject, now));
        if row.status.is_terminal() || row.current_step >= step {
            return Ok(());
        }
        row.current_step = step;
        row.updated_at = now;
        Ok(())
    }

    async fn mark_terminal(
        &self,
        subject: SubjectId,
        outcome: Outcome,
        at_step: u8,
    ) -> StorageResult<bool> {
        self.check_write()?;
        let now = chrono::Utc::now();
        let mut assessments = self.assessments.write().await;
        let row = assessments
            .entry(subject)
            .or_insert_with(|| Assessment::started(subject, now));
        if row.status.is_terminal() {
            return Ok(false);
        }
        row.status = outcome.status();
        row.completed_at_step = Some(at_step);
        row.updated_at = now;
        Ok(true)
    }

    async fn record_decision(&self, decision: &Decision) -> StorageResult<()> {
        self.check_write()?;
        let mut decisions = self.decisions.write().await;
        if !decisions.iter().any(|d| d.subject == decision.subject) {
            decisions.push(decision.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
