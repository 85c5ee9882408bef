//! Durable storage contract for assessments and step records.
//!
//! Implementations key everything by [`SubjectId`]. "Not found" is never an
//! error here: absent rows map to `None`, step 1, or `false`.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::assessment::{Assessment, Decision, Outcome, MIN_STEP};
use crate::step_data::{StepData, StepRecord};
use crate::types::SubjectId;

/// A persistence call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backing store could not be reached or rejected the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded.
    #[error("Stored data is malformed: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Read/write access to assessments and their step records.
///
/// Every call may suspend. Callers that need several records must await
/// them all before relying on any combined view.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// The assessment row, if one has been created.
    async fn get_assessment(&self, subject: SubjectId) -> StorageResult<Option<Assessment>>;

    /// Create the assessment at step 1 / in progress if it does not exist.
    /// Calling it again leaves an existing row untouched.
    async fn initialize_assessment(&self, subject: SubjectId) -> StorageResult<()>;

    /// The persisted record for a step, if that step was completed.
    async fn get_step_data(
        &self,
        subject: SubjectId,
        step: u8,
    ) -> StorageResult<Option<StepRecord>>;

    /// Step numbers that have a persisted record.
    async fn completed_steps(&self, subject: SubjectId) -> StorageResult<BTreeSet<u8>>;

    /// Upsert the record for `data`'s step.
    async fn save_step_data(
        &self,
        subject: SubjectId,
        data: &StepData,
    ) -> StorageResult<StepRecord>;

    /// Move the current-step pointer forward, creating the assessment if
    /// needed. A concluded assessment, or a pointer already at or past
    /// `step`, is left unchanged.
    async fn set_current_step(&self, subject: SubjectId, step: u8) -> StorageResult<()>;

    /// Move the assessment to a terminal status.
    ///
    /// Returns `true` only when this call changed the status; a row that is
    /// already terminal is left as it is.
    async fn mark_terminal(
        &self,
        subject: SubjectId,
        outcome: Outcome,
        at_step: u8,
    ) -> StorageResult<bool>;

    /// Persist the decision letter that accompanied a terminal outcome.
    async fn record_decision(&self, decision: &Decision) -> StorageResult<()>;

    /// Persist a step record and advance the pointer to `next_step`.
    ///
    /// The record is written before the pointer, so the only partial state a
    /// failure can leave behind is "record saved, pointer not yet moved",
    /// which is safe to retry.
    async fn complete_step(
        &self,
        subject: SubjectId,
        data: &StepData,
        next_step: u8,
    ) -> StorageResult<bool> {
        self.save_step_data(subject, data).await?;
        self.set_current_step(subject, next_step).await?;
        Ok(true)
    }

    /// Confirm the backing store is reachable.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn assessment_exists(&self, subject: SubjectId) -> StorageResult<bool> {
        Ok(self.get_assessment(subject).await?.is_some())
    }

    /// The pointer, defaulting to step 1 when no assessment exists yet.
    async fn get_current_step(&self, subject: SubjectId) -> StorageResult<u8> {
        Ok(self
            .get_assessment(subject)
            .await?
            .map_or(MIN_STEP, |a| a.current_step))
    }

    async fn is_step_completed(&self, subject: SubjectId, step: u8) -> StorageResult<bool> {
        Ok(self.get_step_data(subject, step).await?.is_some())
    }
}
