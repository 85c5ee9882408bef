//! PostgreSQL [`PersistenceGateway`] and [`ProfileDirectory`].

use std::collections::BTreeSet;

use async_trait::async_trait;
use fairchance_core::assessment::{Assessment, Decision, Outcome};
use fairchance_core::gateway::{PersistenceGateway, StorageError, StorageResult};
use fairchance_core::profile::{CandidateProfile, HrAdminProfile, ProfileDirectory};
use fairchance_core::step_data::{StepData, StepRecord};
use fairchance_core::types::{DbId, SubjectId};

use crate::models::step_from_db;
use crate::repositories::{AssessmentRepo, DecisionRepo, ProfileRepo, StepRecordRepo};
use crate::DbPool;

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// Assessments, step records, and decisions stored in PostgreSQL.
#[derive(Clone)]
pub struct PgGateway {
    pool: DbPool,
}

impl PgGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl PersistenceGateway for PgGateway {
    async fn health_check(&self) -> StorageResult<()> {
        crate::health_check(&self.pool).await.map_err(backend)
    }

    async fn get_assessment(&self, subject: SubjectId) -> StorageResult<Option<Assessment>> {
        AssessmentRepo::find(&self.pool, subject)
            .await
            .map_err(backend)?
            .map(Assessment::try_from)
            .transpose()
    }

    async fn initialize_assessment(&self, subject: SubjectId) -> StorageResult<()> {
        let created = AssessmentRepo::initialize(&self.pool, subject)
            .await
            .map_err(backend)?;
        if created {
            tracing::info!(%subject, "Assessment created");
        }
        Ok(())
    }

    async fn get_step_data(
        &self,
        subject: SubjectId,
        step: u8,
    ) -> StorageResult<Option<StepRecord>> {
        StepRecordRepo::find(&self.pool, subject, i16::from(step))
            .await
            .map_err(backend)?
            .map(StepRecord::try_from)
            .transpose()
    }

    async fn completed_steps(&self, subject: SubjectId) -> StorageResult<BTreeSet<u8>> {
        StepRecordRepo::list_step_numbers(&self.pool, subject)
            .await
            .map_err(backend)?
            .into_iter()
            .map(|step| step_from_db("step_number", step))
            .collect()
    }

    async fn save_step_data(
        &self,
        subject: SubjectId,
        data: &StepData,
    ) -> StorageResult<StepRecord> {
        let row = StepRecordRepo::upsert(
            &self.pool,
            subject,
            i16::from(data.step_number()),
            &data.to_json(),
        )
        .await
        .map_err(backend)?;
        StepRecord::try_from(row)
    }

    async fn set_current_step(&self, subject: SubjectId, step: u8) -> StorageResult<()> {
        AssessmentRepo::set_current_step(&self.pool, subject, i16::from(step))
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn mark_terminal(
        &self,
        subject: SubjectId,
        outcome: Outcome,
        at_step: u8,
    ) -> StorageResult<bool> {
        AssessmentRepo::mark_terminal(&self.pool, subject, outcome, i16::from(at_step))
            .await
            .map_err(backend)
    }

    async fn record_decision(&self, decision: &Decision) -> StorageResult<()> {
        DecisionRepo::insert(&self.pool, decision)
            .await
            .map_err(backend)
    }

    /// Record and pointer are written in one transaction, so a failure
    /// leaves neither behind.
    async fn complete_step(
        &self,
        subject: SubjectId,
        data: &StepData,
        next_step: u8,
    ) -> StorageResult<bool> {
        StepRecordRepo::save_and_advance(
            &self.pool,
            subject,
            i16::from(data.step_number()),
            &data.to_json(),
            i16::from(next_step),
        )
        .await
        .map_err(backend)?;
        Ok(true)
    }
}

/// Candidate and HR admin profiles stored in PostgreSQL.
#[derive(Clone)]
pub struct PgProfiles {
    pool: DbPool,
}

impl PgProfiles {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfiles {
    async fn candidate_profile(
        &self,
        candidate_id: DbId,
    ) -> StorageResult<Option<CandidateProfile>> {
        Ok(ProfileRepo::find_candidate(&self.pool, candidate_id)
            .await
            .map_err(backend)?
            .map(CandidateProfile::from))
    }

    async fn hr_admin_profile(&self, hr_id: DbId) -> StorageResult<Option<HrAdminProfile>> {
        Ok(ProfileRepo::find_hr_admin(&self.pool, hr_id)
            .await
            .map_err(backend)?
            .map(HrAdminProfile::from))
    }
}
