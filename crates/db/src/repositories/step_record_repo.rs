//! Repository for the `assessment_steps` table.

use fairchance_core::types::SubjectId;
use sqlx::PgPool;

use super::AssessmentRepo;
use crate::models::step_record::StepRecordRow;

/// Column list for `assessment_steps` queries.
const COLUMNS: &str = "id, hr_id, candidate_id, step_number, step_data, \
     completed_at, created_at, updated_at";

/// Upsert statement shared by the standalone and transactional saves.
fn upsert_query() -> String {
    format!(
        "INSERT INTO assessment_steps (hr_id, candidate_id, step_number, step_data) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (hr_id, candidate_id, step_number) DO UPDATE \
         SET step_data = EXCLUDED.step_data, completed_at = NOW() \
         RETURNING {COLUMNS}"
    )
}

/// Read and write the per-step payloads.
pub struct StepRecordRepo;

impl StepRecordRepo {
    /// Find the record for one step.
    pub async fn find(
        pool: &PgPool,
        subject: SubjectId,
        step_number: i16,
    ) -> Result<Option<StepRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assessment_steps \
             WHERE hr_id = $1 AND candidate_id = $2 AND step_number = $3"
        );
        sqlx::query_as::<_, StepRecordRow>(&query)
            .bind(subject.hr_id)
            .bind(subject.candidate_id)
            .bind(step_number)
            .fetch_optional(pool)
            .await
    }

    /// Step numbers that have a record, ascending.
    pub async fn list_step_numbers(
        pool: &PgPool,
        subject: SubjectId,
    ) -> Result<Vec<i16>, sqlx::Error> {
        let rows: Vec<(i16,)> = sqlx::query_as(
            "SELECT step_number FROM assessment_steps \
             WHERE hr_id = $1 AND candidate_id = $2 \
             ORDER BY step_number",
        )
        .bind(subject.hr_id)
        .bind(subject.candidate_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(step,)| step).collect())
    }

    /// Insert or replace the record for a step.
    pub async fn upsert(
        pool: &PgPool,
        subject: SubjectId,
        step_number: i16,
        step_data: &serde_json::Value,
    ) -> Result<StepRecordRow, sqlx::Error> {
        sqlx::query_as::<_, StepRecordRow>(&upsert_query())
            .bind(subject.hr_id)
            .bind(subject.candidate_id)
            .bind(step_number)
            .bind(step_data)
            .fetch_one(pool)
            .await
    }

    /// Save a step's record and move the pointer to `next_step` in one
    /// transaction.
    pub async fn save_and_advance(
        pool: &PgPool,
        subject: SubjectId,
        step_number: i16,
        step_data: &serde_json::Value,
        next_step: i16,
    ) -> Result<StepRecordRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let record = sqlx::query_as::<_, StepRecordRow>(&upsert_query())
            .bind(subject.hr_id)
            .bind(subject.candidate_id)
            .bind(step_number)
            .bind(step_data)
            .fetch_one(&mut *tx)
            .await?;

        AssessmentRepo::set_current_step_on(&mut tx, subject, next_step).await?;

        tx.commit().await?;
        Ok(record)
    }
}
