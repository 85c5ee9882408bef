//! Repository for the `assessments` table.

use fairchance_core::assessment::{AssessmentStatus, Outcome};
use fairchance_core::types::SubjectId;
use sqlx::PgPool;

use crate::models::assessment::AssessmentRow;

/// Column list for `assessments` queries.
const COLUMNS: &str = "id, hr_id, candidate_id, current_step, status, \
     completed_at_step, created_at, updated_at";

/// Pointer and status operations for assessments.
pub struct AssessmentRepo;

impl AssessmentRepo {
    /// Find the assessment for a subject.
    pub async fn find(
        pool: &PgPool,
        subject: SubjectId,
    ) -> Result<Option<AssessmentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assessments \
             WHERE hr_id = $1 AND candidate_id = $2"
        );
        sqlx::query_as::<_, AssessmentRow>(&query)
            .bind(subject.hr_id)
            .bind(subject.candidate_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert an assessment at step 1 unless one already exists.
    ///
    /// Returns `true` when a row was created.
    pub async fn initialize(pool: &PgPool, subject: SubjectId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO assessments (hr_id, candidate_id, current_step, status) \
             VALUES ($1, $2, 1, $3) \
             ON CONFLICT (hr_id, candidate_id) DO NOTHING",
        )
        .bind(subject.hr_id)
        .bind(subject.candidate_id)
        .bind(AssessmentStatus::InProgress.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move the step pointer forward, creating the assessment if needed.
    ///
    /// A concluded assessment, or a pointer already at or past `step`, is
    /// left unchanged and `None` is returned.
    pub async fn set_current_step(
        pool: &PgPool,
        subject: SubjectId,
        step: i16,
    ) -> Result<Option<AssessmentRow>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::set_current_step_on(&mut conn, subject, step).await
    }

    /// [`set_current_step`](Self::set_current_step) on an open connection
    /// or transaction.
    pub async fn set_current_step_on(
        conn: &mut sqlx::PgConnection,
        subject: SubjectId,
        step: i16,
    ) -> Result<Option<AssessmentRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO assessments (hr_id, candidate_id, current_step, status) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (hr_id, candidate_id) DO UPDATE \
             SET current_step = EXCLUDED.current_step \
             WHERE assessments.status NOT IN ('hired', 'revoked') \
               AND assessments.current_step < EXCLUDED.current_step \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssessmentRow>(&query)
            .bind(subject.hr_id)
            .bind(subject.candidate_id)
            .bind(step)
            .bind(AssessmentStatus::InProgress.as_str())
            .fetch_optional(conn)
            .await
    }

    /// Move a non-terminal assessment to `outcome`, creating it if needed.
    ///
    /// Returns `true` only when this call changed the status.
    pub async fn mark_terminal(
        pool: &PgPool,
        subject: SubjectId,
        outcome: Outcome,
        at_step: i16,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO assessments (hr_id, candidate_id, current_step, status) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (hr_id, candidate_id) DO NOTHING",
        )
        .bind(subject.hr_id)
        .bind(subject.candidate_id)
        .bind(at_step)
        .bind(AssessmentStatus::InProgress.as_str())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE assessments SET status = $3, completed_at_step = $4 \
             WHERE hr_id = $1 AND candidate_id = $2 \
               AND status NOT IN ('hired', 'revoked')",
        )
        .bind(subject.hr_id)
        .bind(subject.candidate_id)
        .bind(outcome.as_str())
        .bind(at_step)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
