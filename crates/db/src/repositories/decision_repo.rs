//! Repository for the `assessment_decisions` table.

use fairchance_core::assessment::Decision;
use fairchance_core::types::SubjectId;
use sqlx::PgPool;

use crate::models::decision::DecisionRow;

/// Column list for `assessment_decisions` queries.
const COLUMNS: &str = "id, hr_id, candidate_id, decision_type, at_step, \
     hr_admin_name, company_name, sent_at, created_at, updated_at";

/// Decision letters sent at the end of an assessment.
pub struct DecisionRepo;

impl DecisionRepo {
    /// Record a decision. A subject keeps its first decision; later inserts
    /// are ignored.
    pub async fn insert(pool: &PgPool, decision: &Decision) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO assessment_decisions \
                (hr_id, candidate_id, decision_type, at_step, hr_admin_name, company_name, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (hr_id, candidate_id) DO NOTHING",
        )
        .bind(decision.subject.hr_id)
        .bind(decision.subject.candidate_id)
        .bind(decision.decision_type.as_str())
        .bind(i16::from(decision.at_step))
        .bind(&decision.hr_admin_name)
        .bind(&decision.company_name)
        .bind(decision.sent_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find the decision recorded for a subject.
    pub async fn find(
        pool: &PgPool,
        subject: SubjectId,
    ) -> Result<Option<DecisionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assessment_decisions \
             WHERE hr_id = $1 AND candidate_id = $2"
        );
        sqlx::query_as::<_, DecisionRow>(&query)
            .bind(subject.hr_id)
            .bind(subject.candidate_id)
            .fetch_optional(pool)
            .await
    }
}
