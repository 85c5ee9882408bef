//! Decision letter row model.

use fairchance_core::assessment::{Decision, DecisionType};
use fairchance_core::gateway::StorageError;
use fairchance_core::types::{DbId, SubjectId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::step_from_db;

/// A row from the `assessment_decisions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DecisionRow {
    pub id: DbId,
    pub hr_id: DbId,
    pub candidate_id: DbId,
    pub decision_type: String,
    pub at_step: i16,
    pub hr_admin_name: String,
    pub company_name: String,
    pub sent_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<DecisionRow> for Decision {
    type Error = StorageError;

    fn try_from(row: DecisionRow) -> Result<Self, Self::Error> {
        let decision_type = DecisionType::from_str_db(&row.decision_type)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(Decision {
            subject: SubjectId::new(row.hr_id, row.candidate_id),
            decision_type,
            at_step: step_from_db("at_step", row.at_step)?,
            hr_admin_name: row.hr_admin_name,
            company_name: row.company_name,
            sent_at: row.sent_at,
        })
    }
}
