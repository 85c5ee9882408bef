//! Assessment row model.

use fairchance_core::assessment::{Assessment, AssessmentStatus};
use fairchance_core::gateway::StorageError;
use fairchance_core::types::{DbId, SubjectId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::step_from_db;

/// A row from the `assessments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssessmentRow {
    pub id: DbId,
    pub hr_id: DbId,
    pub candidate_id: DbId,
    pub current_step: i16,
    pub status: String,
    pub completed_at_step: Option<i16>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<AssessmentRow> for Assessment {
    type Error = StorageError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        let status = AssessmentStatus::from_str_db(&row.status)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(Assessment {
            subject: SubjectId::new(row.hr_id, row.candidate_id),
            current_step: step_from_db("current_step", row.current_step)?,
            status,
            completed_at_step: row
                .completed_at_step
                .map(|s| step_from_db("completed_at_step", s))
                .transpose()?,
            updated_at: row.updated_at,
        })
    }
}
