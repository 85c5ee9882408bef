//! Step record row model.

use fairchance_core::gateway::StorageError;
use fairchance_core::step_data::{StepData, StepRecord};
use fairchance_core::types::{DbId, SubjectId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::step_from_db;

/// A row from the `assessment_steps` table.
///
/// `step_data` holds the step's payload without its tag; the step number
/// column says which schema it follows.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepRecordRow {
    pub id: DbId,
    pub hr_id: DbId,
    pub candidate_id: DbId,
    pub step_number: i16,
    pub step_data: serde_json::Value,
    pub completed_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<StepRecordRow> for StepRecord {
    type Error = StorageError;

    fn try_from(row: StepRecordRow) -> Result<Self, Self::Error> {
        let step_number = step_from_db("step_number", row.step_number)?;
        Ok(StepRecord {
            subject: SubjectId::new(row.hr_id, row.candidate_id),
            step_number,
            step_data: StepData::from_json(step_number, row.step_data)?,
            completed_at: row.completed_at,
        })
    }
}
