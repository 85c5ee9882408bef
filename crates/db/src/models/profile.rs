//! Candidate and HR admin profile models and DTOs.

use fairchance_core::profile::{CandidateProfile, HrAdminProfile};
use fairchance_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `candidate_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CandidateProfileRow {
    pub id: DbId,
    pub full_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a candidate profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCandidateProfile {
    pub full_name: String,
}

impl From<CandidateProfileRow> for CandidateProfile {
    fn from(row: CandidateProfileRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
        }
    }
}

/// A row from the `hr_admin_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HrAdminProfileRow {
    pub id: DbId,
    pub full_name: String,
    pub company_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an HR admin profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHrAdminProfile {
    pub full_name: String,
    pub company_name: String,
}

impl From<HrAdminProfileRow> for HrAdminProfile {
    fn from(row: HrAdminProfileRow) -> Self {
        Self {
            id: row.id,
            full_name: row.full_name,
            company_name: row.company_name,
        }
    }
}
