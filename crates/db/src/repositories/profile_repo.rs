//! Repository for the `candidate_profiles` and `hr_admin_profiles` tables.

use fairchance_core::types::DbId;
use sqlx::PgPool;

use crate::models::profile::{
    CandidateProfileRow, CreateCandidateProfile, CreateHrAdminProfile, HrAdminProfileRow,
};

const CANDIDATE_COLUMNS: &str = "id, full_name, created_at, updated_at";
const HR_ADMIN_COLUMNS: &str = "id, full_name, company_name, created_at, updated_at";

/// Profile lookups and inserts.
pub struct ProfileRepo;

impl ProfileRepo {
    pub async fn find_candidate(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CandidateProfileRow>, sqlx::Error> {
        let query = format!("SELECT {CANDIDATE_COLUMNS} FROM candidate_profiles WHERE id = $1");
        sqlx::query_as::<_, CandidateProfileRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_hr_admin(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<HrAdminProfileRow>, sqlx::Error> {
        let query = format!("SELECT {HR_ADMIN_COLUMNS} FROM hr_admin_profiles WHERE id = $1");
        sqlx::query_as::<_, HrAdminProfileRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_candidate(
        pool: &PgPool,
        input: &CreateCandidateProfile,
    ) -> Result<CandidateProfileRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO candidate_profiles (full_name) VALUES ($1) \
             RETURNING {CANDIDATE_COLUMNS}"
        );
        sqlx::query_as::<_, CandidateProfileRow>(&query)
            .bind(&input.full_name)
            .fetch_one(pool)
            .await
    }

    pub async fn create_hr_admin(
        pool: &PgPool,
        input: &CreateHrAdminProfile,
    ) -> Result<HrAdminProfileRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO hr_admin_profiles (full_name, company_name) VALUES ($1, $2) \
             RETURNING {HR_ADMIN_COLUMNS}"
        );
        sqlx::query_as::<_, HrAdminProfileRow>(&query)
            .bind(&input.full_name)
            .bind(&input.company_name)
            .fetch_one(pool)
            .await
    }
}
