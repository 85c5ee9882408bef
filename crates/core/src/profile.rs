//! Read-only profile reference data used as the lowest-priority autofill tier.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::gateway::StorageResult;
use crate::types::{Date, DbId, SubjectId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: DbId,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrAdminProfile {
    pub id: DbId,
    pub full_name: String,
    pub company_name: String,
}

/// Lookup of candidate and HR admin profiles.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn candidate_profile(&self, candidate_id: DbId)
        -> StorageResult<Option<CandidateProfile>>;

    async fn hr_admin_profile(&self, hr_id: DbId) -> StorageResult<Option<HrAdminProfile>>;
}

/// Profile-derived defaults passed explicitly into aggregation and prefill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileContext {
    pub candidate_name: Option<String>,
    pub hr_admin_name: Option<String>,
    pub company_name: Option<String>,
    pub today: Option<Date>,
}

impl ProfileContext {
    /// A context carrying only the current date.
    pub fn dated(today: Date) -> Self {
        Self {
            today: Some(today),
            ..Default::default()
        }
    }

    /// Build a context for a subject. A failed lookup leaves its fields empty.
    pub async fn load(directory: &dyn ProfileDirectory, subject: SubjectId, today: Date) -> Self {
        let candidate = match directory.candidate_profile(subject.candidate_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "Candidate profile lookup failed");
                None
            }
        };
        let admin = match directory.hr_admin_profile(subject.hr_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "HR admin profile lookup failed");
                None
            }
        };

        Self {
            candidate_name: candidate.map(|c| c.full_name),
            hr_admin_name: admin.as_ref().map(|a| a.full_name.clone()),
            company_name: admin.map(|a| a.company_name),
            today: Some(today),
        }
    }
}

/// In-memory [`ProfileDirectory`].
#[derive(Default)]
pub struct MemoryProfiles {
    candidates: RwLock<HashMap<DbId, CandidateProfile>>,
    admins: RwLock<HashMap<DbId, HrAdminProfile>>,
}

impl MemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_candidate(&self, profile: CandidateProfile) {
        self.candidates.write().await.insert(profile.id, profile);
    }

    pub async fn insert_hr_admin(&self, profile: HrAdminProfile) {
        self.admins.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl ProfileDirectory for MemoryProfiles {
    async fn candidate_profile(
        &self,
        candidate_id: DbId,
    ) -> StorageResult<Option<CandidateProfile>> {
        Ok(self.candidates.read().await.get(&candidate_id).cloned())
    }

    async fn hr_admin_profile(&self, hr_id: DbId) -> StorageResult<Option<HrAdminProfile>> {
        Ok(self.admins.read().await.get(&hr_id).cloned())
    }
}
