//! Cross-step suggestion aggregation.
//!
//! Later forms are pre-filled from what earlier steps already captured.
//! Aggregation only reads: it never writes a step record, and a missing or
//! unreadable record simply contributes nothing.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::assessment::MAX_STEP;
use crate::gateway::PersistenceGateway;
use crate::profile::ProfileContext;
use crate::step_data::{
    ConditionalOffer, FieldMap, IndividualAssessment, PreliminaryRevocation, StepData, StepRecord,
};
use crate::types::{format_date, SubjectId};

/// Field names filled from the candidate's profile.
pub const CANDIDATE_NAME_FIELDS: &[&str] = &["applicant", "applicant_name"];

/// Field names filled from the HR admin's profile.
pub const HR_ADMIN_NAME_FIELDS: &[&str] = &["contact_name"];

/// Field names filled from the HR admin's company.
pub const COMPANY_FIELDS: &[&str] = &["company_name", "employer"];

/// Field filled with the current date.
pub const DATE_FIELD: &str = "date";

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

/// Merged `field -> value` suggestions for pre-filling a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Suggestions(FieldMap);

impl Suggestions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|v| v.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.0
    }

    /// Overlay a step's filled fields; they replace same-named entries.
    pub fn merge_step(&mut self, data: &StepData) {
        self.0.extend(data.fields());
    }

    /// Fill profile-derived defaults where no step supplied a value.
    pub fn with_profile_defaults(mut self, profile: &ProfileContext) -> Self {
        let tiers: [(&[&str], Option<&String>); 3] = [
            (CANDIDATE_NAME_FIELDS, profile.candidate_name.as_ref()),
            (HR_ADMIN_NAME_FIELDS, profile.hr_admin_name.as_ref()),
            (COMPANY_FIELDS, profile.company_name.as_ref()),
        ];
        for (fields, value) in tiers {
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            for field in fields {
                self.0
                    .entry((*field).to_string())
                    .or_insert_with(|| serde_json::Value::String(value.clone()));
            }
        }
        if let Some(today) = profile.today {
            self.0
                .entry(DATE_FIELD.to_string())
                .or_insert_with(|| serde_json::Value::String(format_date(today)));
        }
        self
    }
}

/// Merge payloads in the order given; later payloads win on shared names.
pub fn merge_records<'a>(records: impl IntoIterator<Item = &'a StepData>) -> Suggestions {
    let mut suggestions = Suggestions::new();
    for data in records {
        suggestions.merge_step(data);
    }
    suggestions
}

// ---------------------------------------------------------------------------
// Initial assessment summary
// ---------------------------------------------------------------------------

/// Steps 1–3 as captured, shown read-only beside the reassessment form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialAssessmentSummary {
    pub conditional_offer: Option<ConditionalOffer>,
    pub individual_assessment: Option<IndividualAssessment>,
    pub preliminary_revocation: Option<PreliminaryRevocation>,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Collects prior-step data for one assessment.
#[derive(Clone)]
pub struct StepDataAggregator {
    gateway: Arc<dyn PersistenceGateway>,
}

impl StepDataAggregator {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// Fetch steps `1..upto_exclusive` concurrently, in step order.
    ///
    /// Unreadable records are logged and reported as absent.
    pub async fn prior_records(
        &self,
        subject: SubjectId,
        upto_exclusive: u8,
    ) -> Vec<Option<StepRecord>> {
        let last = upto_exclusive.min(MAX_STEP);
        let reads = (1..last).map(|step| {
            let gateway = Arc::clone(&self.gateway);
            async move {
                match gateway.get_step_data(subject, step).await {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!(
                            %subject,
                            step,
                            error = %e,
                            "Prior step unreadable; treating as empty"
                        );
                        None
                    }
                }
            }
        });
        join_all(reads).await
    }

    /// Union of every prior step's filled fields; the closest step wins.
    pub async fn collect_suggestions(&self, subject: SubjectId, upto_exclusive: u8) -> Suggestions {
        let records = self.prior_records(subject, upto_exclusive).await;
        let suggestions = merge_records(records.iter().flatten().map(|r| &r.step_data));

        tracing::debug!(
            %subject,
            upto_exclusive,
            fields = suggestions.len(),
            "Collected step suggestions"
        );
        suggestions
    }

    /// [`collect_suggestions`](Self::collect_suggestions) plus profile defaults.
    pub async fn collect_suggestions_with_profile(
        &self,
        subject: SubjectId,
        upto_exclusive: u8,
        profile: &ProfileContext,
    ) -> Suggestions {
        self.collect_suggestions(subject, upto_exclusive)
            .await
            .with_profile_defaults(profile)
    }

    /// The reference panel for step 4. Never merged into the step 4 draft.
    pub async fn initial_assessment_summary(&self, subject: SubjectId) -> InitialAssessmentSummary {
        let mut summary = InitialAssessmentSummary::default();
        for record in self.prior_records(subject, 4).await.into_iter().flatten() {
            match record.step_data {
                StepData::ConditionalOffer(d) => summary.conditional_offer = Some(d),
                StepData::IndividualAssessment(d) => summary.individual_assessment = Some(d),
                StepData::PreliminaryRevocation(d) => summary.preliminary_revocation = Some(d),
                StepData::Reassessment(_) | StepData::FinalRevocation(_) => {}
            }
        }
        summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
