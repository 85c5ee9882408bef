//! Completion gates for each step's draft.
//!
//! Every gate is a pure predicate over the draft the admin is editing. A
//! `false` result simply keeps the send action disabled; nothing here
//! reads or writes storage.

use serde::{Deserialize, Serialize};

use crate::step_data::{
    has_entry, is_present, ConditionalOffer, FinalRevocation, IndividualAssessment,
    PreliminaryRevocation, Reassessment, ReassessmentDecision, Reconsideration, StepData,
};

/// Shortest response window a preliminary notice may give, in business days.
pub const MIN_BUSINESS_DAYS: u32 = 5;

/// Longest response window accepted, in business days.
pub const MAX_BUSINESS_DAYS: u32 = 365;

// ---------------------------------------------------------------------------
// Draft wrappers
// ---------------------------------------------------------------------------

/// Where the admin is within a multi-part form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStage {
    Part(u8),
    Preview,
}

impl Default for FormStage {
    fn default() -> Self {
        Self::Part(1)
    }
}

/// Step 4 opens on a time-remaining summary; the form itself is only shown
/// once the admin begins the reassessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassessmentPhase {
    #[default]
    TimeRemaining,
    ReassessmentForm,
}

/// The in-progress draft of whichever step is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDraft {
    ConditionalOffer {
        data: ConditionalOffer,
    },
    IndividualAssessment {
        #[serde(default)]
        stage: FormStage,
        data: IndividualAssessment,
    },
    PreliminaryRevocation {
        data: PreliminaryRevocation,
    },
    Reassessment {
        #[serde(default)]
        phase: ReassessmentPhase,
        data: Reassessment,
    },
    FinalRevocation {
        data: FinalRevocation,
    },
    Complete,
}

impl StepDraft {
    pub fn step_number(&self) -> u8 {
        match self {
            Self::ConditionalOffer { .. } => 1,
            Self::IndividualAssessment { .. } => 2,
            Self::PreliminaryRevocation { .. } => 3,
            Self::Reassessment { .. } => 4,
            Self::FinalRevocation { .. } => 5,
            Self::Complete => 6,
        }
    }

    /// The payload that would be persisted on send.
    pub fn to_step_data(&self) -> Option<StepData> {
        match self {
            Self::ConditionalOffer { data } => Some(StepData::ConditionalOffer(data.clone())),
            Self::IndividualAssessment { data, .. } => {
                Some(StepData::IndividualAssessment(data.clone()))
            }
            Self::PreliminaryRevocation { data } => {
                Some(StepData::PreliminaryRevocation(data.clone()))
            }
            Self::Reassessment { data, .. } => Some(StepData::Reassessment(data.clone())),
            Self::FinalRevocation { data } => Some(StepData::FinalRevocation(data.clone())),
            Self::Complete => None,
        }
    }

    /// Wrap a hydrated payload as a fresh draft. Multi-stage steps start at
    /// their first stage.
    pub fn from_step_data(data: StepData) -> Self {
        match data {
            StepData::ConditionalOffer(data) => Self::ConditionalOffer { data },
            StepData::IndividualAssessment(data) => Self::IndividualAssessment {
                stage: FormStage::default(),
                data,
            },
            StepData::PreliminaryRevocation(data) => Self::PreliminaryRevocation { data },
            StepData::Reassessment(data) => Self::Reassessment {
                phase: ReassessmentPhase::default(),
                data,
            },
            StepData::FinalRevocation(data) => Self::FinalRevocation { data },
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Whether the send action for this draft is enabled.
pub fn is_ready(draft: &StepDraft) -> bool {
    match draft {
        StepDraft::ConditionalOffer { data } => is_step1_complete(data),
        StepDraft::IndividualAssessment { stage, data } => is_step2_complete(*stage, data),
        StepDraft::PreliminaryRevocation { data } => is_step3_complete(data),
        StepDraft::Reassessment { phase, data } => is_step4_complete(*phase, data),
        StepDraft::FinalRevocation { data } => is_step5_complete(data),
        StepDraft::Complete => false,
    }
}

/// Required fields still blank, in form order.
pub fn missing_fields(draft: &StepDraft) -> Vec<&'static str> {
    match draft {
        StepDraft::ConditionalOffer { data } => step1_missing(data),
        StepDraft::IndividualAssessment { stage, data } => step2_missing(*stage, data),
        StepDraft::PreliminaryRevocation { data } => step3_missing(data),
        StepDraft::Reassessment { phase, data } => step4_missing(*phase, data),
        StepDraft::FinalRevocation { data } => step5_missing(data),
        StepDraft::Complete => vec!["complete"],
    }
}

/// Collect the names whose value is blank.
fn blanks(fields: &[(&'static str, &str)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, value)| !is_present(value))
        .map(|(name, _)| *name)
        .collect()
}

// ---------------------------------------------------------------------------
// Step 1
// ---------------------------------------------------------------------------

pub fn is_step1_complete(d: &ConditionalOffer) -> bool {
    match d.offer_extended {
        None => false,
        Some(true) => true,
        Some(false) => {
            is_present(&d.date)
                && is_present(&d.applicant)
                && is_present(&d.position)
                && is_present(&d.employer)
        }
    }
}

fn step1_missing(d: &ConditionalOffer) -> Vec<&'static str> {
    match d.offer_extended {
        None => vec!["offer_extended"],
        Some(true) => Vec::new(),
        Some(false) => blanks(&[
            ("date", d.date.as_str()),
            ("applicant", d.applicant.as_str()),
            ("position", d.position.as_str()),
            ("employer", d.employer.as_str()),
        ]),
    }
}

// ---------------------------------------------------------------------------
// Step 2
// ---------------------------------------------------------------------------

/// The worksheet can be sent once its preview is open and it says something.
pub fn is_step2_complete(stage: FormStage, d: &IndividualAssessment) -> bool {
    stage == FormStage::Preview && !StepData::IndividualAssessment(d.clone()).is_blank()
}

fn step2_missing(stage: FormStage, d: &IndividualAssessment) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if stage != FormStage::Preview {
        missing.push("preview");
    }
    if StepData::IndividualAssessment(d.clone()).is_blank() {
        missing.push("assessment");
    }
    missing
}

// ---------------------------------------------------------------------------
// Step 3
// ---------------------------------------------------------------------------

/// Parse the notice window, accepting surrounding whitespace only.
///
/// Trailing text is rejected, so `"7 days"` does not parse; the form's
/// field is numeric and a bare count is all it submits.
pub fn parse_business_days(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok()
}

pub fn step3_part1_complete(d: &PreliminaryRevocation) -> bool {
    is_present(&d.applicant_name)
        && is_present(&d.position)
        && is_present(&d.contact_name)
        && is_present(&d.company_name)
        && is_present(&d.address)
        && is_present(&d.phone)
        && is_present(&d.date)
}

pub fn step3_part2_complete(d: &PreliminaryRevocation) -> bool {
    has_entry(&d.convictions)
        && is_present(&d.conduct_time_ago)
        && is_present(&d.sentence_completed_time_ago)
}

pub fn step3_part3_complete(d: &PreliminaryRevocation) -> bool {
    is_present(&d.job_duties) && is_present(&d.seriousness_reason) && is_present(&d.revocation_reason)
}

pub fn step3_part4_complete(d: &PreliminaryRevocation) -> bool {
    parse_business_days(&d.business_days)
        .is_some_and(|days| (MIN_BUSINESS_DAYS..=MAX_BUSINESS_DAYS).contains(&days))
}

pub fn is_step3_complete(d: &PreliminaryRevocation) -> bool {
    step3_part1_complete(d)
        && step3_part2_complete(d)
        && step3_part3_complete(d)
        && step3_part4_complete(d)
}

fn step3_missing(d: &PreliminaryRevocation) -> Vec<&'static str> {
    let mut missing = blanks(&[
        ("applicant_name", d.applicant_name.as_str()),
        ("position", d.position.as_str()),
        ("contact_name", d.contact_name.as_str()),
        ("company_name", d.company_name.as_str()),
        ("address", d.address.as_str()),
        ("phone", d.phone.as_str()),
        ("date", d.date.as_str()),
    ]);
    if !has_entry(&d.convictions) {
        missing.push("convictions");
    }
    missing.extend(blanks(&[
        ("conduct_time_ago", d.conduct_time_ago.as_str()),
        ("sentence_completed_time_ago", d.sentence_completed_time_ago.as_str()),
        ("job_duties", d.job_duties.as_str()),
        ("seriousness_reason", d.seriousness_reason.as_str()),
        ("revocation_reason", d.revocation_reason.as_str()),
    ]));
    if !step3_part4_complete(d) {
        missing.push("business_days");
    }
    missing
}

// ---------------------------------------------------------------------------
// Step 4
// ---------------------------------------------------------------------------

pub fn is_step4_complete(phase: ReassessmentPhase, d: &Reassessment) -> bool {
    if phase != ReassessmentPhase::ReassessmentForm {
        return false;
    }
    match d.decision {
        None => false,
        Some(ReassessmentDecision::Extend) => true,
        Some(ReassessmentDecision::Rescind) => is_present(&d.rescind_reason),
    }
}

fn step4_missing(phase: ReassessmentPhase, d: &Reassessment) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if phase != ReassessmentPhase::ReassessmentForm {
        missing.push("reassessment_form");
    }
    match d.decision {
        None => missing.push("decision"),
        Some(ReassessmentDecision::Rescind) if !is_present(&d.rescind_reason) => {
            missing.push("rescind_reason")
        }
        Some(_) => {}
    }
    missing
}

// ---------------------------------------------------------------------------
// Step 5
// ---------------------------------------------------------------------------

pub fn step5_part1_complete(d: &FinalRevocation) -> bool {
    is_present(&d.date) && is_present(&d.applicant) && is_present(&d.date_of_notice)
}

pub fn step5_part2_complete(d: &FinalRevocation) -> bool {
    has_entry(&d.convictions)
}

pub fn step5_part3_complete(d: &FinalRevocation) -> bool {
    is_present(&d.position)
        && has_entry(&d.job_duties)
        && is_present(&d.time_since_conduct)
        && is_present(&d.time_since_sentence)
        && is_present(&d.serious_reason)
}

pub fn step5_part4_complete(d: &FinalRevocation) -> bool {
    let procedure_ok = d.reconsideration != Some(Reconsideration::Procedure)
        || is_present(&d.reconsideration_procedure);
    is_present(&d.fitness_reason)
        && is_present(&d.contact_name)
        && is_present(&d.company_name)
        && procedure_ok
}

pub fn is_step5_complete(d: &FinalRevocation) -> bool {
    step5_part1_complete(d)
        && step5_part2_complete(d)
        && step5_part3_complete(d)
        && step5_part4_complete(d)
}

fn step5_missing(d: &FinalRevocation) -> Vec<&'static str> {
    let mut missing = blanks(&[
        ("date", d.date.as_str()),
        ("applicant", d.applicant.as_str()),
        ("date_of_notice", d.date_of_notice.as_str()),
    ]);
    if !has_entry(&d.convictions) {
        missing.push("convictions");
    }
    if !is_present(&d.position) {
        missing.push("position");
    }
    if !has_entry(&d.job_duties) {
        missing.push("job_duties");
    }
    missing.extend(blanks(&[
        ("time_since_conduct", d.time_since_conduct.as_str()),
        ("time_since_sentence", d.time_since_sentence.as_str()),
        ("serious_reason", d.serious_reason.as_str()),
        ("fitness_reason", d.fitness_reason.as_str()),
        ("contact_name", d.contact_name.as_str()),
        ("company_name", d.company_name.as_str()),
    ]));
    if d.reconsideration == Some(Reconsideration::Procedure)
        && !is_present(&d.reconsideration_procedure)
    {
        missing.push("reconsideration_procedure");
    }
    missing
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
