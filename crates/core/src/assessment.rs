//! Assessment status, step numbering, and terminal decisions.
//!
//! An assessment is the per-(HR admin, candidate) record of where the Fair
//! Chance individualized-assessment process stands. The step graph is fixed:
//! five form steps followed by a terminal "Complete" node, with a hire
//! decision available as a side exit from steps 2 through 5.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{SubjectId, Timestamp};

// ---------------------------------------------------------------------------
// Assessment status
// ---------------------------------------------------------------------------

/// Lifecycle status of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    NotStarted,
    InProgress,
    Hired,
    Revoked,
}

impl AssessmentStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "hired" => Ok(Self::Hired),
            "revoked" => Ok(Self::Revoked),
            _ => Err(CoreError::Validation(format!(
                "Invalid assessment status '{s}'. Must be one of: \
                 not_started, in_progress, hired, revoked"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Hired => "hired",
            Self::Revoked => "revoked",
        }
    }

    /// The terminal outcome this status represents, if any.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            Self::Hired => Some(Outcome::Hired),
            Self::Revoked => Some(Outcome::Revoked),
            Self::NotStarted | Self::InProgress => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.outcome().is_some()
    }
}

/// Terminal result of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Hired,
    Revoked,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }

    /// The assessment status an outcome moves the row to.
    pub fn status(self) -> AssessmentStatus {
        match self {
            Self::Hired => AssessmentStatus::Hired,
            Self::Revoked => AssessmentStatus::Revoked,
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The six nodes of the assessment process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStep {
    ConditionalOffer,
    IndividualAssessment,
    PreliminaryRevocation,
    Reassessment,
    FinalRevocation,
    Complete,
}

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 6;

/// Last step that carries a form; step 6 only displays the outcome.
pub const LAST_FORM_STEP: u8 = 5;

/// First step from which the hire decision may be declared.
pub const FIRST_HIRE_STEP: u8 = 2;

impl AssessmentStep {
    /// Convert a 1-based step number to an `AssessmentStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::ConditionalOffer),
            2 => Ok(Self::IndividualAssessment),
            3 => Ok(Self::PreliminaryRevocation),
            4 => Ok(Self::Reassessment),
            5 => Ok(Self::FinalRevocation),
            6 => Ok(Self::Complete),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::ConditionalOffer => 1,
            Self::IndividualAssessment => 2,
            Self::PreliminaryRevocation => 3,
            Self::Reassessment => 4,
            Self::FinalRevocation => 5,
            Self::Complete => 6,
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::ConditionalOffer => "Conditional Offer",
            Self::IndividualAssessment => "Individualized Assessment",
            Self::PreliminaryRevocation => "Preliminary Notice of Revocation",
            Self::Reassessment => "Individualized Reassessment",
            Self::FinalRevocation => "Final Notice of Revocation",
            Self::Complete => "Complete",
        }
    }

    /// The step that follows this one on the revocation track.
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.to_number() + 1).ok()
    }

    /// Whether the hire side exit is offered while on this step.
    pub fn allows_hire(self) -> bool {
        (FIRST_HIRE_STEP..=LAST_FORM_STEP).contains(&self.to_number())
    }
}

/// Validate that a step number is within the valid range.
pub fn validate_step_number(step: u8) -> Result<(), CoreError> {
    if !(MIN_STEP..=MAX_STEP).contains(&step) {
        return Err(CoreError::Validation(format!(
            "Step {step} is out of range ({MIN_STEP}..{MAX_STEP})"
        )));
    }
    Ok(())
}

/// Validate that a step number names a step with a form.
pub fn validate_form_step(step: u8) -> Result<(), CoreError> {
    if !(MIN_STEP..=LAST_FORM_STEP).contains(&step) {
        return Err(CoreError::Validation(format!(
            "Step {step} has no form ({MIN_STEP}..{LAST_FORM_STEP})"
        )));
    }
    Ok(())
}

/// Validate a pointer move. The pointer never moves backwards and never
/// skips a step.
pub fn validate_step_transition(current: u8, next: u8) -> Result<(), CoreError> {
    validate_step_number(current)?;
    validate_step_number(next)?;
    if next != current + 1 {
        return Err(CoreError::Validation(format!(
            "Cannot transition from step {current} to step {next}. \
             Must advance exactly one step."
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Assessment row
// ---------------------------------------------------------------------------

/// Durable state of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub subject: SubjectId,
    pub current_step: u8,
    pub status: AssessmentStatus,
    pub completed_at_step: Option<u8>,
    pub updated_at: Timestamp,
}

impl Assessment {
    /// A fresh assessment at step 1.
    pub fn started(subject: SubjectId, now: Timestamp) -> Self {
        Self {
            subject,
            current_step: MIN_STEP,
            status: AssessmentStatus::InProgress,
            completed_at_step: None,
            updated_at: now,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.status.outcome()
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Kind of decision letter sent to the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Hire,
    Revoke,
}

impl DecisionType {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "hire" => Ok(Self::Hire),
            "revoke" => Ok(Self::Revoke),
            _ => Err(CoreError::Validation(format!(
                "Invalid decision type '{s}'. Must be one of: hire, revoke"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hire => "hire",
            Self::Revoke => "revoke",
        }
    }

    pub fn outcome(self) -> Outcome {
        match self {
            Self::Hire => Outcome::Hired,
            Self::Revoke => Outcome::Revoked,
        }
    }
}

impl From<Outcome> for DecisionType {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Hired => Self::Hire,
            Outcome::Revoked => Self::Revoke,
        }
    }
}

/// Out-of-band terminal event recorded when a hire or revocation is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub subject: SubjectId,
    pub decision_type: DecisionType,
    pub at_step: u8,
    pub hr_admin_name: String,
    pub company_name: String,
    pub sent_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_str_valid() {
        for status in [
            AssessmentStatus::NotStarted,
            AssessmentStatus::InProgress,
            AssessmentStatus::Hired,
            AssessmentStatus::Revoked,
        ] {
            assert_eq!(AssessmentStatus::from_str_db(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_from_str_invalid() {
        assert!(AssessmentStatus::from_str_db("completed").is_err());
        assert!(AssessmentStatus::from_str_db("").is_err());
    }

    #[test]
    fn only_hired_and_revoked_are_terminal() {
        assert!(!AssessmentStatus::NotStarted.is_terminal());
        assert!(!AssessmentStatus::InProgress.is_terminal());
        assert_eq!(AssessmentStatus::Hired.outcome(), Some(Outcome::Hired));
        assert_eq!(AssessmentStatus::Revoked.outcome(), Some(Outcome::Revoked));
    }

    #[test]
    fn step_number_roundtrip() {
        for n in MIN_STEP..=MAX_STEP {
            let step = AssessmentStep::from_number(n).unwrap();
            assert_eq!(step.to_number(), n);
            assert!(!step.label().is_empty());
        }
    }

    #[test]
    fn step_from_number_invalid() {
        assert!(AssessmentStep::from_number(0).is_err());
        assert!(AssessmentStep::from_number(7).is_err());
    }

    #[test]
    fn complete_has_no_next_step() {
        assert_eq!(
            AssessmentStep::FinalRevocation.next(),
            Some(AssessmentStep::Complete)
        );
        assert_eq!(AssessmentStep::Complete.next(), None);
    }

    #[test]
    fn hire_offered_from_steps_two_through_five() {
        let offered: Vec<u8> = (MIN_STEP..=MAX_STEP)
            .filter(|n| AssessmentStep::from_number(*n).unwrap().allows_hire())
            .collect();
        assert_eq!(offered, vec![2, 3, 4, 5]);
    }

    #[test]
    fn transition_forward_by_one_is_valid() {
        for current in MIN_STEP..MAX_STEP {
            assert!(validate_step_transition(current, current + 1).is_ok());
        }
    }

    #[test]
    fn transition_backward_or_skip_is_invalid() {
        assert!(validate_step_transition(3, 2).is_err());
        assert!(validate_step_transition(1, 3).is_err());
        assert!(validate_step_transition(2, 2).is_err());
        assert!(validate_step_transition(6, 7).is_err());
    }

    #[test]
    fn form_steps_exclude_complete() {
        assert!(validate_form_step(5).is_ok());
        assert!(validate_form_step(6).is_err());
        assert!(validate_form_step(0).is_err());
    }

    #[test]
    fn decision_type_maps_to_outcome() {
        assert_eq!(DecisionType::from(Outcome::Hired), DecisionType::Hire);
        assert_eq!(DecisionType::Revoke.outcome(), Outcome::Revoked);
        assert_eq!(DecisionType::from_str_db("hire").unwrap(), DecisionType::Hire);
        assert!(DecisionType::from_str_db("reject").is_err());
    }
}
