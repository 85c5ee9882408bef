//! Per-step form schemas and the persisted step record.
//!
//! Each form step stores a differently-shaped JSON object. [`StepData`]
//! is the tagged union over those shapes; the database keeps only the inner
//! payload and relies on the row's step number as the discriminator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assessment::{validate_form_step, AssessmentStep};
use crate::error::CoreError;
use crate::gateway::StorageError;
use crate::types::{SubjectId, Timestamp};

/// Flattened `field name -> value` view of a payload.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Step 1: conditional offer
// ---------------------------------------------------------------------------

/// Step 1. Whether a conditional offer was already extended, and the offer
/// letter to generate when it was not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionalOffer {
    pub offer_extended: Option<bool>,
    pub date: String,
    pub applicant: String,
    pub position: String,
    pub employer: String,
}

// ---------------------------------------------------------------------------
// Step 2: individualized assessment
// ---------------------------------------------------------------------------

/// Step 2. The five-part individualized assessment worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndividualAssessment {
    // Part 1: the conduct
    pub conduct_description: String,
    pub convictions: Vec<String>,
    // Part 2: harm and time elapsed
    pub harm_description: String,
    pub conduct_time_ago: String,
    pub sentence_completed_time_ago: String,
    // Part 3: the job
    pub job_duties: String,
    pub job_conditions: String,
    // Part 4: rehabilitation
    pub rehabilitation_evidence: String,
    pub mitigating_factors: String,
    // Part 5: conclusion
    pub seriousness_reason: String,
    pub decision_reason: String,
}

// ---------------------------------------------------------------------------
// Step 3: preliminary notice of revocation
// ---------------------------------------------------------------------------

/// Step 3. Preliminary notice of revocation of the conditional offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreliminaryRevocation {
    // Part 1
    pub applicant_name: String,
    pub position: String,
    pub contact_name: String,
    pub company_name: String,
    pub address: String,
    pub phone: String,
    pub date: String,
    // Part 2
    pub convictions: Vec<String>,
    pub conduct_time_ago: String,
    pub sentence_completed_time_ago: String,
    // Part 3
    pub job_duties: String,
    pub seriousness_reason: String,
    pub revocation_reason: String,
    // Part 4: kept as entered; must parse as an integer of at least 5
    pub business_days: String,
}

// ---------------------------------------------------------------------------
// Step 4: individualized reassessment
// ---------------------------------------------------------------------------

/// How the reassessment resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassessmentDecision {
    /// Extend the offer of employment (hire).
    Extend,
    /// Proceed to the final notice of revocation.
    Rescind,
}

/// Step 4. Reassessment after the candidate's response window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reassessment {
    pub rehabilitation_evidence: String,
    pub mitigating_factors: String,
    pub reassessment_notes: String,
    pub decision: Option<ReassessmentDecision>,
    pub rescind_reason: String,
}

// ---------------------------------------------------------------------------
// Step 5: final notice of revocation
// ---------------------------------------------------------------------------

/// Whether the final notice offers a reconsideration procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconsideration {
    None,
    Procedure,
}

/// Step 5. Final notice of revocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalRevocation {
    // Part 1
    pub date: String,
    pub applicant: String,
    pub date_of_notice: String,
    // Part 2
    pub convictions: Vec<String>,
    // Part 3
    pub position: String,
    pub job_duties: Vec<String>,
    pub time_since_conduct: String,
    pub time_since_sentence: String,
    pub serious_reason: String,
    // Part 4
    pub fitness_reason: String,
    pub contact_name: String,
    pub company_name: String,
    pub reconsideration: Option<Reconsideration>,
    pub reconsideration_procedure: String,
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// Payload of a completed form step, tagged by which step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StepData {
    ConditionalOffer(ConditionalOffer),
    IndividualAssessment(IndividualAssessment),
    PreliminaryRevocation(PreliminaryRevocation),
    Reassessment(Reassessment),
    FinalRevocation(FinalRevocation),
}

impl StepData {
    /// The 1-based step this payload belongs to.
    pub fn step_number(&self) -> u8 {
        self.step().to_number()
    }

    pub fn step(&self) -> AssessmentStep {
        match self {
            Self::ConditionalOffer(_) => AssessmentStep::ConditionalOffer,
            Self::IndividualAssessment(_) => AssessmentStep::IndividualAssessment,
            Self::PreliminaryRevocation(_) => AssessmentStep::PreliminaryRevocation,
            Self::Reassessment(_) => AssessmentStep::Reassessment,
            Self::FinalRevocation(_) => AssessmentStep::FinalRevocation,
        }
    }

    /// An empty payload for a form step.
    pub fn blank(step: u8) -> Result<Self, CoreError> {
        validate_form_step(step)?;
        Ok(match step {
            1 => Self::ConditionalOffer(ConditionalOffer::default()),
            2 => Self::IndividualAssessment(IndividualAssessment::default()),
            3 => Self::PreliminaryRevocation(PreliminaryRevocation::default()),
            4 => Self::Reassessment(Reassessment::default()),
            _ => Self::FinalRevocation(FinalRevocation::default()),
        })
    }

    /// Decode a stored payload using the step number of its row.
    pub fn from_json(step: u8, value: serde_json::Value) -> Result<Self, StorageError> {
        let corrupt = |e: serde_json::Error| {
            StorageError::Corrupt(format!("step {step} payload does not match its schema: {e}"))
        };
        match step {
            1 => serde_json::from_value(value).map(Self::ConditionalOffer).map_err(corrupt),
            2 => serde_json::from_value(value)
                .map(Self::IndividualAssessment)
                .map_err(corrupt),
            3 => serde_json::from_value(value)
                .map(Self::PreliminaryRevocation)
                .map_err(corrupt),
            4 => serde_json::from_value(value).map(Self::Reassessment).map_err(corrupt),
            5 => serde_json::from_value(value).map(Self::FinalRevocation).map_err(corrupt),
            _ => Err(StorageError::Corrupt(format!(
                "step {step} does not carry a payload"
            ))),
        }
    }

    /// Encode the inner payload for storage (no tag).
    pub fn to_json(&self) -> serde_json::Value {
        let encoded = match self {
            Self::ConditionalOffer(d) => serde_json::to_value(d),
            Self::IndividualAssessment(d) => serde_json::to_value(d),
            Self::PreliminaryRevocation(d) => serde_json::to_value(d),
            Self::Reassessment(d) => serde_json::to_value(d),
            Self::FinalRevocation(d) => serde_json::to_value(d),
        };
        // Plain structs of strings, lists and options always encode.
        encoded.unwrap_or(serde_json::Value::Null)
    }

    /// Every field of the payload, blank or not.
    pub fn all_fields(&self) -> FieldMap {
        match self.to_json() {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => FieldMap::new(),
        }
    }

    /// Only the fields carrying a usable value.
    pub fn fields(&self) -> FieldMap {
        self.all_fields()
            .into_iter()
            .filter(|(_, v)| is_filled(v))
            .collect()
    }

    /// Whether no field carries a usable value.
    pub fn is_blank(&self) -> bool {
        self.fields().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Step record
// ---------------------------------------------------------------------------

/// A completed step as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub subject: SubjectId,
    pub step_number: u8,
    pub step_data: StepData,
    pub completed_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Blank checks
// ---------------------------------------------------------------------------

/// Whether a string has content beyond whitespace.
pub fn is_present(s: &str) -> bool {
    !s.trim().is_empty()
}

/// Whether a list has at least one entry with content.
pub fn has_entry(items: &[String]) -> bool {
    items.iter().any(|s| is_present(s))
}

/// Whether a JSON value counts as filled in.
pub fn is_filled(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => is_present(s),
        serde_json::Value::Array(items) => items.iter().any(is_filled),
        serde_json::Value::Object(map) => map.values().any(is_filled),
        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn blank_payload_matches_step() {
        for n in 1..=5 {
            assert_eq!(StepData::blank(n).unwrap().step_number(), n);
        }
        assert!(StepData::blank(6).is_err());
    }

    #[test]
    fn partial_payload_decodes_with_defaults() {
        let data = StepData::from_json(1, json!({ "employer": "Acme" })).unwrap();
        assert_matches!(data, StepData::ConditionalOffer(ref offer) if offer.employer == "Acme");
        if let StepData::ConditionalOffer(offer) = data {
            assert_eq!(offer.offer_extended, None);
            assert!(offer.position.is_empty());
        }
    }

    #[test]
    fn mismatched_payload_is_corrupt() {
        let result = StepData::from_json(3, json!({ "convictions": "not a list" }));
        assert_matches!(result, Err(StorageError::Corrupt(_)));
    }

    #[test]
    fn complete_step_has_no_payload() {
        assert_matches!(StepData::from_json(6, json!({})), Err(StorageError::Corrupt(_)));
    }

    #[test]
    fn stored_json_has_no_tag() {
        let data = StepData::ConditionalOffer(ConditionalOffer {
            employer: "Acme".into(),
            ..Default::default()
        });
        let stored = data.to_json();
        assert!(stored.get("kind").is_none());
        assert_eq!(stored["employer"], "Acme");
        assert_eq!(StepData::from_json(1, stored).unwrap(), data);
    }

    #[test]
    fn wire_format_is_tagged() {
        let data = StepData::Reassessment(Reassessment {
            decision: Some(ReassessmentDecision::Rescind),
            ..Default::default()
        });
        let wire = serde_json::to_value(&data).unwrap();
        assert_eq!(wire["kind"], "reassessment");
        assert_eq!(wire["data"]["decision"], "rescind");
    }

    #[test]
    fn fields_skip_blank_values() {
        let data = StepData::PreliminaryRevocation(PreliminaryRevocation {
            position: "Cashier".into(),
            phone: "   ".into(),
            convictions: vec!["".into()],
            ..Default::default()
        });
        let fields = data.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["position"], json!("Cashier"));
    }

    #[test]
    fn booleans_count_as_filled() {
        let data = StepData::ConditionalOffer(ConditionalOffer {
            offer_extended: Some(false),
            ..Default::default()
        });
        assert_eq!(data.fields()["offer_extended"], json!(false));
        assert!(!data.is_blank());
        assert!(StepData::blank(2).unwrap().is_blank());
    }

    #[test]
    fn list_with_one_real_entry_has_entry() {
        assert!(has_entry(&["".into(), "Theft - 2019".into()]));
        assert!(!has_entry(&[" ".into()]));
        assert!(!has_entry(&[]));
    }
}
