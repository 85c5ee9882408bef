//! Draft hydration with an autofill fallback chain.
//!
//! For each field of the form being opened, the first non-blank value wins:
//! the admin's own local draft, then an aggregated suggestion under the same
//! name, then one under a known alias, then a profile-derived default
//! (candidate and admin names, company, today's date for letter dates),
//! and finally blank.

use serde_json::Value;

use crate::aggregator::Suggestions;
use crate::assessment::AssessmentStep;
use crate::error::CoreError;
use crate::profile::ProfileContext;
use crate::step_data::{is_filled, StepData};

/// Letter-date fields. They default to today and are never copied from an
/// earlier letter.
const LETTER_DATE_FIELD: &str = "date";

/// `(step, target field, fallback suggestion names)` where earlier steps
/// record the same fact under a different name.
const FIELD_ALIASES: &[(u8, &str, &[&str])] = &[
    (3, "applicant_name", &["applicant"]),
    (3, "company_name", &["employer"]),
    (5, "applicant", &["applicant_name"]),
    (5, "company_name", &["employer"]),
    (5, "date_of_notice", &["date"]),
    (5, "time_since_conduct", &["conduct_time_ago"]),
    (5, "time_since_sentence", &["sentence_completed_time_ago"]),
    (5, "serious_reason", &["seriousness_reason"]),
];

/// Alternate suggestion names for a target field.
pub fn aliases_for(step: u8, field: &str) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(s, f, _)| *s == step && *f == field)
        .map(|(_, _, aliases)| *aliases)
        .unwrap_or(&[])
}

/// Build the draft payload for `step`.
///
/// Profile defaults are consulted only after every step-derived suggestion.
/// The reassessment step is never pre-filled: earlier steps are only shown
/// beside it for reference.
pub fn hydrate(
    step: u8,
    local: Option<&StepData>,
    suggestions: &Suggestions,
    profile: &ProfileContext,
) -> Result<StepData, CoreError> {
    let blank = StepData::blank(step)?;

    let local = match local {
        Some(draft) if draft.step_number() == step => Some(draft),
        Some(draft) => {
            tracing::warn!(
                step,
                draft_step = draft.step_number(),
                "Ignoring local draft saved for a different step"
            );
            None
        }
        None => None,
    };

    if step == AssessmentStep::Reassessment.to_number() {
        return Ok(local.cloned().unwrap_or(blank));
    }

    let local_fields = local.map(StepData::fields).unwrap_or_default();
    let defaults = Suggestions::new().with_profile_defaults(profile);
    let mut merged = serde_json::Map::new();

    for (field, default_value) in blank.all_fields() {
        let value = local_fields
            .get(&field)
            .cloned()
            .or_else(|| {
                if field == LETTER_DATE_FIELD {
                    return None;
                }
                suggested(aliases_for(step, &field), &field, &default_value, suggestions)
            })
            .or_else(|| suggested(&[], &field, &default_value, &defaults))
            .unwrap_or(default_value);
        merged.insert(field, value);
    }

    Ok(StepData::from_json(step, Value::Object(merged))?)
}

/// The first usable suggestion under `field` or one of its aliases, coerced
/// to the field's shape.
fn suggested(
    aliases: &[&str],
    field: &str,
    target: &Value,
    suggestions: &Suggestions,
) -> Option<Value> {
    // Choice fields (yes/no, decisions) are the admin's call, never autofilled.
    if target.is_null() {
        return None;
    }
    std::iter::once(field)
        .chain(aliases.iter().copied())
        .filter_map(|name| suggestions.get(name))
        .filter_map(|value| coerce(value, target))
        .find(is_filled)
}

/// Reshape a suggestion to match the target field: strings become one-entry
/// lists and lists are joined into a single string.
fn coerce(value: &Value, target: &Value) -> Option<Value> {
    match (target, value) {
        (Value::String(_), Value::String(_)) | (Value::Array(_), Value::Array(_)) => {
            Some(value.clone())
        }
        (Value::Array(_), Value::String(s)) => Some(Value::Array(vec![Value::String(s.clone())])),
        (Value::String(_), Value::Array(items)) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            Some(Value::String(joined))
        }
        (Value::String(_), Value::Number(n)) => Some(Value::String(n.to_string())),
        _ => None,
    }
}
