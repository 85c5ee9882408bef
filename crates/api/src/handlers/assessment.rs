//! Handlers for the Fair Chance individualized-assessment wizard.
//!
//! Every route is scoped to one subject, `(hr_id, candidate_id)`. Step
//! transitions go through the subject's shared [`StepStateMachine`]; the
//! read-only views (records, suggestions, summaries) go straight to the
//! gateway.
//!
//! [`StepStateMachine`]: fairchance_core::state_machine::StepStateMachine

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use fairchance_core::aggregator::StepDataAggregator;
use fairchance_core::assessment::{validate_form_step, validate_step_number};
use fairchance_core::completion::{is_ready, missing_fields, StepDraft};
use fairchance_core::error::CoreError;
use fairchance_core::notice_period::notice_period;
use fairchance_core::profile::ProfileContext;
use fairchance_core::step_data::{FinalRevocation, StepData, StepRecord};
use fairchance_core::types::{Date, DbId, SubjectId};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /suggestions`.
#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
    /// Collect from steps before this one.
    pub upto: u8,
}

/// Query parameters for `GET /notice-period`.
#[derive(Debug, Deserialize)]
pub struct NoticePeriodParams {
    /// Evaluate the window as of this date instead of today.
    pub today: Option<Date>,
}

/// Body for `POST /steps/{step}/prefill`.
#[derive(Debug, Default, Deserialize)]
pub struct PrefillRequest {
    /// The admin's unsent local draft for the step.
    pub local: Option<StepData>,
}

/// Whether a draft may be sent, and what is still missing.
#[derive(Debug, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub missing: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn today() -> Date {
    chrono::Utc::now().date_naive()
}

async fn profile_context(state: &AppState, subject: SubjectId) -> ProfileContext {
    ProfileContext::load(state.profiles.as_ref(), subject, today()).await
}

/// A step's persisted record. Read failures are logged and answered as
/// "not sent yet".
async fn read_step_record(state: &AppState, subject: SubjectId, step: u8) -> Option<StepRecord> {
    match state.gateway.get_step_data(subject, step).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(%subject, step, error = %e, "Step record unreadable; treating as absent");
            None
        }
    }
}

/// Reject a draft posted to another step's URL.
fn ensure_draft_matches(step: u8, draft: &StepDraft) -> AppResult<()> {
    if draft.step_number() != step {
        return Err(AppError::BadRequest(format!(
            "Draft is for step {} but was sent to step {step}",
            draft.step_number()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /assessments/{hr_id}/{candidate_id}
// ---------------------------------------------------------------------------

/// Resume: the subject's current wizard state.
pub async fn get_state(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let subject = SubjectId::new(hr_id, candidate_id);
    let session = state.sessions.reader(subject).await;
    let wizard = session.lock().await.current_state().await;
    Ok(Json(DataResponse { data: wizard }))
}

// ---------------------------------------------------------------------------
// POST /assessments/{hr_id}/{candidate_id}
// ---------------------------------------------------------------------------

/// Create the assessment if it does not exist yet.
pub async fn start_assessment(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let subject = SubjectId::new(hr_id, candidate_id);
    let session = state.sessions.machine(subject).await;
    let wizard = session.lock().await.start().await?;

    tracing::info!(hr_id, candidate_id, step = wizard.step, "Assessment opened");

    Ok((StatusCode::CREATED, Json(DataResponse { data: wizard })))
}

// ---------------------------------------------------------------------------
// GET /assessments/{hr_id}/{candidate_id}/steps/{step}
// ---------------------------------------------------------------------------

/// The persisted record for a step, or `null` when it was never sent or
/// cannot be read.
pub async fn get_step(
    State(state): State<AppState>,
    Path((hr_id, candidate_id, step)): Path<(DbId, DbId, u8)>,
) -> AppResult<impl IntoResponse> {
    validate_form_step(step)?;
    let record = read_step_record(&state, SubjectId::new(hr_id, candidate_id), step).await;
    Ok(Json(DataResponse { data: record }))
}

// ---------------------------------------------------------------------------
// POST /assessments/{hr_id}/{candidate_id}/steps/{step}/validate
// ---------------------------------------------------------------------------

/// Evaluate a draft's completion gate without saving anything.
pub async fn validate_step(
    Path((_hr_id, _candidate_id, step)): Path<(DbId, DbId, u8)>,
    Json(draft): Json<StepDraft>,
) -> AppResult<impl IntoResponse> {
    validate_step_number(step)?;
    ensure_draft_matches(step, &draft)?;
    let readiness = Readiness {
        ready: is_ready(&draft),
        missing: missing_fields(&draft),
    };
    Ok(Json(DataResponse { data: readiness }))
}

// ---------------------------------------------------------------------------
// POST /assessments/{hr_id}/{candidate_id}/steps/{step}/complete
// ---------------------------------------------------------------------------

/// Send the open step and advance.
pub async fn complete_step(
    State(state): State<AppState>,
    Path((hr_id, candidate_id, step)): Path<(DbId, DbId, u8)>,
    Json(draft): Json<StepDraft>,
) -> AppResult<impl IntoResponse> {
    validate_form_step(step)?;
    ensure_draft_matches(step, &draft)?;

    let subject = SubjectId::new(hr_id, candidate_id);
    let profile = profile_context(&state, subject).await;
    let session = state.sessions.machine(subject).await;
    let wizard = session.lock().await.advance(&draft, &profile).await?;

    Ok(Json(DataResponse { data: wizard }))
}

// ---------------------------------------------------------------------------
// GET|POST /assessments/{hr_id}/{candidate_id}/steps/{step}/prefill
// ---------------------------------------------------------------------------

async fn prefill(
    state: &AppState,
    subject: SubjectId,
    step: u8,
    local: Option<&StepData>,
) -> AppResult<StepDraft> {
    validate_form_step(step)?;
    let profile = profile_context(state, subject).await;
    let session = state.sessions.reader(subject).await;
    let draft = session.lock().await.hydrate_draft(local, &profile).await?;

    if draft.step_number() != step {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Step {step} is not open; the assessment is on step {}",
            draft.step_number()
        ))));
    }
    Ok(draft)
}

/// A fresh draft for the open step, pre-filled from earlier steps and
/// profiles.
pub async fn get_prefill(
    State(state): State<AppState>,
    Path((hr_id, candidate_id, step)): Path<(DbId, DbId, u8)>,
) -> AppResult<impl IntoResponse> {
    let draft = prefill(&state, SubjectId::new(hr_id, candidate_id), step, None).await?;
    Ok(Json(DataResponse { data: draft }))
}

/// Like [`get_prefill`], with the admin's local draft taking precedence.
pub async fn post_prefill(
    State(state): State<AppState>,
    Path((hr_id, candidate_id, step)): Path<(DbId, DbId, u8)>,
    Json(body): Json<PrefillRequest>,
) -> AppResult<impl IntoResponse> {
    let subject = SubjectId::new(hr_id, candidate_id);
    let draft = prefill(&state, subject, step, body.local.as_ref()).await?;
    Ok(Json(DataResponse { data: draft }))
}

// ---------------------------------------------------------------------------
// GET /assessments/{hr_id}/{candidate_id}/suggestions?upto=N
// ---------------------------------------------------------------------------

/// Merged field suggestions from every step before `upto`, with profile
/// defaults underneath.
pub async fn get_suggestions(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
    Query(params): Query<SuggestionParams>,
) -> AppResult<impl IntoResponse> {
    validate_step_number(params.upto)?;
    let subject = SubjectId::new(hr_id, candidate_id);
    let profile = profile_context(&state, subject).await;
    let suggestions = StepDataAggregator::new(state.gateway.clone())
        .collect_suggestions_with_profile(subject, params.upto, &profile)
        .await;
    Ok(Json(DataResponse { data: suggestions }))
}

// ---------------------------------------------------------------------------
// GET /assessments/{hr_id}/{candidate_id}/initial-summary
// ---------------------------------------------------------------------------

/// Steps 1–3 as sent, for the reference panel beside the reassessment.
pub async fn get_initial_summary(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let summary = StepDataAggregator::new(state.gateway.clone())
        .initial_assessment_summary(SubjectId::new(hr_id, candidate_id))
        .await;
    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// GET /assessments/{hr_id}/{candidate_id}/notice-period
// ---------------------------------------------------------------------------

/// Time left to respond to the preliminary notice, or `null` before it
/// was sent.
pub async fn get_notice_period(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
    Query(params): Query<NoticePeriodParams>,
) -> AppResult<impl IntoResponse> {
    let record = read_step_record(&state, SubjectId::new(hr_id, candidate_id), 3).await;
    let as_of = params.today.unwrap_or_else(today);
    let period = record.and_then(|r| notice_period(&r, as_of));
    Ok(Json(DataResponse { data: period }))
}

// ---------------------------------------------------------------------------
// POST /assessments/{hr_id}/{candidate_id}/reassessment/begin
// ---------------------------------------------------------------------------

/// Leave the time-remaining summary and open the reassessment form.
pub async fn begin_reassessment(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.machine(SubjectId::new(hr_id, candidate_id)).await;
    let wizard = session.lock().await.begin_reassessment().await?;
    Ok(Json(DataResponse { data: wizard }))
}

// ---------------------------------------------------------------------------
// POST /assessments/{hr_id}/{candidate_id}/hire
// ---------------------------------------------------------------------------

/// Extend the offer of employment, ending the assessment as hired.
pub async fn declare_hire(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let subject = SubjectId::new(hr_id, candidate_id);
    let profile = profile_context(&state, subject).await;
    let session = state.sessions.machine(subject).await;
    let wizard = session.lock().await.declare_hire(&profile).await?;
    Ok(Json(DataResponse { data: wizard }))
}

// ---------------------------------------------------------------------------
// POST /assessments/{hr_id}/{candidate_id}/revoke
// ---------------------------------------------------------------------------

/// Send the final notice of revocation, ending the assessment as revoked.
pub async fn declare_reject(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
    Json(notice): Json<FinalRevocation>,
) -> AppResult<impl IntoResponse> {
    let subject = SubjectId::new(hr_id, candidate_id);
    let profile = profile_context(&state, subject).await;
    let session = state.sessions.machine(subject).await;
    let wizard = session.lock().await.declare_reject(&notice, &profile).await?;
    Ok(Json(DataResponse { data: wizard }))
}

// ---------------------------------------------------------------------------
// POST /assessments/{hr_id}/{candidate_id}/repair
// ---------------------------------------------------------------------------

/// Finish a transition that a storage failure left half-done.
pub async fn repair(
    State(state): State<AppState>,
    Path((hr_id, candidate_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let subject = SubjectId::new(hr_id, candidate_id);
    let profile = profile_context(&state, subject).await;
    let session = state.sessions.machine(subject).await;
    let wizard = session.lock().await.repair(&profile).await?;
    Ok(Json(DataResponse { data: wizard }))
}
