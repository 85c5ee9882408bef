pub mod assessment;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /assessments/{hr_id}/{candidate_id}                      state, start
/// /assessments/{hr_id}/{candidate_id}/steps/{step}         persisted record
/// /assessments/{hr_id}/{candidate_id}/steps/{step}/...     validate, complete, prefill
/// /assessments/{hr_id}/{candidate_id}/suggestions          merged prior fields
/// /assessments/{hr_id}/{candidate_id}/initial-summary      steps 1-3 reference
/// /assessments/{hr_id}/{candidate_id}/notice-period        response window
/// /assessments/{hr_id}/{candidate_id}/reassessment/begin   open step 4 form
/// /assessments/{hr_id}/{candidate_id}/hire                 extend offer
/// /assessments/{hr_id}/{candidate_id}/revoke               final revocation
/// /assessments/{hr_id}/{candidate_id}/repair               finish interrupted transition
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/assessments/{hr_id}/{candidate_id}", assessment::router())
}
