//! Route definitions for the individualized-assessment wizard.
//!
//! Mounted at `/assessments/{hr_id}/{candidate_id}` by `api_routes()`.
//!
//! ```text
//! GET    /                              get_state
//! POST   /                              start_assessment
//! GET    /steps/{step}                  get_step
//! POST   /steps/{step}/validate         validate_step
//! POST   /steps/{step}/complete         complete_step
//! GET    /steps/{step}/prefill          get_prefill
//! POST   /steps/{step}/prefill          post_prefill
//! GET    /suggestions                   get_suggestions (?upto)
//! GET    /initial-summary               get_initial_summary
//! GET    /notice-period                 get_notice_period (?today)
//! POST   /reassessment/begin            begin_reassessment
//! POST   /hire                          declare_hire
//! POST   /revoke                        declare_reject
//! POST   /repair                        repair
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::assessment;
use crate::state::AppState;

/// Assessment routes, one subject per mount.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(assessment::get_state).post(assessment::start_assessment),
        )
        .route("/steps/{step}", get(assessment::get_step))
        .route("/steps/{step}/validate", post(assessment::validate_step))
        .route("/steps/{step}/complete", post(assessment::complete_step))
        .route(
            "/steps/{step}/prefill",
            get(assessment::get_prefill).post(assessment::post_prefill),
        )
        .route("/suggestions", get(assessment::get_suggestions))
        .route("/initial-summary", get(assessment::get_initial_summary))
        .route("/notice-period", get(assessment::get_notice_period))
        .route(
            "/reassessment/begin",
            post(assessment::begin_reassessment),
        )
        .route("/hire", post(assessment::declare_hire))
        .route("/revoke", post(assessment::declare_reject))
        .route("/repair", post(assessment::repair))
}
