//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod assessment_repo;
pub mod decision_repo;
pub mod profile_repo;
pub mod step_record_repo;

pub use assessment_repo::AssessmentRepo;
pub use decision_repo::DecisionRepo;
pub use profile_repo::ProfileRepo;
pub use step_record_repo::StepRecordRepo;
