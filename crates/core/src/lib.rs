//! Fair Chance individualized-assessment domain.
//!
//! This crate holds everything that does not depend on a particular store
//! or transport:
//!
//! - [`StepStateMachine`]: drives one assessment through its six steps.
//! - [`PersistenceGateway`]: the storage contract, with an in-memory
//!   implementation in [`memory`].
//! - [`StepDataAggregator`]: cross-step suggestions for later forms.
//! - [`completion`]: the per-step gates that enable the send action.

pub mod aggregator;
pub mod assessment;
pub mod completion;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod notice_period;
pub mod prefill;
pub mod profile;
pub mod state_machine;
pub mod step_data;
pub mod types;

pub use aggregator::{StepDataAggregator, Suggestions};
pub use error::CoreError;
pub use gateway::{PersistenceGateway, StorageError, StorageResult};
pub use profile::{ProfileContext, ProfileDirectory};
pub use state_machine::{StepStateMachine, WizardState};
pub use types::SubjectId;
