//! Step progression for one assessment.
//!
//! Steps 1–5 advance linearly once their completion gate passes. A hire
//! decision exits the chain from steps 2–5; the final notice at step 5 ends
//! it as revoked. The terminal outcome is checked before anything else, so
//! a concluded assessment always renders its outcome regardless of where
//! the step pointer sits.
//!
//! The step pointer and the step records can disagree after a partial
//! failure. [`resolve_effective_step`] is the single place that reconciles
//! them: a record's existence is trusted over the pointer.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregator::StepDataAggregator;
use crate::assessment::{
    Assessment, AssessmentStatus, AssessmentStep, Decision, DecisionType, Outcome,
    LAST_FORM_STEP, MAX_STEP, MIN_STEP,
};
use crate::completion::{is_ready, missing_fields, ReassessmentPhase, StepDraft};
use crate::error::CoreError;
use crate::gateway::{PersistenceGateway, StorageResult};
use crate::prefill;
use crate::profile::ProfileContext;
use crate::step_data::{FinalRevocation, ReassessmentDecision, StepData};
use crate::types::SubjectId;

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// A disagreement between the step pointer and the stored step records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// The pointer's step already has a record; the pointer should have
    /// moved on to `resume_at`.
    PointerLag { step: u8, resume_at: u8 },
    /// The pointer is past steps that have no record. Advisory only.
    MissingRecords { steps: Vec<u8> },
    /// The final notice was recorded but the revocation was never marked.
    OutcomePending,
}

/// Where an assessment effectively stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveStep {
    pub step: u8,
    pub terminal: Option<Outcome>,
    /// The step's record exists, so it is shown read-only.
    pub submitted: bool,
    pub divergence: Option<Divergence>,
}

/// Reconcile the pointer with the set of steps that have records.
pub fn resolve_effective_step(
    assessment: Option<&Assessment>,
    completed: &BTreeSet<u8>,
) -> EffectiveStep {
    let pointer = assessment
        .map_or(MIN_STEP, |a| a.current_step)
        .clamp(MIN_STEP, MAX_STEP);

    if let Some(outcome) = assessment.and_then(Assessment::outcome) {
        return EffectiveStep {
            step: pointer,
            terminal: Some(outcome),
            submitted: false,
            divergence: None,
        };
    }

    if pointer <= LAST_FORM_STEP && completed.contains(&pointer) {
        let resume_at = (pointer..=LAST_FORM_STEP)
            .find(|step| !completed.contains(step))
            .unwrap_or(MAX_STEP);
        return EffectiveStep {
            step: pointer,
            terminal: None,
            submitted: true,
            divergence: Some(Divergence::PointerLag {
                step: pointer,
                resume_at,
            }),
        };
    }

    if pointer == MAX_STEP {
        return EffectiveStep {
            step: pointer,
            terminal: None,
            submitted: false,
            divergence: Some(Divergence::OutcomePending),
        };
    }

    let missing: Vec<u8> = (MIN_STEP..pointer)
        .filter(|step| !completed.contains(step))
        .collect();
    EffectiveStep {
        step: pointer,
        terminal: None,
        submitted: false,
        divergence: (!missing.is_empty()).then_some(Divergence::MissingRecords { steps: missing }),
    }
}

// ---------------------------------------------------------------------------
// Wizard state
// ---------------------------------------------------------------------------

/// How the current step is presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepView {
    /// Open for editing.
    Editable,
    /// Already sent; shown read-only to avoid a second send.
    Submitted { data: StepData },
    /// The assessment has concluded.
    Terminal { outcome: Outcome },
}

/// Snapshot handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub subject: SubjectId,
    pub step: u8,
    pub label: String,
    pub status: AssessmentStatus,
    pub completed_at_step: Option<u8>,
    pub view: StepView,
    pub completed_steps: Vec<u8>,
    pub divergence: Option<Divergence>,
    pub step4_phase: ReassessmentPhase,
    pub can_declare_hire: bool,
}

impl WizardState {
    /// The state of an assessment nobody has touched.
    pub fn initial(subject: SubjectId) -> Self {
        Self::build(
            subject,
            MIN_STEP,
            AssessmentStatus::NotStarted,
            None,
            StepView::Editable,
            Vec::new(),
            None,
        )
    }

    fn build(
        subject: SubjectId,
        step: u8,
        status: AssessmentStatus,
        completed_at_step: Option<u8>,
        view: StepView,
        completed_steps: Vec<u8>,
        divergence: Option<Divergence>,
    ) -> Self {
        let step_enum = AssessmentStep::from_number(step).unwrap_or(AssessmentStep::ConditionalOffer);
        let can_declare_hire = !status.is_terminal() && step_enum.allows_hire();
        Self {
            subject,
            step,
            label: step_enum.label().to_string(),
            status,
            completed_at_step,
            view,
            completed_steps,
            divergence,
            step4_phase: ReassessmentPhase::default(),
            can_declare_hire,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.status.outcome()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// What the state becomes once `completed` is recorded and the pointer
    /// moves to `next`.
    fn advanced(&self, completed: u8, next: u8) -> Self {
        let mut steps = self.completed_steps.clone();
        if !steps.contains(&completed) {
            steps.push(completed);
            steps.sort_unstable();
        }
        Self::build(
            self.subject,
            next,
            AssessmentStatus::InProgress,
            None,
            StepView::Editable,
            steps,
            None,
        )
    }

    /// What the state becomes once `outcome` is marked at `at_step`.
    fn concluded(&self, outcome: Outcome, at_step: u8) -> Self {
        Self::build(
            self.subject,
            self.step.max(at_step),
            outcome.status(),
            Some(at_step),
            StepView::Terminal { outcome },
            self.completed_steps.clone(),
            None,
        )
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Drives one subject's assessment through its steps.
///
/// Holds the last state it observed or produced, so a failed read after a
/// successful write never drops the admin back to step 1.
pub struct StepStateMachine {
    gateway: Arc<dyn PersistenceGateway>,
    subject: SubjectId,
    last_known: Option<WizardState>,
    step4_phase: ReassessmentPhase,
}

impl StepStateMachine {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, subject: SubjectId) -> Self {
        Self {
            gateway,
            subject,
            last_known: None,
            step4_phase: ReassessmentPhase::default(),
        }
    }

    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    pub fn last_known(&self) -> Option<&WizardState> {
        self.last_known.as_ref()
    }

    /// Create the assessment if needed and load its state.
    pub async fn start(&mut self) -> Result<WizardState, CoreError> {
        self.gateway.initialize_assessment(self.subject).await?;
        Ok(self.current_state().await)
    }

    /// Resume from storage.
    ///
    /// Read failures are logged and answered with the last known state, or
    /// the untouched step 1 state when nothing is known yet.
    pub async fn current_state(&mut self) -> WizardState {
        match self.read_state().await {
            Ok(state) => self.remember(state),
            Err(e) => {
                tracing::warn!(
                    subject = %self.subject,
                    error = %e,
                    "Assessment state unreadable; using last known state"
                );
                self.last_known
                    .clone()
                    .unwrap_or_else(|| WizardState::initial(self.subject))
            }
        }
    }

    /// The stored state, for guarding a transition. Unlike
    /// [`current_state`](Self::current_state) a read failure is returned,
    /// never answered from memory.
    async fn fresh_state(&mut self) -> StorageResult<WizardState> {
        let state = self.read_state().await?;
        Ok(self.remember(state))
    }

    async fn read_state(&self) -> StorageResult<WizardState> {
        let assessment = self.gateway.get_assessment(self.subject).await?;
        let completed = self.gateway.completed_steps(self.subject).await?;
        let effective = resolve_effective_step(assessment.as_ref(), &completed);

        if let Some(divergence) = &effective.divergence {
            tracing::warn!(
                subject = %self.subject,
                step = effective.step,
                ?divergence,
                "Step pointer and step records disagree"
            );
        }

        let view = match (effective.terminal, effective.submitted) {
            (Some(outcome), _) => StepView::Terminal { outcome },
            (None, true) => match self.gateway.get_step_data(self.subject, effective.step).await? {
                Some(record) => StepView::Submitted {
                    data: record.step_data,
                },
                None => StepView::Editable,
            },
            (None, false) => StepView::Editable,
        };

        let status = assessment
            .as_ref()
            .map_or(AssessmentStatus::NotStarted, |a| a.status);
        let completed_at_step = assessment.as_ref().and_then(|a| a.completed_at_step);

        Ok(WizardState::build(
            self.subject,
            effective.step,
            status,
            completed_at_step,
            view,
            completed.into_iter().collect(),
            effective.divergence,
        ))
    }

    fn remember(&mut self, mut state: WizardState) -> WizardState {
        if state.step != AssessmentStep::Reassessment.to_number() || state.is_terminal() {
            self.step4_phase = ReassessmentPhase::default();
        }
        state.step4_phase = self.step4_phase;
        self.last_known = Some(state.clone());
        state
    }

    /// Re-read after a successful write, falling back to what the write
    /// is known to have produced.
    async fn settle(&mut self, expected: WizardState) -> WizardState {
        match self.read_state().await {
            Ok(state) => self.remember(state),
            Err(e) => {
                tracing::warn!(
                    subject = %self.subject,
                    error = %e,
                    "State re-read failed after write; keeping in-memory state"
                );
                self.remember(expected)
            }
        }
    }

    // -- Step 4 sub-state ---------------------------------------------------

    /// Leave the time-remaining summary and open the reassessment form.
    pub async fn begin_reassessment(&mut self) -> Result<WizardState, CoreError> {
        let state = self.fresh_state().await?;
        if let Some(outcome) = state.outcome() {
            return Err(concluded(outcome));
        }
        if state.step != AssessmentStep::Reassessment.to_number() {
            return Err(CoreError::Validation(format!(
                "The reassessment can only begin on step 4; current step is {}",
                state.step
            )));
        }
        self.step4_phase = ReassessmentPhase::ReassessmentForm;
        tracing::info!(subject = %self.subject, "Individualized reassessment begun");
        Ok(self.remember(state))
    }

    // -- Transitions --------------------------------------------------------

    /// Send the open step's draft.
    ///
    /// The draft is only borrowed; a rejected or failed send leaves it, the
    /// pointer, and the in-memory state exactly as they were.
    pub async fn advance(
        &mut self,
        draft: &StepDraft,
        profile: &ProfileContext,
    ) -> Result<WizardState, CoreError> {
        let state = self.fresh_state().await?;
        if let Some(outcome) = state.outcome() {
            return Err(concluded(outcome));
        }

        let step = draft.step_number();
        if step != state.step {
            return Err(CoreError::Conflict(format!(
                "Step {step} is not open; the assessment is on step {}",
                state.step
            )));
        }
        if matches!(state.view, StepView::Submitted { .. }) {
            return Err(CoreError::Conflict(format!(
                "Step {step} was already sent"
            )));
        }
        if matches!(draft, StepDraft::Reassessment { .. })
            && self.step4_phase != ReassessmentPhase::ReassessmentForm
        {
            return Err(CoreError::Conflict(
                "The reassessment form has not been opened; begin the reassessment first".into(),
            ));
        }
        if !is_ready(draft) {
            return Err(CoreError::Validation(format!(
                "Step {step} is not ready to send; missing: {}",
                missing_fields(draft).join(", ")
            )));
        }
        let data = draft.to_step_data().ok_or_else(|| {
            CoreError::Validation(format!("Step {step} has nothing to send"))
        })?;

        if state.status == AssessmentStatus::NotStarted {
            self.gateway.initialize_assessment(self.subject).await?;
        }

        let expected = match &data {
            StepData::Reassessment(r) if r.decision == Some(ReassessmentDecision::Extend) => {
                self.gateway.save_step_data(self.subject, &data).await?;
                self.conclude(Outcome::Hired, step, profile).await?;
                state.advanced(step, step).concluded(Outcome::Hired, step)
            }
            StepData::FinalRevocation(_) => {
                self.gateway
                    .complete_step(self.subject, &data, MAX_STEP)
                    .await?;
                self.conclude(Outcome::Revoked, step, profile).await?;
                state
                    .advanced(step, MAX_STEP)
                    .concluded(Outcome::Revoked, step)
            }
            _ => {
                let next = step + 1;
                self.gateway.complete_step(self.subject, &data, next).await?;
                state.advanced(step, next)
            }
        };

        tracing::info!(
            subject = %self.subject,
            step,
            next_step = expected.step,
            status = expected.status.as_str(),
            "Assessment step sent"
        );

        Ok(self.settle(expected).await)
    }

    /// Extend the offer of employment from any of steps 2–5.
    ///
    /// Declaring on an assessment that has already concluded changes
    /// nothing and returns its current state.
    pub async fn declare_hire(&mut self, profile: &ProfileContext) -> Result<WizardState, CoreError> {
        let state = self.fresh_state().await?;
        if state.is_terminal() {
            tracing::debug!(subject = %self.subject, "Hire declared on a concluded assessment; ignoring");
            return Ok(state);
        }
        if !state.can_declare_hire {
            return Err(CoreError::Validation(format!(
                "The offer can only be extended from steps 2 through 5; current step is {}",
                state.step
            )));
        }

        self.conclude(Outcome::Hired, state.step, profile).await?;
        tracing::info!(subject = %self.subject, step = state.step, "Offer of employment extended");

        let expected = state.concluded(Outcome::Hired, state.step);
        Ok(self.settle(expected).await)
    }

    /// Send the final notice of revocation from step 5.
    ///
    /// Like [`declare_hire`](Self::declare_hire), a second call on a
    /// concluded assessment changes nothing.
    pub async fn declare_reject(
        &mut self,
        data: &FinalRevocation,
        profile: &ProfileContext,
    ) -> Result<WizardState, CoreError> {
        let state = self.fresh_state().await?;
        if state.is_terminal() {
            tracing::debug!(subject = %self.subject, "Revocation sent on a concluded assessment; ignoring");
            return Ok(state);
        }
        if state.step != AssessmentStep::FinalRevocation.to_number() {
            return Err(CoreError::Validation(format!(
                "The final notice of revocation can only be sent from step 5; current step is {}",
                state.step
            )));
        }
        let draft = StepDraft::FinalRevocation { data: data.clone() };
        self.advance(&draft, profile).await
    }

    /// Finish a transition a partial failure left half-done.
    pub async fn repair(&mut self, profile: &ProfileContext) -> Result<WizardState, CoreError> {
        let state = self.fresh_state().await?;

        let expected = match (&state.divergence, &state.view) {
            (Some(Divergence::PointerLag { step, .. }), StepView::Submitted { data })
                if is_extend(data) =>
            {
                self.conclude(Outcome::Hired, *step, profile).await?;
                state.concluded(Outcome::Hired, *step)
            }
            (Some(Divergence::PointerLag { step, resume_at }), _) => {
                self.gateway.set_current_step(self.subject, *resume_at).await?;
                let moved = state.advanced(*step, *resume_at);
                if *resume_at == MAX_STEP {
                    self.conclude(Outcome::Revoked, LAST_FORM_STEP, profile).await?;
                    moved.concluded(Outcome::Revoked, LAST_FORM_STEP)
                } else {
                    moved
                }
            }
            (Some(Divergence::OutcomePending), _) => {
                self.conclude(Outcome::Revoked, LAST_FORM_STEP, profile).await?;
                state.concluded(Outcome::Revoked, LAST_FORM_STEP)
            }
            _ => return Ok(state),
        };

        tracing::info!(
            subject = %self.subject,
            step = expected.step,
            status = expected.status.as_str(),
            "Assessment divergence repaired"
        );
        Ok(self.settle(expected).await)
    }

    /// Record the decision letter, then mark the outcome. The decision write
    /// is idempotent per subject, so a retry after a failed mark is safe.
    async fn conclude(
        &self,
        outcome: Outcome,
        at_step: u8,
        profile: &ProfileContext,
    ) -> Result<(), CoreError> {
        let decision = Decision {
            subject: self.subject,
            decision_type: DecisionType::from(outcome),
            at_step,
            hr_admin_name: profile.hr_admin_name.clone().unwrap_or_default(),
            company_name: profile.company_name.clone().unwrap_or_default(),
            sent_at: chrono::Utc::now(),
        };
        self.gateway.record_decision(&decision).await?;
        let changed = self.gateway.mark_terminal(self.subject, outcome, at_step).await?;
        if !changed {
            tracing::debug!(
                subject = %self.subject,
                outcome = outcome.as_str(),
                "Assessment was already concluded"
            );
        }
        Ok(())
    }

    // -- Drafts -------------------------------------------------------------

    /// A fresh draft for the open step: local draft, then prior steps, then
    /// profile defaults.
    pub async fn hydrate_draft(
        &mut self,
        local: Option<&StepData>,
        profile: &ProfileContext,
    ) -> Result<StepDraft, CoreError> {
        let state = self.current_state().await;
        if let Some(outcome) = state.outcome() {
            return Err(concluded(outcome));
        }
        if state.step > LAST_FORM_STEP {
            return Ok(StepDraft::Complete);
        }

        let aggregator = StepDataAggregator::new(Arc::clone(&self.gateway));
        let suggestions = aggregator.collect_suggestions(self.subject, state.step).await;
        let data = prefill::hydrate(state.step, local, &suggestions, profile)?;

        let mut draft = StepDraft::from_step_data(data);
        if let StepDraft::Reassessment { phase, .. } = &mut draft {
            *phase = self.step4_phase;
        }
        Ok(draft)
    }
}

fn is_extend(data: &StepData) -> bool {
    matches!(
        data,
        StepData::Reassessment(r) if r.decision == Some(ReassessmentDecision::Extend)
    )
}

fn concluded(outcome: Outcome) -> CoreError {
    CoreError::Conflict(format!(
        "Assessment already concluded as {}",
        outcome.as_str()
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
