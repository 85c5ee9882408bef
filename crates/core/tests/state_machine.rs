//! End-to-end progression through the assessment steps on the in-memory
//! gateway.

use std::sync::Arc;

use assert_matches::assert_matches;
use fairchance_core::assessment::{AssessmentStatus, DecisionType, Outcome};
use fairchance_core::completion::{FormStage, ReassessmentPhase, StepDraft};
use fairchance_core::gateway::PersistenceGateway;
use fairchance_core::memory::MemoryGateway;
use fairchance_core::state_machine::{Divergence, StepStateMachine, StepView};
use fairchance_core::step_data::{
    ConditionalOffer, FinalRevocation, IndividualAssessment, PreliminaryRevocation, Reassessment,
    ReassessmentDecision, Reconsideration, StepData,
};
use fairchance_core::{CoreError, ProfileContext, SubjectId};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn subject() -> SubjectId {
    SubjectId::new(1, 42)
}

fn profile() -> ProfileContext {
    ProfileContext {
        candidate_name: Some("Jordan Reyes".into()),
        hr_admin_name: Some("Pat Lee".into()),
        company_name: Some("Acme Markets".into()),
        today: chrono::NaiveDate::from_ymd_opt(2026, 10, 18),
    }
}

fn setup() -> (Arc<MemoryGateway>, StepStateMachine) {
    let gw = Arc::new(MemoryGateway::new());
    let machine = StepStateMachine::new(gw.clone(), subject());
    (gw, machine)
}

fn offer() -> ConditionalOffer {
    ConditionalOffer {
        offer_extended: Some(true),
        employer: "Acme Markets".into(),
        ..Default::default()
    }
}

fn step1() -> StepDraft {
    StepDraft::ConditionalOffer { data: offer() }
}

fn step2() -> StepDraft {
    StepDraft::IndividualAssessment {
        stage: FormStage::Preview,
        data: IndividualAssessment {
            conduct_description: "Shoplifting".into(),
            convictions: vec!["Theft - 2019".into()],
            ..Default::default()
        },
    }
}

fn step3() -> StepDraft {
    StepDraft::PreliminaryRevocation {
        data: PreliminaryRevocation {
            applicant_name: "Jordan Reyes".into(),
            position: "Cashier".into(),
            contact_name: "Pat Lee".into(),
            company_name: "Acme Markets".into(),
            address: "1 Main St".into(),
            phone: "555-0100".into(),
            date: "2026-10-01".into(),
            convictions: vec!["Theft - 2019".into()],
            conduct_time_ago: "5 years".into(),
            sentence_completed_time_ago: "4 years".into(),
            job_duties: "cash handling".into(),
            seriousness_reason: "direct financial risk".into(),
            revocation_reason: "cash-handling duties directly implicated".into(),
            business_days: "5".into(),
        },
    }
}

fn step4(decision: ReassessmentDecision) -> StepDraft {
    StepDraft::Reassessment {
        phase: ReassessmentPhase::ReassessmentForm,
        data: Reassessment {
            decision: Some(decision),
            rescind_reason: "No new evidence".into(),
            ..Default::default()
        },
    }
}

fn final_notice() -> FinalRevocation {
    FinalRevocation {
        date: "2026-10-18".into(),
        applicant: "Jordan Reyes".into(),
        date_of_notice: "2026-10-01".into(),
        convictions: vec!["Theft - 2019".into()],
        position: "Cashier".into(),
        job_duties: vec!["cash handling".into()],
        time_since_conduct: "5 years".into(),
        time_since_sentence: "4 years".into(),
        serious_reason: "direct financial risk".into(),
        fitness_reason: "Role requires unsupervised cash handling".into(),
        contact_name: "Pat Lee".into(),
        company_name: "Acme Markets".into(),
        reconsideration: Some(Reconsideration::None),
        reconsideration_procedure: String::new(),
    }
}

async fn walk_to(machine: &mut StepStateMachine, step: u8) {
    let drafts = [step1(), step2(), step3(), step4(ReassessmentDecision::Rescind)];
    for draft in drafts.iter().take(usize::from(step - 1)) {
        if matches!(draft, StepDraft::Reassessment { .. }) {
            machine.begin_reassessment().await.unwrap();
        }
        machine.advance(draft, &profile()).await.unwrap();
    }
}

// ---------------------------------------------------------------------------
// Resume and linear progression
// ---------------------------------------------------------------------------

#[tokio::test]
async fn untouched_assessment_opens_step_one() {
    let (_gw, mut machine) = setup();
    let state = machine.current_state().await;
    assert_eq!(state.step, 1);
    assert_eq!(state.status, AssessmentStatus::NotStarted);
    assert_eq!(state.view, StepView::Editable);
}

#[tokio::test]
async fn start_creates_the_assessment() {
    let (gw, mut machine) = setup();
    let state = machine.start().await.unwrap();
    assert_eq!(state.status, AssessmentStatus::InProgress);
    assert!(gw.assessment_exists(subject()).await.unwrap());
}

#[tokio::test]
async fn reload_resumes_after_completed_step() {
    let (gw, mut machine) = setup();
    let state = machine.advance(&step1(), &profile()).await.unwrap();
    assert_eq!(state.step, 2);

    let mut reloaded = StepStateMachine::new(gw.clone(), subject());
    let state = reloaded.current_state().await;
    assert_eq!(state.step, 2);
    assert_eq!(state.completed_steps, vec![1]);

    let record = gw.get_step_data(subject(), 1).await.unwrap().unwrap();
    assert_eq!(record.step_data, StepData::ConditionalOffer(offer()));
}

#[tokio::test]
async fn pointer_never_moves_backwards() {
    let (gw, mut machine) = setup();
    let mut seen = vec![gw.get_current_step(subject()).await.unwrap()];
    for draft in [step1(), step2(), step3()] {
        machine.advance(&draft, &profile()).await.unwrap();
        seen.push(gw.get_current_step(subject()).await.unwrap());
    }
    assert_eq!(seen, vec![1, 2, 3, 4]);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn unready_draft_is_rejected_without_writes() {
    let (gw, mut machine) = setup();
    let draft = StepDraft::ConditionalOffer {
        data: ConditionalOffer::default(),
    };

    let result = machine.advance(&draft, &profile()).await;
    assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("offer_extended"));
    assert!(gw.completed_steps(subject()).await.unwrap().is_empty());
}

#[tokio::test]
async fn draft_for_another_step_is_a_conflict() {
    let (_gw, mut machine) = setup();
    let result = machine.advance(&step3(), &profile()).await;
    assert_matches!(result, Err(CoreError::Conflict(_)));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_save_leaves_draft_and_pointer_alone() {
    let (gw, mut machine) = setup();
    machine.start().await.unwrap();
    gw.set_fail_writes(true);

    let draft = step1();
    let before = draft.clone();
    let result = machine.advance(&draft, &profile()).await;

    assert_matches!(result, Err(CoreError::Storage(_)));
    assert_eq!(draft, before);
    assert_eq!(machine.last_known().unwrap().step, 1);
    assert_eq!(gw.get_current_step(subject()).await.unwrap(), 1);
}

#[tokio::test]
async fn unreadable_store_falls_back_to_last_known_state() {
    let (gw, mut machine) = setup();
    machine.advance(&step1(), &profile()).await.unwrap();
    gw.set_fail_reads(true);

    let state = machine.current_state().await;
    assert_eq!(state.step, 2);

    let mut fresh = StepStateMachine::new(gw.clone(), subject());
    assert_eq!(fresh.current_state().await.step, 1);
}

#[tokio::test]
async fn successful_write_survives_failed_reread() {
    let (gw, mut machine) = setup();
    machine.start().await.unwrap();
    gw.set_fail_reads_after_next_write(true);

    let state = machine.advance(&step1(), &profile()).await.unwrap();
    assert_eq!(state.step, 2);
    assert_eq!(machine.current_state().await.step, 2);

    gw.set_fail_reads(false);
    assert_eq!(gw.get_current_step(subject()).await.unwrap(), 2);
}

#[tokio::test]
async fn read_outage_blocks_sends_from_a_new_session() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 4).await;
    gw.set_fail_reads(true);

    let mut fresh = StepStateMachine::new(gw.clone(), subject());
    assert_eq!(fresh.current_state().await.step, 1);
    assert_matches!(
        fresh.advance(&step1(), &profile()).await,
        Err(CoreError::Storage(_))
    );

    gw.set_fail_reads(false);
    assert_eq!(gw.get_current_step(subject()).await.unwrap(), 4);
    assert_eq!(gw.completed_steps(subject()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn read_outage_blocks_sends_even_with_a_known_state() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 2).await;
    gw.set_fail_reads(true);

    assert_eq!(machine.current_state().await.step, 2);
    assert_matches!(
        machine.advance(&step2(), &profile()).await,
        Err(CoreError::Storage(_))
    );

    gw.set_fail_reads(false);
    assert!(!gw.is_step_completed(subject(), 2).await.unwrap());
    assert_eq!(gw.get_current_step(subject()).await.unwrap(), 2);
}

#[tokio::test]
async fn read_outage_leaves_a_concluded_assessment_alone() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 3).await;
    machine.declare_hire(&profile()).await.unwrap();
    gw.set_fail_reads(true);

    let mut fresh = StepStateMachine::new(gw.clone(), subject());
    assert_matches!(
        fresh.advance(&step1(), &profile()).await,
        Err(CoreError::Storage(_))
    );
    assert_matches!(fresh.declare_hire(&profile()).await, Err(CoreError::Storage(_)));
    assert_matches!(
        fresh.declare_reject(&final_notice(), &profile()).await,
        Err(CoreError::Storage(_))
    );
    assert_matches!(fresh.begin_reassessment().await, Err(CoreError::Storage(_)));
    assert_matches!(fresh.repair(&profile()).await, Err(CoreError::Storage(_)));

    gw.set_fail_reads(false);
    let row = gw.get_assessment(subject()).await.unwrap().unwrap();
    assert_eq!(row.status, AssessmentStatus::Hired);
    assert_eq!(row.current_step, 3);
    assert_eq!(row.completed_at_step, Some(3));
    assert_eq!(gw.decisions().await.len(), 1);
}

#[tokio::test]
async fn pointer_lag_shows_submitted_step_until_repaired() {
    let (gw, mut machine) = setup();
    gw.set_fail_pointer_writes(true);
    assert_matches!(
        machine.advance(&step1(), &profile()).await,
        Err(CoreError::Storage(_))
    );

    let state = machine.current_state().await;
    assert_eq!(state.step, 1);
    assert_matches!(state.view, StepView::Submitted { .. });
    assert_eq!(
        state.divergence,
        Some(Divergence::PointerLag {
            step: 1,
            resume_at: 2
        })
    );
    assert_matches!(
        machine.advance(&step1(), &profile()).await,
        Err(CoreError::Conflict(_))
    );

    gw.set_fail_pointer_writes(false);
    let state = machine.repair(&profile()).await.unwrap();
    assert_eq!(state.step, 2);
    assert_eq!(state.view, StepView::Editable);
    assert_eq!(state.divergence, None);
}

// ---------------------------------------------------------------------------
// Terminal outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hire_at_step_three_concludes_the_assessment() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 3).await;

    let state = machine.declare_hire(&profile()).await.unwrap();
    assert_eq!(state.status, AssessmentStatus::Hired);
    assert_eq!(state.completed_at_step, Some(3));
    assert_eq!(state.view, StepView::Terminal { outcome: Outcome::Hired });

    let row = gw.get_assessment(subject()).await.unwrap().unwrap();
    assert_eq!(row.status, AssessmentStatus::Hired);
    assert_eq!(row.completed_at_step, Some(3));

    assert_matches!(
        machine.hydrate_draft(None, &profile()).await,
        Err(CoreError::Conflict(_))
    );
    assert_matches!(
        machine.advance(&step3(), &profile()).await,
        Err(CoreError::Conflict(_))
    );

    let decisions = gw.decisions().await;
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].decision_type, DecisionType::Hire);
    assert_eq!(decisions[0].at_step, 3);
    assert_eq!(decisions[0].hr_admin_name, "Pat Lee");
}

#[tokio::test]
async fn second_hire_changes_nothing() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 2).await;

    let first = machine.declare_hire(&profile()).await.unwrap();
    let second = machine.declare_hire(&profile()).await.unwrap();
    assert_eq!(first, second);

    let row = gw.get_assessment(subject()).await.unwrap().unwrap();
    assert_eq!(row.completed_at_step, Some(2));
    assert_eq!(gw.decisions().await.len(), 1);
}

#[tokio::test]
async fn hire_is_not_offered_at_step_one() {
    let (_gw, mut machine) = setup();
    machine.start().await.unwrap();
    assert_matches!(
        machine.declare_hire(&profile()).await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn reassessment_extend_hires_at_step_four() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 4).await;
    machine.begin_reassessment().await.unwrap();

    let state = machine
        .advance(&step4(ReassessmentDecision::Extend), &profile())
        .await
        .unwrap();
    assert_eq!(state.status, AssessmentStatus::Hired);
    assert_eq!(state.completed_at_step, Some(4));
    assert!(gw.is_step_completed(subject(), 4).await.unwrap());
}

#[tokio::test]
async fn rescind_then_final_notice_revokes() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 5).await;
    assert_eq!(machine.current_state().await.step, 5);

    let state = machine.declare_reject(&final_notice(), &profile()).await.unwrap();
    assert_eq!(state.status, AssessmentStatus::Revoked);
    assert_eq!(state.step, 6);
    assert_eq!(state.completed_at_step, Some(5));

    let again = machine.declare_reject(&final_notice(), &profile()).await.unwrap();
    assert_eq!(again, state);
    let after_hire = machine.declare_hire(&profile()).await.unwrap();
    assert_eq!(after_hire.status, AssessmentStatus::Revoked);

    let decisions = gw.decisions().await;
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].decision_type, DecisionType::Revoke);
}

#[tokio::test]
async fn final_notice_only_from_step_five() {
    let (_gw, mut machine) = setup();
    walk_to(&mut machine, 3).await;
    assert_matches!(
        machine.declare_reject(&final_notice(), &profile()).await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn reassessment_form_needs_to_be_opened() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 4).await;

    let closed = StepDraft::Reassessment {
        phase: ReassessmentPhase::TimeRemaining,
        data: Reassessment {
            decision: Some(ReassessmentDecision::Extend),
            ..Default::default()
        },
    };
    assert_matches!(
        machine.advance(&closed, &profile()).await,
        Err(CoreError::Conflict(_))
    );
    assert_matches!(
        machine.advance(&step4(ReassessmentDecision::Extend), &profile()).await,
        Err(CoreError::Conflict(_))
    );
    assert!(!gw.is_step_completed(subject(), 4).await.unwrap());
    let row = gw.get_assessment(subject()).await.unwrap().unwrap();
    assert_eq!(row.status, AssessmentStatus::InProgress);

    let state = machine.begin_reassessment().await.unwrap();
    assert_eq!(state.step4_phase, ReassessmentPhase::ReassessmentForm);
    assert_matches!(
        machine.advance(&closed, &profile()).await,
        Err(CoreError::Validation(_))
    );
}

#[tokio::test]
async fn reassessment_phase_does_not_carry_to_a_new_session() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 4).await;
    machine.begin_reassessment().await.unwrap();

    let mut other = StepStateMachine::new(gw.clone(), subject());
    assert_eq!(
        other.current_state().await.step4_phase,
        ReassessmentPhase::TimeRemaining
    );
    assert_matches!(
        other.advance(&step4(ReassessmentDecision::Extend), &profile()).await,
        Err(CoreError::Conflict(_))
    );
}

#[tokio::test]
async fn reassessment_cannot_begin_elsewhere() {
    let (_gw, mut machine) = setup();
    walk_to(&mut machine, 2).await;
    assert_matches!(
        machine.begin_reassessment().await,
        Err(CoreError::Validation(_))
    );
}

// ---------------------------------------------------------------------------
// Repair of half-finished conclusions
// ---------------------------------------------------------------------------

async fn seed_records(gw: &MemoryGateway, drafts: &[StepDraft]) {
    for draft in drafts {
        let data = draft.to_step_data().unwrap();
        gw.save_step_data(subject(), &data).await.unwrap();
    }
}

#[tokio::test]
async fn unmarked_revocation_is_repaired() {
    let (gw, mut machine) = setup();
    let mut drafts = vec![step1(), step2(), step3(), step4(ReassessmentDecision::Rescind)];
    drafts.push(StepDraft::FinalRevocation { data: final_notice() });
    seed_records(&gw, &drafts).await;
    gw.set_current_step(subject(), 6).await.unwrap();

    let state = machine.current_state().await;
    assert_eq!(state.divergence, Some(Divergence::OutcomePending));

    let state = machine.repair(&profile()).await.unwrap();
    assert_eq!(state.status, AssessmentStatus::Revoked);
    assert_eq!(state.completed_at_step, Some(5));
}

#[tokio::test]
async fn unmarked_extend_is_repaired_as_hire() {
    let (gw, mut machine) = setup();
    seed_records(
        &gw,
        &[step1(), step2(), step3(), step4(ReassessmentDecision::Extend)],
    )
    .await;
    gw.set_current_step(subject(), 4).await.unwrap();

    let state = machine.repair(&profile()).await.unwrap();
    assert_eq!(state.status, AssessmentStatus::Hired);
    assert_eq!(state.completed_at_step, Some(4));
    assert_eq!(gw.get_current_step(subject()).await.unwrap(), 4);
}

#[tokio::test]
async fn repair_without_divergence_is_a_no_op() {
    let (gw, mut machine) = setup();
    walk_to(&mut machine, 2).await;
    let state = machine.repair(&profile()).await.unwrap();
    assert_eq!(state.step, 2);
    assert!(gw.decisions().await.is_empty());
}

// ---------------------------------------------------------------------------
// Draft hydration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hydrated_notice_draws_on_earlier_steps() {
    let (_gw, mut machine) = setup();
    walk_to(&mut machine, 3).await;

    let draft = machine.hydrate_draft(None, &profile()).await.unwrap();
    let StepDraft::PreliminaryRevocation { data } = draft else {
        panic!("expected preliminary revocation draft");
    };
    assert_eq!(data.applicant_name, "Jordan Reyes");
    assert_eq!(data.company_name, "Acme Markets");
    assert_eq!(data.contact_name, "Pat Lee");
    assert_eq!(data.convictions, vec!["Theft - 2019".to_string()]);
    assert_eq!(data.date, "2026-10-18");
    assert!(data.business_days.is_empty());
}

#[tokio::test]
async fn hydrated_reassessment_carries_open_phase() {
    let (_gw, mut machine) = setup();
    walk_to(&mut machine, 4).await;
    machine.begin_reassessment().await.unwrap();

    let draft = machine.hydrate_draft(None, &profile()).await.unwrap();
    assert_matches!(
        draft,
        StepDraft::Reassessment {
            phase: ReassessmentPhase::ReassessmentForm,
            ..
        }
    );
}
