//! End-to-end exercise of the case workflow through the public API: intake
//! with a prior decision, assignment, scoring, submission, archival, and
//! the re-evaluation reset.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use equivalence::workflows::cases::memory::{
    InMemoryCaseStore, InMemoryNotificationDispatcher,
};
use equivalence::workflows::cases::{
    Actor, CaseStatus, CaseStore, CommissionCaseService, DecisionCategory, EvaluationForm,
    IntakeForm, InterpretationTier, NewCaseForm, NotificationKind, Role, UserId,
};

fn actor(id: &str, role: Role) -> Actor {
    Actor {
        id: UserId(id.to_string()),
        role,
    }
}

fn sheet(values: [(&str, u32); 8]) -> EvaluationForm {
    let scores: BTreeMap<String, String> = values
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    EvaluationForm {
        scores,
        internship_status: Some("completed".to_string()),
        ..EvaluationForm::default()
    }
}

#[test]
fn previously_decided_case_runs_the_full_cycle() {
    let store = Arc::new(InMemoryCaseStore::new());
    let dispatcher = Arc::new(InMemoryNotificationDispatcher::new());
    let administrator = actor("admin-lead", Role::Administrator);
    let reviewer = actor("prof-amrani", Role::Reviewer);
    store.register_user(administrator.id.clone(), Role::Administrator);
    store.register_user(reviewer.id.clone(), Role::Reviewer);

    let service = CommissionCaseService::new(store.clone(), dispatcher.clone());
    service.ensure_default_rubric().expect("rubric bootstrap");
    service
        .ensure_default_rubric()
        .expect("bootstrap is idempotent");

    let case = service
        .register_case(
            &administrator,
            NewCaseForm {
                reference: "EQ-2025-E2E".to_string(),
                candidate_name: "Nadia Benali".to_string(),
                arrival_date: NaiveDate::from_ymd_opt(2024, 11, 4).expect("valid date"),
                origin_country: "Algeria".to_string(),
                missing_documents: vec!["Translated master transcript".to_string()],
                received_on: None,
            },
        )
        .expect("case registered");
    assert_eq!(case.status, CaseStatus::Unprocessed);

    let case = service
        .assign(&administrator, &case.id, vec![reviewer.id.clone()])
        .expect("case assigned");
    assert_eq!(case.status, CaseStatus::Assigned);

    service
        .record_intake(
            &reviewer,
            &case.id,
            IntakeForm {
                is_new_case: false,
                has_prior_decision: true,
                prior_decision_date: NaiveDate::from_ymd_opt(2021, 7, 2),
                prior_decision_text: "Invited to a qualifying exam in 2021".to_string(),
            },
        )
        .expect("intake recorded");

    let view = service.case_view(&reviewer, &case.id).expect("view loads");
    assert!(view.show_prior_decision);

    // First pass: mandatory land law below half its maximum.
    let outcome = service
        .submit_for_validation(
            &reviewer,
            &case.id,
            &sheet([
                ("geodetic_sciences", 13),
                ("topography", 12),
                ("photogrammetry", 11),
                ("cartography", 12),
                ("land_law", 4),
                ("gis", 8),
                ("remote_sensing", 7),
                ("internships", 8),
            ]),
        )
        .expect("submission accepted");
    assert_eq!(outcome.total_score, 75);
    assert_eq!(
        outcome.interpretation.tier,
        InterpretationTier::InsufficientMandatory
    );
    assert_eq!(
        outcome.interpretation.not_acquired,
        vec!["Land law, cadastre and land management".to_string()]
    );
    // The commission ladder ignores the gate; 75 points request completion.
    assert_eq!(outcome.decision.category, DecisionCategory::FileCompletion);
    assert!(outcome
        .decision
        .recommendation
        .contains("Translated master transcript"));

    let view = service.case_view(&reviewer, &case.id).expect("view loads");
    assert!(!view.show_prior_decision, "live evaluation hides the prior decision");
    assert_eq!(view.status, CaseStatus::Evaluated);

    // The administrator sends it back; the prior decision forces a reset.
    let case = service
        .return_to_reviewer(&administrator, &case.id, "re-score land law with the new syllabus")
        .expect("case returned");
    assert_eq!(case.status, CaseStatus::Assigned);
    assert!(store
        .evaluation(&case.candidate_id)
        .expect("store readable")
        .is_none());

    let view = service.case_view(&reviewer, &case.id).expect("view loads");
    assert!(
        view.show_prior_decision,
        "with the evaluation deleted the prior decision shows again"
    );

    // Second pass: everything acquired.
    let outcome = service
        .submit_for_validation(
            &reviewer,
            &case.id,
            &sheet([
                ("geodetic_sciences", 14),
                ("topography", 13),
                ("photogrammetry", 12),
                ("cartography", 13),
                ("land_law", 8),
                ("gis", 8),
                ("remote_sensing", 7),
                ("internships", 8),
            ]),
        )
        .expect("second submission accepted");
    assert_eq!(outcome.total_score, 83);
    assert_eq!(outcome.interpretation.tier, InterpretationTier::Excellence);
    assert_eq!(
        outcome.decision.category,
        DecisionCategory::EquivalenceGranted
    );

    service
        .validate_and_archive(&administrator, &case.id)
        .expect("archival succeeds");
    let archived = store.archived_cases();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].reference, "EQ-2025-E2E");
    assert_eq!(archived[0].candidate_name, "Nadia Benali");
    assert!(archived[0].commission_opinion.contains("83 points"));

    let notifications = dispatcher.for_recipient(&administrator.id);
    assert!(notifications
        .iter()
        .any(|entry| entry.notification.kind == NotificationKind::ReadyForValidation));
}
