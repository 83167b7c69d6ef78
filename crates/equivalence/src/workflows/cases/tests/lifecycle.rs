use chrono::{NaiveDate, Utc};

use super::common::{admin, assigned_case, fixture, full_scores, registered_case, reviewer, scores};
use crate::workflows::cases::domain::{
    Actor, CandidateId, CandidateProfile, CaseId, CaseRecord, CaseStatus, NotificationKind, Role,
    UserId,
};
use crate::workflows::cases::evaluation::{parse_evaluation, SubmissionMode};
use crate::workflows::cases::repository::{ArchiveOutcome, CaseStore, StoreError};
use crate::workflows::cases::service::{CaseServiceError, IntakeForm};

fn prior_decision_intake() -> IntakeForm {
    IntakeForm {
        is_new_case: false,
        has_prior_decision: true,
        prior_decision_date: NaiveDate::from_ymd_opt(2022, 6, 30),
        prior_decision_text: "File completion requested in 2022".to_string(),
    }
}

#[test]
fn assignment_is_rejected_after_evaluation() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-010");
    fx.service
        .submit_for_validation(&reviewer(), &case.id, &full_scores([12, 12, 12, 12, 8, 8, 8, 8]))
        .expect("submission succeeds");

    let result = fx.service.assign(&admin(), &case.id, vec![reviewer().id]);
    assert!(matches!(
        result,
        Err(CaseServiceError::InvalidTransition {
            status: CaseStatus::Evaluated,
            ..
        })
    ));
}

#[test]
fn reassignment_refreshes_the_notification_instead_of_duplicating() {
    let fx = fixture();
    let case = registered_case(&fx, "EQ-2025-011");
    fx.service
        .assign(&admin(), &case.id, vec![reviewer().id])
        .expect("first assignment");
    fx.service
        .assign(&admin(), &case.id, vec![reviewer().id])
        .expect("second assignment");

    let stored = fx.dispatcher.for_recipient(&reviewer().id);
    assert_eq!(stored.len(), 1, "one notification per (recipient, case, kind)");
    assert_eq!(stored[0].delivered_times, 2);
    assert!(!stored[0].read);
    assert_eq!(stored[0].notification.kind, NotificationKind::Assignment);
}

#[test]
fn submission_notifies_the_assigning_administrator() {
    let fx = fixture();
    let second_admin = Actor {
        id: UserId("admin-2".to_string()),
        role: Role::Administrator,
    };
    fx.store.register_user(second_admin.id.clone(), Role::Administrator);

    let case = registered_case(&fx, "EQ-2025-012");
    fx.service
        .assign(&second_admin, &case.id, vec![reviewer().id])
        .expect("assignment");
    let outcome = fx
        .service
        .submit_for_validation(&reviewer(), &case.id, &full_scores([12, 12, 12, 12, 8, 8, 8, 8]))
        .expect("submission");
    assert_eq!(outcome.total_score, 80);

    let stored = fx.dispatcher.for_recipient(&second_admin.id);
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].notification.kind,
        NotificationKind::ReadyForValidation
    );
    assert!(stored[0].notification.body.contains("80 points"));
    assert!(fx.dispatcher.for_recipient(&admin().id).is_empty());

    let record = fx
        .store
        .case(&case.id)
        .expect("store readable")
        .expect("case present");
    assert_eq!(record.status, CaseStatus::Evaluated);
    assert!(fx
        .store
        .decision(&case.candidate_id)
        .expect("store readable")
        .is_some());
}

#[test]
fn submission_falls_back_to_any_administrator_without_history() {
    let fx = fixture();
    // A case assigned out-of-band, with no assignment history recorded.
    let case = CaseRecord {
        id: CaseId("case-manual".to_string()),
        reference: "EQ-2025-013".to_string(),
        candidate_id: CandidateId("cand-manual".to_string()),
        candidate: CandidateProfile {
            name: "Imported candidate".to_string(),
            arrival_date: NaiveDate::from_ymd_opt(2024, 2, 2).expect("valid date"),
            origin_country: "Tunisia".to_string(),
            missing_documents: Vec::new(),
        },
        received_on: NaiveDate::from_ymd_opt(2024, 2, 5).expect("valid date"),
        status: CaseStatus::Assigned,
        reviewers: vec![reviewer().id],
        assignment_history: Vec::new(),
    };
    fx.store.insert_case(case.clone()).expect("insert");

    fx.service
        .submit_for_validation(&reviewer(), &case.id, &full_scores([12, 12, 12, 12, 8, 8, 8, 8]))
        .expect("submission");

    let stored = fx.dispatcher.for_recipient(&admin().id);
    assert_eq!(stored.len(), 1, "falls back to a known administrator");
}

#[test]
fn return_to_administrator_keeps_evaluation_data() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-014");
    fx.service
        .record_scores(&reviewer(), &case.id, &scores(&[("topography", "9")]))
        .expect("draft saved");

    fx.service
        .return_to_administrator(&reviewer(), &case.id, "please double-check the transcripts")
        .expect("return succeeds");

    let evaluation = fx
        .store
        .evaluation(&case.candidate_id)
        .expect("store readable")
        .expect("evaluation untouched");
    assert!(evaluation.has_any_score());

    let record = fx
        .store
        .case(&case.id)
        .expect("store readable")
        .expect("case present");
    assert_eq!(record.status, CaseStatus::Assigned, "status is not advanced");

    let stored = fx.dispatcher.for_recipient(&admin().id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].notification.kind, NotificationKind::Returned);
    assert!(stored[0]
        .notification
        .body
        .contains("double-check the transcripts"));
}

#[test]
fn validate_and_archive_is_idempotent() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-015");
    fx.service
        .submit_for_validation(&reviewer(), &case.id, &full_scores([12, 12, 12, 12, 8, 8, 8, 8]))
        .expect("submission");

    let first = fx
        .service
        .validate_and_archive(&admin(), &case.id)
        .expect("first validation");
    assert_eq!(first, ArchiveOutcome::Archived);

    let record = fx
        .store
        .case(&case.id)
        .expect("store readable")
        .expect("case present");
    assert_eq!(record.status, CaseStatus::Archived);

    let archived = fx.store.archived_cases();
    assert_eq!(archived.len(), 1);
    assert!(archived[0].commission_opinion.contains("80 points"));
    assert!(archived[0].commission_opinion.contains("Topography: 12/16"));

    let second = fx
        .service
        .validate_and_archive(&admin(), &case.id)
        .expect("re-validation is not an error");
    assert_eq!(second, ArchiveOutcome::AlreadyArchived);
    assert_eq!(fx.store.archived_cases().len(), 1);
}

#[test]
fn validate_requires_an_evaluation() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-016");
    let result = fx.service.validate_and_archive(&admin(), &case.id);
    assert!(matches!(result, Err(CaseServiceError::EvaluationMissing)));
}

#[test]
fn return_to_reviewer_resets_a_previously_decided_case() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-017");
    fx.service
        .record_intake(&reviewer(), &case.id, prior_decision_intake())
        .expect("intake recorded");
    fx.service
        .submit_for_validation(&reviewer(), &case.id, &full_scores([12, 12, 12, 12, 8, 8, 8, 8]))
        .expect("submission");

    let record = fx
        .service
        .return_to_reviewer(&admin(), &case.id, "new transcripts arrived")
        .expect("return succeeds");
    assert_eq!(record.status, CaseStatus::Assigned);

    assert!(
        fx.store
            .evaluation(&case.candidate_id)
            .expect("store readable")
            .is_none(),
        "stale scores are deleted"
    );
    assert!(fx
        .store
        .decision(&case.candidate_id)
        .expect("store readable")
        .is_none());

    let intake = fx
        .store
        .intake(&case.candidate_id)
        .expect("store readable")
        .expect("intake present");
    assert!(intake.review_note.contains("new transcripts arrived"));

    let stored = fx.dispatcher.for_recipient(&reviewer().id);
    assert!(stored
        .iter()
        .any(|entry| entry.notification.kind == NotificationKind::Returned));
}

#[test]
fn return_to_reviewer_keeps_data_without_prior_decision() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-018");
    fx.service
        .record_intake(
            &reviewer(),
            &case.id,
            IntakeForm {
                is_new_case: true,
                has_prior_decision: false,
                prior_decision_date: None,
                prior_decision_text: String::new(),
            },
        )
        .expect("intake recorded");
    fx.service
        .submit_for_validation(&reviewer(), &case.id, &full_scores([12, 12, 12, 12, 8, 8, 8, 8]))
        .expect("submission");

    fx.service
        .return_to_reviewer(&admin(), &case.id, "please revisit the GIS score")
        .expect("return succeeds");

    assert!(
        fx.store
            .evaluation(&case.candidate_id)
            .expect("store readable")
            .is_some(),
        "evaluation survives when there is no prior decision"
    );
    assert!(fx
        .store
        .decision(&case.candidate_id)
        .expect("store readable")
        .is_some());
}

#[test]
fn prior_decision_panel_hides_once_scores_exist() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-019");
    fx.service
        .record_intake(&reviewer(), &case.id, prior_decision_intake())
        .expect("intake recorded");

    let before = fx
        .service
        .case_view(&reviewer(), &case.id)
        .expect("view loads");
    assert!(before.show_prior_decision);
    let intake = before.prior_decision.expect("prior decision attached");
    assert!(intake.has_prior_decision);
    assert_eq!(intake.requested_documents.len(), 7);

    fx.service
        .record_scores(&reviewer(), &case.id, &scores(&[("gis", "3")]))
        .expect("draft saved");

    let after = fx
        .service
        .case_view(&reviewer(), &case.id)
        .expect("view loads");
    assert!(
        !after.show_prior_decision,
        "any persisted evaluation suppresses the prior-decision panel"
    );
    assert!(after.has_evaluation);
    assert!(
        after.prior_decision.is_some(),
        "the intake record itself is still there"
    );
}

#[test]
fn intake_branches_are_mutually_exclusive() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-020");
    let intake = fx
        .service
        .record_intake(
            &reviewer(),
            &case.id,
            IntakeForm {
                is_new_case: true,
                has_prior_decision: true,
                prior_decision_date: NaiveDate::from_ymd_opt(2020, 1, 1),
                prior_decision_text: "ignored".to_string(),
            },
        )
        .expect("intake recorded");
    assert!(intake.is_new_case);
    assert!(!intake.has_prior_decision, "new-case wins over prior decision");
    assert!(intake.prior_decision_date.is_none());
    assert!(intake.requested_documents.is_empty());
}

#[test]
fn stale_rubric_commit_is_rejected() {
    let fx = fixture();
    let case = assigned_case(&fx, "EQ-2025-021");
    let rubric = fx.service.active_rubric().expect("rubric loads");
    let evaluation = parse_evaluation(
        case.candidate_id.clone(),
        &scores(&[("topography", "9")]),
        &rubric,
        SubmissionMode::Draft,
        Utc::now(),
    )
    .expect("draft parses");

    // An administrator changes the rubric between validation and commit.
    fx.service
        .set_fixed_max(&admin(), crate::workflows::cases::rubric::FixedCriterion::Topography, 8)
        .expect("rubric mutation");

    let result = fx.store.commit_evaluation(case, evaluation, None);
    assert!(matches!(result, Err(StoreError::StaleRubric)));
}

#[test]
fn role_checks_guard_every_transition() {
    let fx = fixture();
    let case = registered_case(&fx, "EQ-2025-022");

    assert!(matches!(
        fx.service.assign(&reviewer(), &case.id, vec![reviewer().id]),
        Err(CaseServiceError::PermissionDenied { .. })
    ));

    let case = assigned_case(&fx, "EQ-2025-023");
    assert!(matches!(
        fx.service
            .record_scores(&admin(), &case.id, &scores(&[("gis", "3")])),
        Err(CaseServiceError::PermissionDenied { .. })
    ));

    let outsider = Actor {
        id: UserId("rev-9".to_string()),
        role: Role::Reviewer,
    };
    assert!(matches!(
        fx.service
            .record_scores(&outsider, &case.id, &scores(&[("gis", "3")])),
        Err(CaseServiceError::PermissionDenied { .. })
    ));
    assert!(matches!(
        fx.service.case_view(&outsider, &case.id),
        Err(CaseServiceError::PermissionDenied { .. })
    ));

    assert!(matches!(
        fx.service.return_to_reviewer(&reviewer(), &case.id, "nope"),
        Err(CaseServiceError::PermissionDenied { .. })
    ));
    assert!(matches!(
        fx.service.validate_and_archive(&reviewer(), &case.id),
        Err(CaseServiceError::PermissionDenied { .. })
    ));
}

#[test]
fn unknown_case_is_not_found() {
    let fx = fixture();
    let result = fx
        .service
        .case_view(&admin(), &CaseId("case-missing".to_string()));
    assert!(matches!(result, Err(CaseServiceError::NotFound { .. })));
}
