//! Service composing the store, the notification dispatcher, the rubric and
//! the scoring engine into the case workflow. Every mutating operation
//! checks the caller's role before touching state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    Actor, ArchivedCase, AssignmentEntry, CandidateId, CandidateProfile, CaseId, CaseRecord,
    CaseStatus, IntakeRecord, NotificationKind, Role, UserId, REQUESTED_DOCUMENT_CHECKLIST,
};
use super::evaluation::{
    classify_commission, interpret_overall, parse_evaluation, recommendation_text,
    review_mandatory_criteria, CaseEvaluation, DecisionRecord, EvaluationForm,
    InternshipCompletion, MandatoryGate, OverallInterpretation, RecommendationContext,
    ScoreViolation, SubmissionMode,
};
use super::lifecycle;
use super::repository::{
    ArchiveOutcome, CaseNotification, CaseStore, DispatchError, NotificationDispatcher,
    StoreError,
};
use super::rubric::{FixedCriterion, RubricConfig, RubricError};

fn join_violations(violations: &[ScoreViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error raised by the case service.
#[derive(Debug, thiserror::Error)]
pub enum CaseServiceError {
    #[error("validation failed: {}", join_violations(.0))]
    Validation(Vec<ScoreViolation>),
    #[error(transparent)]
    Rubric(#[from] RubricError),
    #[error("operation requires the {} role", .required.label())]
    PermissionDenied { required: Role },
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("cannot {action} a case in status '{}'", .status.label())]
    InvalidTransition {
        status: CaseStatus,
        action: &'static str,
    },
    #[error("no evaluation exists for this case yet")]
    EvaluationMissing,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Registration payload for a new case.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCaseForm {
    pub reference: String,
    pub candidate_name: String,
    pub arrival_date: NaiveDate,
    pub origin_country: String,
    #[serde(default)]
    pub missing_documents: Vec<String>,
    #[serde(default)]
    pub received_on: Option<NaiveDate>,
}

/// Intake grid payload. `is_new_case = true` wins over the prior-decision
/// fields; the two branches are mutually exclusive.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeForm {
    pub is_new_case: bool,
    #[serde(default)]
    pub has_prior_decision: bool,
    #[serde(default)]
    pub prior_decision_date: Option<NaiveDate>,
    #[serde(default)]
    pub prior_decision_text: String,
}

/// Snapshot of an evaluation for read-side views.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub total_score: u32,
    pub gate: MandatoryGate,
    pub interpretation: OverallInterpretation,
    pub internship_completion: InternshipCompletion,
}

/// Result of a final submission, echoed back to the reviewer.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub total_score: u32,
    pub interpretation: OverallInterpretation,
    pub decision: DecisionRecord,
}

/// Read model for the case screen, including the prior-decision visibility
/// rule the external UI must follow.
#[derive(Debug, Clone, Serialize)]
pub struct CaseView {
    pub id: CaseId,
    pub reference: String,
    pub status: CaseStatus,
    pub status_label: &'static str,
    pub candidate: CandidateProfile,
    pub received_on: NaiveDate,
    pub reviewers: Vec<UserId>,
    pub show_prior_decision: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_decision: Option<IntakeRecord>,
    pub has_evaluation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionRecord>,
}

static CASE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_case_ids() -> (CaseId, CandidateId) {
    let id = CASE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    (
        CaseId(format!("case-{id:06}")),
        CandidateId(format!("cand-{id:06}")),
    )
}

/// The equivalence-commission case service.
pub struct CommissionCaseService<S, N> {
    store: Arc<S>,
    dispatcher: Arc<N>,
}

impl<S, N> CommissionCaseService<S, N>
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<N>) -> Self {
        Self { store, dispatcher }
    }

    /// Idempotent bootstrap: seed the default rubric when the store is
    /// empty. Run once at startup, not inside request handlers.
    pub fn ensure_default_rubric(&self) -> Result<(), CaseServiceError> {
        self.store
            .ensure_rubric(RubricConfig::with_defaults(Utc::now()))?;
        Ok(())
    }

    fn require_role(actor: &Actor, required: Role) -> Result<(), CaseServiceError> {
        if actor.role == required {
            Ok(())
        } else {
            Err(CaseServiceError::PermissionDenied { required })
        }
    }

    fn load_case(&self, id: &CaseId) -> Result<CaseRecord, CaseServiceError> {
        self.store
            .case(id)?
            .ok_or(CaseServiceError::NotFound { entity: "case" })
    }

    fn require_assigned_reviewer(
        case: &CaseRecord,
        actor: &Actor,
    ) -> Result<(), CaseServiceError> {
        Self::require_role(actor, Role::Reviewer)?;
        if case.is_assigned_reviewer(&actor.id) {
            Ok(())
        } else {
            Err(CaseServiceError::PermissionDenied {
                required: Role::Reviewer,
            })
        }
    }

    /// Load the active rubric, normalized on the way out.
    pub fn active_rubric(&self) -> Result<RubricConfig, CaseServiceError> {
        Ok(self.store.rubric()?)
    }

    fn mutate_rubric<T>(
        &self,
        actor: &Actor,
        apply: impl FnOnce(&mut RubricConfig) -> Result<T, RubricError>,
    ) -> Result<T, CaseServiceError> {
        Self::require_role(actor, Role::Administrator)?;
        let mut rubric = self.store.rubric()?;
        let value = apply(&mut rubric)?;
        self.store.save_rubric(rubric)?;
        Ok(value)
    }

    pub fn set_fixed_max(
        &self,
        actor: &Actor,
        criterion: FixedCriterion,
        value: u32,
    ) -> Result<(), CaseServiceError> {
        self.mutate_rubric(actor, |rubric| rubric.set_fixed_max(criterion, value))
    }

    pub fn remove_fixed_criterion(
        &self,
        actor: &Actor,
        criterion: FixedCriterion,
    ) -> Result<(), CaseServiceError> {
        self.mutate_rubric(actor, |rubric| {
            rubric.remove_fixed_criterion(criterion);
            Ok(())
        })
    }

    pub fn add_custom_criterion(
        &self,
        actor: &Actor,
        name: &str,
        max_points: u32,
    ) -> Result<u32, CaseServiceError> {
        self.mutate_rubric(actor, |rubric| rubric.add_custom_criterion(name, max_points))
    }

    pub fn remove_custom_criterion(
        &self,
        actor: &Actor,
        id: u32,
    ) -> Result<(), CaseServiceError> {
        self.mutate_rubric(actor, |rubric| rubric.remove_custom_criterion(id))
    }

    pub fn add_fixed_competency(
        &self,
        actor: &Actor,
        criterion: FixedCriterion,
        label: &str,
    ) -> Result<u32, CaseServiceError> {
        self.mutate_rubric(actor, |rubric| rubric.add_fixed_competency(criterion, label))
    }

    pub fn remove_fixed_competency(
        &self,
        actor: &Actor,
        criterion: FixedCriterion,
        competency_id: u32,
    ) -> Result<(), CaseServiceError> {
        self.mutate_rubric(actor, |rubric| {
            rubric.remove_fixed_competency(criterion, competency_id)
        })
    }

    pub fn add_custom_competency(
        &self,
        actor: &Actor,
        criterion_id: u32,
        label: &str,
    ) -> Result<u32, CaseServiceError> {
        self.mutate_rubric(actor, |rubric| {
            rubric.add_custom_competency(criterion_id, label)
        })
    }

    pub fn remove_custom_competency(
        &self,
        actor: &Actor,
        criterion_id: u32,
        competency_id: u32,
    ) -> Result<(), CaseServiceError> {
        self.mutate_rubric(actor, |rubric| {
            rubric.remove_custom_competency(criterion_id, competency_id)
        })
    }

    pub fn add_internship(
        &self,
        actor: &Actor,
        name: &str,
        duration: &str,
    ) -> Result<u32, CaseServiceError> {
        self.mutate_rubric(actor, |rubric| rubric.add_internship(name, duration))
    }

    pub fn remove_internship(&self, actor: &Actor, id: u32) -> Result<(), CaseServiceError> {
        self.mutate_rubric(actor, |rubric| rubric.remove_internship(id))
    }

    /// Register a freshly received case.
    pub fn register_case(
        &self,
        actor: &Actor,
        form: NewCaseForm,
    ) -> Result<CaseRecord, CaseServiceError> {
        Self::require_role(actor, Role::Administrator)?;
        let (case_id, candidate_id) = next_case_ids();
        let record = CaseRecord {
            id: case_id,
            reference: form.reference,
            candidate_id,
            candidate: CandidateProfile {
                name: form.candidate_name,
                arrival_date: form.arrival_date,
                origin_country: form.origin_country,
                missing_documents: form.missing_documents,
            },
            received_on: form.received_on.unwrap_or_else(|| Utc::now().date_naive()),
            status: CaseStatus::Unprocessed,
            reviewers: Vec::new(),
            assignment_history: Vec::new(),
        };
        Ok(self.store.insert_case(record)?)
    }

    /// Assign the case to reviewers. Allowed while unprocessed or already
    /// assigned; each reviewer gets an assignment notification, refreshed
    /// rather than duplicated on re-assignment.
    pub fn assign(
        &self,
        actor: &Actor,
        case_id: &CaseId,
        reviewers: Vec<UserId>,
    ) -> Result<CaseRecord, CaseServiceError> {
        Self::require_role(actor, Role::Administrator)?;
        let mut case = self.load_case(case_id)?;
        if !lifecycle::can_assign(case.status) {
            return Err(CaseServiceError::InvalidTransition {
                status: case.status,
                action: "assign",
            });
        }

        case.reviewers = reviewers.clone();
        case.status = CaseStatus::Assigned;
        case.assignment_history.push(AssignmentEntry {
            administrator: actor.id.clone(),
            reviewers: reviewers.clone(),
            assigned_at: Utc::now(),
        });
        self.store.update_case(case.clone())?;

        for reviewer in &reviewers {
            self.dispatcher.notify(CaseNotification {
                recipient: reviewer.clone(),
                kind: NotificationKind::Assignment,
                case_id: case.id.clone(),
                title: format!("New case assigned: {}", case.reference),
                body: format!(
                    "Case '{}' has been assigned to you for evaluation.",
                    case.reference
                ),
            })?;
        }
        info!(case = %case.reference, reviewers = reviewers.len(), "case assigned");
        Ok(case)
    }

    /// Record the intake grid for the candidate. Reviewer-only.
    pub fn record_intake(
        &self,
        actor: &Actor,
        case_id: &CaseId,
        form: IntakeForm,
    ) -> Result<IntakeRecord, CaseServiceError> {
        let case = self.load_case(case_id)?;
        Self::require_assigned_reviewer(&case, actor)?;

        let intake = if form.is_new_case {
            IntakeRecord::new_case()
        } else if form.has_prior_decision {
            IntakeRecord::with_prior_decision(
                form.prior_decision_date,
                form.prior_decision_text,
            )
        } else {
            IntakeRecord {
                is_new_case: false,
                has_prior_decision: false,
                prior_decision_date: None,
                prior_decision_text: String::new(),
                requested_documents: REQUESTED_DOCUMENT_CHECKLIST
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
                review_note: String::new(),
            }
        };
        self.store.save_intake(&case.candidate_id, intake.clone())?;
        Ok(intake)
    }

    /// Draft save of the scoring sheet. Range and type violations reject
    /// the whole payload; missing scores are allowed.
    pub fn record_scores(
        &self,
        actor: &Actor,
        case_id: &CaseId,
        form: &EvaluationForm,
    ) -> Result<EvaluationSummary, CaseServiceError> {
        let case = self.load_case(case_id)?;
        Self::require_assigned_reviewer(&case, actor)?;
        if !lifecycle::can_evaluate(case.status) {
            return Err(CaseServiceError::InvalidTransition {
                status: case.status,
                action: "score",
            });
        }

        let rubric = self.store.rubric()?;
        let evaluation = parse_evaluation(
            case.candidate_id.clone(),
            form,
            &rubric,
            SubmissionMode::Draft,
            Utc::now(),
        )
        .map_err(CaseServiceError::Validation)?;

        let summary = Self::summarize(&evaluation, &rubric);
        self.store
            .commit_evaluation(case, evaluation, None)?;
        Ok(summary)
    }

    /// Final submission: the payload must score every active criterion.
    /// Commits the evaluation, the decision record and the status change in
    /// one step, then notifies the assigning administrator.
    pub fn submit_for_validation(
        &self,
        actor: &Actor,
        case_id: &CaseId,
        form: &EvaluationForm,
    ) -> Result<SubmissionOutcome, CaseServiceError> {
        let mut case = self.load_case(case_id)?;
        Self::require_assigned_reviewer(&case, actor)?;
        if !lifecycle::can_evaluate(case.status) {
            return Err(CaseServiceError::InvalidTransition {
                status: case.status,
                action: "submit",
            });
        }

        let rubric = self.store.rubric()?;
        let evaluation = parse_evaluation(
            case.candidate_id.clone(),
            form,
            &rubric,
            SubmissionMode::Final,
            Utc::now(),
        )
        .map_err(CaseServiceError::Validation)?;

        let total_score = evaluation.total_score(&rubric);
        let gate = review_mandatory_criteria(&evaluation, &rubric);
        let interpretation = interpret_overall(&gate, total_score);
        let category = classify_commission(total_score);
        let decision = DecisionRecord {
            total_score,
            category,
            recommendation: recommendation_text(
                category,
                RecommendationContext {
                    total_score,
                    missing_documents: &case.candidate.missing_documents,
                },
            ),
            commission_comments: String::new(),
            decided_at: Utc::now(),
        };

        case.status = CaseStatus::Evaluated;
        self.store
            .commit_evaluation(case.clone(), evaluation, Some(decision.clone()))?;

        if let Some(recipient) = lifecycle::resolve_validation_recipient(
            &case.assignment_history,
            &self.store.administrators()?,
        ) {
            self.dispatcher.notify(CaseNotification {
                recipient,
                kind: NotificationKind::ReadyForValidation,
                case_id: case.id.clone(),
                title: format!("Case ready for validation: {}", case.reference),
                body: format!(
                    "Reviewer {} has completed the evaluation of case '{}'. Total score: \
                     {} points. The case is ready for validation and archival.",
                    actor.id.0, case.reference, total_score
                ),
            })?;
        } else {
            warn!(case = %case.reference, "no administrator available for validation notice");
        }

        Ok(SubmissionOutcome {
            total_score,
            interpretation,
            decision,
        })
    }

    /// Reviewer escape hatch: forward a status message to the assigning
    /// administrator without touching any evaluation data.
    pub fn return_to_administrator(
        &self,
        actor: &Actor,
        case_id: &CaseId,
        message: &str,
    ) -> Result<(), CaseServiceError> {
        let case = self.load_case(case_id)?;
        Self::require_assigned_reviewer(&case, actor)?;

        let total = match self.store.evaluation(&case.candidate_id)? {
            Some(evaluation) => {
                let rubric = self.store.rubric()?;
                Some(evaluation.total_score(&rubric))
            }
            None => None,
        };

        let mut body = format!(
            "Reviewer {} has returned case '{}' and requests validation.",
            actor.id.0, case.reference
        );
        if let Some(total) = total {
            body.push_str(&format!(" Current total score: {total} points."));
        }
        if !message.trim().is_empty() {
            body.push_str(&format!("\n\nMessage from the reviewer: {}", message.trim()));
        }

        if let Some(recipient) = lifecycle::resolve_validation_recipient(
            &case.assignment_history,
            &self.store.administrators()?,
        ) {
            self.dispatcher.notify(CaseNotification {
                recipient,
                kind: NotificationKind::Returned,
                case_id: case.id.clone(),
                title: format!("Case returned by reviewer: {}", case.reference),
                body,
            })?;
        }
        Ok(())
    }

    /// Validate the evaluation and archive the case as an immutable
    /// historical record. Re-validating an already archived reference is a
    /// warned no-op, not an error.
    pub fn validate_and_archive(
        &self,
        actor: &Actor,
        case_id: &CaseId,
    ) -> Result<ArchiveOutcome, CaseServiceError> {
        Self::require_role(actor, Role::Administrator)?;
        let mut case = self.load_case(case_id)?;
        let evaluation = self
            .store
            .evaluation(&case.candidate_id)?
            .ok_or(CaseServiceError::EvaluationMissing)?;

        let rubric = self.store.rubric()?;
        let total = evaluation.total_score(&rubric);
        let record = ArchivedCase {
            reference: case.reference.clone(),
            candidate_name: case.candidate.name.clone(),
            origin_country: case.candidate.origin_country.clone(),
            received_on: case.received_on,
            archived_on: Utc::now().date_naive(),
            commission_opinion: format!(
                "Evaluation complete. Total score: {total} points. Detailed scores: {}.",
                evaluation.score_breakdown(&rubric)
            ),
            archived_by: actor.id.clone(),
        };

        let outcome = self.store.archive(record)?;
        match outcome {
            ArchiveOutcome::Archived => {
                case.status = CaseStatus::Archived;
                self.store.update_case(case.clone())?;
                info!(case = %case.reference, "case validated and archived");
            }
            ArchiveOutcome::AlreadyArchived => {
                warn!(case = %case.reference, "case was already archived");
            }
        }
        Ok(outcome)
    }

    /// Send the case back to its reviewers. When the file carries a prior
    /// commission decision the existing evaluation and decision record are
    /// deleted so the re-evaluation starts clean; without a prior decision
    /// the data is left untouched and only the status changes.
    pub fn return_to_reviewer(
        &self,
        actor: &Actor,
        case_id: &CaseId,
        message: &str,
    ) -> Result<CaseRecord, CaseServiceError> {
        Self::require_role(actor, Role::Administrator)?;
        let mut case = self.load_case(case_id)?;
        if !lifecycle::can_return_to_reviewer(case.status) {
            return Err(CaseServiceError::InvalidTransition {
                status: case.status,
                action: "return to reviewer",
            });
        }

        if let Some(mut intake) = self.store.intake(&case.candidate_id)? {
            if intake.has_prior_decision {
                self.store
                    .delete_evaluation_and_decision(&case.candidate_id)?;
                intake.review_note = format!(
                    "Reviewed by the administrator on {}. {}",
                    Utc::now().date_naive(),
                    message.trim()
                );
                self.store.save_intake(&case.candidate_id, intake)?;
                info!(case = %case.reference, "evaluation reset for re-evaluation");
            }
        }

        case.status = CaseStatus::Assigned;
        self.store.update_case(case.clone())?;

        for reviewer in &case.reviewers {
            self.dispatcher.notify(CaseNotification {
                recipient: reviewer.clone(),
                kind: NotificationKind::Returned,
                case_id: case.id.clone(),
                title: format!("Case returned: {}", case.reference),
                body: format!(
                    "The administrator has returned case '{}' for evaluation. Message: {}",
                    case.reference,
                    message.trim()
                ),
            })?;
        }
        Ok(case)
    }

    /// Read model for the case screen. Administrators see every case;
    /// reviewers only the ones assigned to them.
    pub fn case_view(&self, actor: &Actor, case_id: &CaseId) -> Result<CaseView, CaseServiceError> {
        let case = self.load_case(case_id)?;
        if actor.role == Role::Reviewer && !case.is_assigned_reviewer(&actor.id) {
            return Err(CaseServiceError::PermissionDenied {
                required: Role::Reviewer,
            });
        }

        let rubric = self.store.rubric()?;
        let evaluation = self.store.evaluation(&case.candidate_id)?.map(|mut ev| {
            ev.migrate_checklists(&rubric);
            ev
        });
        let intake = self.store.intake(&case.candidate_id)?;
        let decision = self.store.decision(&case.candidate_id)?;

        let has_evaluation = evaluation.is_some();
        let show_prior_decision =
            lifecycle::prior_decision_visible(intake.as_ref(), has_evaluation);
        let summary = evaluation
            .as_ref()
            .map(|evaluation| Self::summarize(evaluation, &rubric));

        Ok(CaseView {
            id: case.id.clone(),
            reference: case.reference.clone(),
            status: case.status,
            status_label: case.status.label(),
            candidate: case.candidate.clone(),
            received_on: case.received_on,
            reviewers: case.reviewers.clone(),
            show_prior_decision,
            prior_decision: intake.filter(|record| record.has_prior_decision),
            has_evaluation,
            evaluation: summary,
            decision,
        })
    }

    fn summarize(evaluation: &CaseEvaluation, rubric: &RubricConfig) -> EvaluationSummary {
        let total_score = evaluation.total_score(rubric);
        let gate = review_mandatory_criteria(evaluation, rubric);
        let interpretation = interpret_overall(&gate, total_score);
        EvaluationSummary {
            total_score,
            gate,
            interpretation,
            internship_completion: evaluation.internship_completion,
        }
    }
}
