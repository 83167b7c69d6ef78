//! Equivalence case workflow: intake, assignment, rubric-driven scoring,
//! commission decision and archival.
//!
//! The scoring rubric is administrator-editable ([`rubric`]), evaluations
//! are validated against it at the form boundary ([`evaluation`]), the
//! mandatory-criteria gate can veto an otherwise passing total, and the
//! case lifecycle decides what is visible and who may act ([`lifecycle`],
//! [`service`]).

pub mod domain;
pub(crate) mod evaluation;
pub(crate) mod lifecycle;
pub mod memory;
pub mod repository;
pub mod router;
pub(crate) mod rubric;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ArchivedCase, AssignmentEntry, CandidateId, CandidateProfile, CaseId, CaseRecord,
    CaseStatus, IntakeRecord, NotificationKind, Role, UserId, REQUESTED_DOCUMENT_CHECKLIST,
};
pub use evaluation::{
    classify_commission, interpret_overall, parse_evaluation, recommendation_text,
    review_mandatory_criteria, CaseEvaluation, CriterionEntry, CriterionGateEntry,
    CriterionNotesForm, CustomScoreEntry, DecisionCategory, DecisionRecord, EvaluationForm,
    InternshipCompletion, InterpretationTier, MandatoryGate, OverallInterpretation,
    RecommendationContext, ScoreViolation, SubmissionMode,
};
pub use lifecycle::{prior_decision_visible, resolve_validation_recipient};
pub use repository::{
    ArchiveOutcome, CaseNotification, CaseStore, DispatchError, NotificationDispatcher,
    StoreError,
};
pub use router::case_router;
pub use rubric::{
    default_internships, CompetencyItem, CustomCriterion, FixedCriterion, InternshipTemplate,
    RubricConfig, RubricError,
};
pub use service::{
    CaseServiceError, CaseView, CommissionCaseService, EvaluationSummary, IntakeForm,
    NewCaseForm, SubmissionOutcome,
};
