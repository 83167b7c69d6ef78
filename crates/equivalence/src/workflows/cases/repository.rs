//! Contracts toward the surrounding system: the persistence store and the
//! notification dispatcher. The service module only ever talks to these
//! traits so it can be exercised against in-memory fakes.

use super::domain::{
    ArchivedCase, CandidateId, CaseId, CaseRecord, IntakeRecord, NotificationKind, UserId,
};
use super::evaluation::{CaseEvaluation, DecisionRecord};
use super::rubric::RubricConfig;

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("rubric changed since the evaluation was validated")]
    StaleRubric,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of an archive request keyed by case reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Archived,
    AlreadyArchived,
}

/// Persistence contract. Write methods commit whole records; the store must
/// apply each call atomically so overlapping submissions never interleave
/// partial criterion updates.
pub trait CaseStore: Send + Sync {
    /// The active rubric, normalized. Never fails with not-found once
    /// [`ensure_default_rubric`](crate::workflows::cases::service) has run.
    fn rubric(&self) -> Result<RubricConfig, StoreError>;

    /// Persist a rubric mutation, bump the version, and return it.
    fn save_rubric(&self, rubric: RubricConfig) -> Result<u64, StoreError>;

    /// Seed the default rubric when none exists. Idempotent.
    fn ensure_rubric(&self, default: RubricConfig) -> Result<(), StoreError>;

    fn insert_case(&self, record: CaseRecord) -> Result<CaseRecord, StoreError>;
    fn case(&self, id: &CaseId) -> Result<Option<CaseRecord>, StoreError>;
    fn update_case(&self, record: CaseRecord) -> Result<(), StoreError>;

    fn intake(&self, candidate: &CandidateId) -> Result<Option<IntakeRecord>, StoreError>;
    fn save_intake(
        &self,
        candidate: &CandidateId,
        record: IntakeRecord,
    ) -> Result<(), StoreError>;

    fn evaluation(&self, candidate: &CandidateId) -> Result<Option<CaseEvaluation>, StoreError>;

    /// Commit an evaluation (and optionally the decision record and an
    /// updated case) in one atomic step. Fails with [`StoreError::StaleRubric`]
    /// when `evaluation.rubric_version` no longer matches the stored rubric,
    /// so scores are never accepted against a maximum the administrator has
    /// since changed.
    fn commit_evaluation(
        &self,
        case: CaseRecord,
        evaluation: CaseEvaluation,
        decision: Option<DecisionRecord>,
    ) -> Result<(), StoreError>;

    fn decision(&self, candidate: &CandidateId) -> Result<Option<DecisionRecord>, StoreError>;

    /// Remove the evaluation and decision record together, forcing a clean
    /// re-entry on the next scoring access.
    fn delete_evaluation_and_decision(&self, candidate: &CandidateId) -> Result<(), StoreError>;

    /// Write the immutable archive snapshot. A snapshot with the same case
    /// reference already present makes this a no-op.
    fn archive(&self, record: ArchivedCase) -> Result<ArchiveOutcome, StoreError>;

    /// Known administrator accounts, for the any-administrator notification
    /// fallback.
    fn administrators(&self) -> Result<Vec<UserId>, StoreError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// A notification handed to the surrounding system. Fire-and-forget from
/// the core's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseNotification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub case_id: CaseId,
    pub title: String,
    pub body: String,
}

/// Outbound notification contract. Implementations must upsert on
/// (recipient, case, kind): re-dispatching the same key refreshes the
/// stored notification instead of duplicating it, which is what makes
/// re-assignment idempotent.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, notification: CaseNotification) -> Result<(), DispatchError>;
}
