use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for equivalence cases (one per dossier received by
/// the commission secretariat).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub String);

/// Identifier wrapper for the candidate attached to a case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Identifier wrapper for commission users (administrators and reviewers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Roles recognized by the capability checks on every mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Reviewer,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Reviewer => "reviewer",
        }
    }
}

/// The authenticated caller, as supplied by the identity boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Unprocessed,
    Assigned,
    Evaluated,
    Archived,
}

impl CaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unprocessed => "unprocessed",
            Self::Assigned => "assigned",
            Self::Evaluated => "evaluated",
            Self::Archived => "archived",
        }
    }
}

/// Candidate details carried on the case record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: String,
    pub arrival_date: NaiveDate,
    pub origin_country: String,
    /// Documents the secretariat flagged as missing at intake; surfaced in
    /// file-completion recommendations.
    #[serde(default)]
    pub missing_documents: Vec<String>,
}

/// One assignment performed by an administrator. The most recent entry
/// decides who receives the ready-for-validation notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEntry {
    pub administrator: UserId,
    pub reviewers: Vec<UserId>,
    pub assigned_at: DateTime<Utc>,
}

/// Root entity of the workflow: one equivalence request and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: CaseId,
    /// Human-facing reference; also the idempotency key for archival.
    pub reference: String,
    pub candidate_id: CandidateId,
    pub candidate: CandidateProfile,
    pub received_on: NaiveDate,
    pub status: CaseStatus,
    pub reviewers: Vec<UserId>,
    #[serde(default)]
    pub assignment_history: Vec<AssignmentEntry>,
}

impl CaseRecord {
    pub fn is_assigned_reviewer(&self, user: &UserId) -> bool {
        self.reviewers.iter().any(|reviewer| reviewer == user)
    }
}

/// Document checklist requested from candidates whose file carries a prior
/// commission decision.
pub const REQUESTED_DOCUMENT_CHECKLIST: [&str; 7] = [
    "Certified copies of both diplomas obtained",
    "Proof of the years of study for the bachelor and the master",
    "Detailed course programs for the bachelor and the master (original version plus certified translation)",
    "Translated transcripts for the bachelor and the master",
    "Internship certificates or reports in topography, geodesy, photogrammetry and cadastral techniques",
    "Curriculum vitae of the candidate",
    "Copy of the national identity card",
];

/// Intake grid recorded by the reviewer before scoring starts: is this a
/// fresh file, or one the commission already decided on?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub is_new_case: bool,
    pub has_prior_decision: bool,
    pub prior_decision_date: Option<NaiveDate>,
    pub prior_decision_text: String,
    pub requested_documents: Vec<String>,
    /// Set when an administrator sends the case back for re-evaluation.
    #[serde(default)]
    pub review_note: String,
}

impl IntakeRecord {
    pub fn new_case() -> Self {
        Self {
            is_new_case: true,
            has_prior_decision: false,
            prior_decision_date: None,
            prior_decision_text: String::new(),
            requested_documents: Vec::new(),
            review_note: String::new(),
        }
    }

    /// Build the intake record for a previously decided file. Seeds the
    /// standard requested-document checklist.
    pub fn with_prior_decision(date: Option<NaiveDate>, text: impl Into<String>) -> Self {
        Self {
            is_new_case: false,
            has_prior_decision: true,
            prior_decision_date: date,
            prior_decision_text: text.into(),
            requested_documents: REQUESTED_DOCUMENT_CHECKLIST
                .iter()
                .map(|item| (*item).to_string())
                .collect(),
            review_note: String::new(),
        }
    }
}

/// Notification kinds admitted by the dispatcher contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Assignment,
    ReadyForValidation,
    Returned,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::ReadyForValidation => "ready_for_validation",
            Self::Returned => "returned",
        }
    }
}

/// Immutable historical record produced when an administrator validates and
/// archives a case. Decoupled from the live case on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedCase {
    pub reference: String,
    pub candidate_name: String,
    pub origin_country: String,
    pub received_on: NaiveDate,
    pub archived_on: NaiveDate,
    pub commission_opinion: String,
    pub archived_by: UserId,
}
