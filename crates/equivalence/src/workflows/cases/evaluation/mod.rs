//! Per-candidate scoring record and the validation step that turns the
//! loosely-typed form payload into the typed evaluation.

pub(crate) mod decision;
pub(crate) mod gate;

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::CandidateId;
use super::rubric::{FixedCriterion, RubricConfig};

pub use decision::{
    classify_commission, interpret_overall, recommendation_text, DecisionCategory,
    DecisionRecord, InterpretationTier, OverallInterpretation, RecommendationContext,
};
pub use gate::{review_mandatory_criteria, CriterionGateEntry, MandatoryGate};

/// Scores and notes for one fixed criterion. `score: None` means "not yet
/// entered" and is excluded from totals rather than defaulted to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionEntry {
    pub score: Option<u32>,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub comments: String,
    /// Checked competency ids from the rubric checklist.
    #[serde(default)]
    pub checked_competencies: BTreeSet<u32>,
    /// Pre-redesign records stored checked list positions instead of ids.
    /// Drained into `checked_competencies` by [`CaseEvaluation::migrate_checklists`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checked_positions: Vec<usize>,
}

/// Scores and notes for one custom criterion, keyed by the rubric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomScoreEntry {
    pub criterion_id: u32,
    pub score: Option<u32>,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub checked_competencies: BTreeSet<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checked_positions: Vec<usize>,
}

/// Whether the reviewer marked the internship program finished. The two
/// checkboxes on the evaluation sheet are mutually exclusive, hence one enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternshipCompletion {
    #[default]
    Unset,
    Completed,
    NotCompleted,
}

/// The scoring record for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseEvaluation {
    pub candidate_id: CandidateId,
    /// Rubric version the scores were validated against; the store rejects
    /// commits once an administrator has changed the rubric underneath.
    pub rubric_version: u64,
    pub fixed_entries: BTreeMap<FixedCriterion, CriterionEntry>,
    pub custom_entries: Vec<CustomScoreEntry>,
    pub completed_internships: BTreeSet<u32>,
    pub internship_completion: InternshipCompletion,
    #[serde(default)]
    pub incomplete_note: String,
    pub updated_at: DateTime<Utc>,
}

impl CaseEvaluation {
    /// An untouched evaluation mirroring the active rubric, created on
    /// first access to the scoring screen.
    pub fn empty(candidate_id: CandidateId, rubric: &RubricConfig, now: DateTime<Utc>) -> Self {
        Self {
            candidate_id,
            rubric_version: rubric.version,
            fixed_entries: rubric
                .active_fixed()
                .map(|criterion| (criterion, CriterionEntry::default()))
                .collect(),
            custom_entries: rubric
                .custom_criteria
                .iter()
                .map(|criterion| CustomScoreEntry {
                    criterion_id: criterion.id,
                    score: None,
                    contents: String::new(),
                    comments: String::new(),
                    checked_competencies: BTreeSet::new(),
                    checked_positions: Vec::new(),
                })
                .collect(),
            completed_internships: BTreeSet::new(),
            internship_completion: InternshipCompletion::Unset,
            incomplete_note: String::new(),
            updated_at: now,
        }
    }

    /// Sum of all entered scores: fixed criteria still on the sheet plus
    /// custom criteria still present in the rubric. Absent scores are
    /// skipped, so a partially completed evaluation has a partial total.
    pub fn total_score(&self, rubric: &RubricConfig) -> u32 {
        let fixed: u32 = self
            .fixed_entries
            .iter()
            .filter(|(criterion, _)| !rubric.removed_fixed.contains(criterion))
            .filter_map(|(_, entry)| entry.score)
            .sum();
        let custom: u32 = self
            .custom_entries
            .iter()
            .filter(|entry| rubric.custom_criterion(entry.criterion_id).is_some())
            .filter_map(|entry| entry.score)
            .sum();
        fixed + custom
    }

    pub fn has_any_score(&self) -> bool {
        self.fixed_entries.values().any(|entry| entry.score.is_some())
            || self.custom_entries.iter().any(|entry| entry.score.is_some())
    }

    pub fn custom_entry(&self, criterion_id: u32) -> Option<&CustomScoreEntry> {
        self.custom_entries
            .iter()
            .find(|entry| entry.criterion_id == criterion_id)
    }

    /// Migrate pre-redesign checklist marks stored as list positions into
    /// stable competency ids, using the current rubric checklists. Run on
    /// every load; a no-op for already-migrated records.
    pub fn migrate_checklists(&mut self, rubric: &RubricConfig) {
        for (criterion, entry) in &mut self.fixed_entries {
            let checklist = rubric.competencies_for(*criterion);
            for position in entry.checked_positions.drain(..) {
                if let Some(item) = checklist.get(position) {
                    entry.checked_competencies.insert(item.id);
                }
            }
        }
        for entry in &mut self.custom_entries {
            let Some(criterion) = rubric.custom_criterion(entry.criterion_id) else {
                entry.checked_positions.clear();
                continue;
            };
            for position in entry.checked_positions.drain(..) {
                if let Some(item) = criterion.competencies.get(position) {
                    entry.checked_competencies.insert(item.id);
                }
            }
        }
    }

    /// Per-criterion score summary used for the archived commission opinion.
    pub fn score_breakdown(&self, rubric: &RubricConfig) -> String {
        let mut parts = Vec::new();
        for criterion in rubric.active_fixed() {
            let score = self
                .fixed_entries
                .get(&criterion)
                .and_then(|entry| entry.score)
                .unwrap_or(0);
            parts.push(format!(
                "{}: {}/{}",
                criterion.label(),
                score,
                rubric.max_for(criterion)
            ));
        }
        for criterion in &rubric.custom_criteria {
            let score = self
                .custom_entry(criterion.id)
                .and_then(|entry| entry.score)
                .unwrap_or(0);
            parts.push(format!("{}: {}/{}", criterion.name, score, criterion.max_points));
        }
        parts.join(", ")
    }
}

/// Free-text fields attached to one criterion on the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionNotesForm {
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub comments: String,
}

/// The untrusted scoring payload from the form boundary. Criterion keys are
/// fixed-criterion slugs or `custom_<id>`; score values are raw strings
/// where the empty string means "not entered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationForm {
    #[serde(default)]
    pub scores: BTreeMap<String, String>,
    #[serde(default)]
    pub notes: BTreeMap<String, CriterionNotesForm>,
    #[serde(default)]
    pub checked_competencies: BTreeMap<String, Vec<u32>>,
    #[serde(default)]
    pub completed_internships: Vec<u32>,
    /// `completed` or `not_completed`; absent leaves the state unset.
    #[serde(default)]
    pub internship_status: Option<String>,
    #[serde(default)]
    pub incomplete_internship_note: String,
}

/// Draft saves allow missing scores; final submission requires every active
/// criterion to be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    Draft,
    Final,
}

/// A single rejected aspect of a submission. All violations for a payload
/// are collected and returned together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreViolation {
    #[error("unknown criterion '{key}'")]
    UnknownCriterion { key: String },
    #[error("score for {criterion} must be a whole number, got '{raw}'")]
    NotAnInteger { criterion: String, raw: String },
    #[error("score for {criterion} must be between 0 and {max}, got {value}")]
    OutOfRange {
        criterion: String,
        value: i64,
        max: u32,
    },
    #[error("missing score for {criterion}")]
    MissingScore { criterion: String },
    #[error("an explanation is required when internships are marked not completed")]
    MissingInternshipNote,
    #[error("unknown internship id {id}")]
    UnknownInternship { id: u32 },
    #[error("internship status must be 'completed' or 'not_completed', got '{raw}'")]
    InvalidInternshipStatus { raw: String },
}

enum CriterionKey {
    Fixed(FixedCriterion),
    Custom(u32),
}

fn resolve_key(key: &str, rubric: &RubricConfig) -> Option<CriterionKey> {
    if let Ok(criterion) = FixedCriterion::from_str(key) {
        if !rubric.removed_fixed.contains(&criterion) {
            return Some(CriterionKey::Fixed(criterion));
        }
        return None;
    }
    let id = key.strip_prefix("custom_")?.parse::<u32>().ok()?;
    rubric.custom_criterion(id).map(|_| CriterionKey::Custom(id))
}

/// Validate a form payload against the rubric and build the typed
/// evaluation. Either the whole payload is accepted or every violation is
/// reported at once; nothing is partially applied.
pub fn parse_evaluation(
    candidate_id: CandidateId,
    form: &EvaluationForm,
    rubric: &RubricConfig,
    mode: SubmissionMode,
    now: DateTime<Utc>,
) -> Result<CaseEvaluation, Vec<ScoreViolation>> {
    let mut violations = Vec::new();
    let mut evaluation = CaseEvaluation::empty(candidate_id, rubric, now);
    let mut attempted_fixed = BTreeSet::new();
    let mut attempted_custom = BTreeSet::new();

    for (key, raw) in &form.scores {
        let Some(resolved) = resolve_key(key, rubric) else {
            violations.push(ScoreViolation::UnknownCriterion { key: key.clone() });
            continue;
        };
        let (label, max) = match &resolved {
            CriterionKey::Fixed(criterion) => {
                (criterion.label().to_string(), rubric.max_for(*criterion))
            }
            CriterionKey::Custom(id) => match rubric.custom_criterion(*id) {
                Some(criterion) => (criterion.name.clone(), criterion.max_points),
                None => {
                    violations.push(ScoreViolation::UnknownCriterion { key: key.clone() });
                    continue;
                }
            },
        };

        let raw = raw.trim();
        if !raw.is_empty() {
            match &resolved {
                CriterionKey::Fixed(criterion) => {
                    attempted_fixed.insert(*criterion);
                }
                CriterionKey::Custom(id) => {
                    attempted_custom.insert(*id);
                }
            }
        }
        let score = if raw.is_empty() {
            None
        } else {
            match raw.parse::<i64>() {
                Ok(value) if value < 0 || value > i64::from(max) => {
                    violations.push(ScoreViolation::OutOfRange {
                        criterion: label,
                        value,
                        max,
                    });
                    continue;
                }
                Ok(value) => Some(value as u32),
                Err(_) => {
                    violations.push(ScoreViolation::NotAnInteger {
                        criterion: label,
                        raw: raw.to_string(),
                    });
                    continue;
                }
            }
        };

        let notes = form.notes.get(key).cloned().unwrap_or_default();
        let checked = form
            .checked_competencies
            .get(key)
            .cloned()
            .unwrap_or_default();
        match resolved {
            CriterionKey::Fixed(criterion) => {
                let checklist = rubric.competencies_for(criterion);
                let entry = evaluation.fixed_entries.entry(criterion).or_default();
                entry.score = score;
                entry.contents = notes.contents;
                entry.comments = notes.comments;
                entry.checked_competencies = checked
                    .into_iter()
                    .filter(|id| checklist.iter().any(|item| item.id == *id))
                    .collect();
            }
            CriterionKey::Custom(id) => {
                let known: Vec<u32> = rubric
                    .custom_criterion(id)
                    .map(|criterion| criterion.competencies.iter().map(|item| item.id).collect())
                    .unwrap_or_default();
                if let Some(entry) = evaluation
                    .custom_entries
                    .iter_mut()
                    .find(|entry| entry.criterion_id == id)
                {
                    entry.score = score;
                    entry.contents = notes.contents;
                    entry.comments = notes.comments;
                    entry.checked_competencies = checked
                        .into_iter()
                        .filter(|id| known.contains(id))
                        .collect();
                }
            }
        }
    }

    for id in &form.completed_internships {
        if rubric.internship(*id).is_none() {
            violations.push(ScoreViolation::UnknownInternship { id: *id });
        } else {
            evaluation.completed_internships.insert(*id);
        }
    }

    evaluation.internship_completion = match form.internship_status.as_deref() {
        None => InternshipCompletion::Unset,
        Some("completed") => InternshipCompletion::Completed,
        Some("not_completed") => {
            if form.incomplete_internship_note.trim().is_empty() {
                violations.push(ScoreViolation::MissingInternshipNote);
            }
            InternshipCompletion::NotCompleted
        }
        Some(other) => {
            violations.push(ScoreViolation::InvalidInternshipStatus {
                raw: other.to_string(),
            });
            InternshipCompletion::Unset
        }
    };
    evaluation.incomplete_note = form.incomplete_internship_note.trim().to_string();

    if mode == SubmissionMode::Final {
        // The required set follows the active rubric, so removing a fixed
        // criterion also removes its score requirement. Criteria whose
        // submitted value already failed parsing are not reported missing
        // on top of that.
        for criterion in rubric.active_fixed() {
            if !attempted_fixed.contains(&criterion) {
                violations.push(ScoreViolation::MissingScore {
                    criterion: criterion.label().to_string(),
                });
            }
        }
        for criterion in &rubric.custom_criteria {
            if !attempted_custom.contains(&criterion.id) {
                violations.push(ScoreViolation::MissingScore {
                    criterion: criterion.name.clone(),
                });
            }
        }
    }

    if violations.is_empty() {
        Ok(evaluation)
    } else {
        Err(violations)
    }
}
