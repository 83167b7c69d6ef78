//! In-memory reference implementations of the store and dispatcher
//! contracts. Used by the API binary as its default backend and by the test
//! suite; a single mutex over the whole state gives every commit the
//! all-or-nothing semantics the store contract requires.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    ArchivedCase, CandidateId, CaseId, CaseRecord, IntakeRecord, NotificationKind, Role, UserId,
};
use super::evaluation::{CaseEvaluation, DecisionRecord};
use super::repository::{
    ArchiveOutcome, CaseNotification, CaseStore, DispatchError, NotificationDispatcher,
    StoreError,
};
use super::rubric::RubricConfig;

#[derive(Default)]
struct MemoryState {
    rubric: Option<RubricConfig>,
    cases: HashMap<CaseId, CaseRecord>,
    intakes: HashMap<CandidateId, IntakeRecord>,
    evaluations: HashMap<CandidateId, CaseEvaluation>,
    decisions: HashMap<CandidateId, DecisionRecord>,
    archive: HashMap<String, ArchivedCase>,
    users: Vec<(UserId, Role)>,
}

/// Mutex-guarded store holding every record family in one state struct.
#[derive(Default, Clone)]
pub struct InMemoryCaseStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    /// Register a user for the administrator-fallback lookup.
    pub fn register_user(&self, id: UserId, role: Role) {
        if let Ok(mut state) = self.state.lock() {
            state.users.push((id, role));
        }
    }

    pub fn archived_cases(&self) -> Vec<ArchivedCase> {
        self.state
            .lock()
            .map(|state| state.archive.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl CaseStore for InMemoryCaseStore {
    fn rubric(&self) -> Result<RubricConfig, StoreError> {
        let state = self.lock()?;
        let mut rubric = state.rubric.clone().ok_or(StoreError::NotFound)?;
        rubric.normalize();
        Ok(rubric)
    }

    fn save_rubric(&self, mut rubric: RubricConfig) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        let current = state.rubric.as_ref().map(|r| r.version).unwrap_or(0);
        rubric.version = current + 1;
        rubric.normalize();
        let version = rubric.version;
        state.rubric = Some(rubric);
        Ok(version)
    }

    fn ensure_rubric(&self, default: RubricConfig) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.rubric.is_none() {
            state.rubric = Some(default);
        }
        Ok(())
    }

    fn insert_case(&self, record: CaseRecord) -> Result<CaseRecord, StoreError> {
        let mut state = self.lock()?;
        if state.cases.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }
        state.cases.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn case(&self, id: &CaseId) -> Result<Option<CaseRecord>, StoreError> {
        Ok(self.lock()?.cases.get(id).cloned())
    }

    fn update_case(&self, record: CaseRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.cases.contains_key(&record.id) {
            return Err(StoreError::NotFound);
        }
        state.cases.insert(record.id.clone(), record);
        Ok(())
    }

    fn intake(&self, candidate: &CandidateId) -> Result<Option<IntakeRecord>, StoreError> {
        Ok(self.lock()?.intakes.get(candidate).cloned())
    }

    fn save_intake(
        &self,
        candidate: &CandidateId,
        record: IntakeRecord,
    ) -> Result<(), StoreError> {
        self.lock()?.intakes.insert(candidate.clone(), record);
        Ok(())
    }

    fn evaluation(&self, candidate: &CandidateId) -> Result<Option<CaseEvaluation>, StoreError> {
        Ok(self.lock()?.evaluations.get(candidate).cloned())
    }

    fn commit_evaluation(
        &self,
        case: CaseRecord,
        evaluation: CaseEvaluation,
        decision: Option<DecisionRecord>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let current_version = state.rubric.as_ref().map(|r| r.version).unwrap_or(0);
        if evaluation.rubric_version != current_version {
            return Err(StoreError::StaleRubric);
        }
        if !state.cases.contains_key(&case.id) {
            return Err(StoreError::NotFound);
        }
        let candidate = evaluation.candidate_id.clone();
        state.cases.insert(case.id.clone(), case);
        state.evaluations.insert(candidate.clone(), evaluation);
        if let Some(decision) = decision {
            state.decisions.insert(candidate, decision);
        }
        Ok(())
    }

    fn decision(&self, candidate: &CandidateId) -> Result<Option<DecisionRecord>, StoreError> {
        Ok(self.lock()?.decisions.get(candidate).cloned())
    }

    fn delete_evaluation_and_decision(&self, candidate: &CandidateId) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.evaluations.remove(candidate);
        state.decisions.remove(candidate);
        Ok(())
    }

    fn archive(&self, record: ArchivedCase) -> Result<ArchiveOutcome, StoreError> {
        let mut state = self.lock()?;
        if state.archive.contains_key(&record.reference) {
            return Ok(ArchiveOutcome::AlreadyArchived);
        }
        state.archive.insert(record.reference.clone(), record);
        Ok(ArchiveOutcome::Archived)
    }

    fn administrators(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .filter(|(_, role)| *role == Role::Administrator)
            .map(|(id, _)| id.clone())
            .collect())
    }
}

/// Dispatcher that stores notifications keyed by (recipient, case, kind),
/// refreshing an existing entry instead of adding a duplicate.
#[derive(Default, Clone)]
pub struct InMemoryNotificationDispatcher {
    entries: Arc<Mutex<HashMap<(UserId, CaseId, NotificationKind), StoredNotification>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNotification {
    pub notification: CaseNotification,
    pub delivered_times: u32,
    pub read: bool,
}

impl InMemoryNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<StoredNotification> {
        self.entries
            .lock()
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn for_recipient(&self, recipient: &UserId) -> Vec<StoredNotification> {
        self.notifications()
            .into_iter()
            .filter(|stored| &stored.notification.recipient == recipient)
            .collect()
    }

    pub fn mark_all_read(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            for stored in entries.values_mut() {
                stored.read = true;
            }
        }
    }
}

impl NotificationDispatcher for InMemoryNotificationDispatcher {
    fn notify(&self, notification: CaseNotification) -> Result<(), DispatchError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DispatchError::Transport("notification mutex poisoned".to_string()))?;
        let key = (
            notification.recipient.clone(),
            notification.case_id.clone(),
            notification.kind,
        );
        entries
            .entry(key)
            .and_modify(|stored| {
                stored.notification = notification.clone();
                stored.delivered_times += 1;
                stored.read = false;
            })
            .or_insert(StoredNotification {
                notification,
                delivered_times: 1,
                read: false,
            });
        Ok(())
    }
}
