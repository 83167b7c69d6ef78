//! Shared fixtures: an in-memory backed service, actors, and form builders.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::workflows::cases::domain::{Actor, CaseRecord, Role, UserId};
use crate::workflows::cases::evaluation::EvaluationForm;
use crate::workflows::cases::memory::{InMemoryCaseStore, InMemoryNotificationDispatcher};
use crate::workflows::cases::service::{CommissionCaseService, NewCaseForm};

pub(crate) type TestService =
    CommissionCaseService<InMemoryCaseStore, InMemoryNotificationDispatcher>;

pub(crate) struct Fixture {
    pub service: Arc<TestService>,
    pub store: Arc<InMemoryCaseStore>,
    pub dispatcher: Arc<InMemoryNotificationDispatcher>,
}

pub(crate) fn admin() -> Actor {
    Actor {
        id: UserId("admin-1".to_string()),
        role: Role::Administrator,
    }
}

pub(crate) fn reviewer() -> Actor {
    Actor {
        id: UserId("rev-1".to_string()),
        role: Role::Reviewer,
    }
}

pub(crate) fn fixture() -> Fixture {
    let store = Arc::new(InMemoryCaseStore::new());
    store.register_user(admin().id, Role::Administrator);
    store.register_user(reviewer().id, Role::Reviewer);
    let dispatcher = Arc::new(InMemoryNotificationDispatcher::new());
    let service = Arc::new(CommissionCaseService::new(store.clone(), dispatcher.clone()));
    service
        .ensure_default_rubric()
        .expect("default rubric bootstrap");
    Fixture {
        service,
        store,
        dispatcher,
    }
}

pub(crate) fn new_case_form(reference: &str) -> NewCaseForm {
    NewCaseForm {
        reference: reference.to_string(),
        candidate_name: format!("Candidate {reference}"),
        arrival_date: NaiveDate::from_ymd_opt(2024, 9, 12).expect("valid date"),
        origin_country: "Senegal".to_string(),
        missing_documents: Vec::new(),
        received_on: Some(NaiveDate::from_ymd_opt(2024, 9, 15).expect("valid date")),
    }
}

pub(crate) fn registered_case(fixture: &Fixture, reference: &str) -> CaseRecord {
    fixture
        .service
        .register_case(&admin(), new_case_form(reference))
        .expect("case registration succeeds")
}

pub(crate) fn assigned_case(fixture: &Fixture, reference: &str) -> CaseRecord {
    let case = registered_case(fixture, reference);
    fixture
        .service
        .assign(&admin(), &case.id, vec![reviewer().id])
        .expect("assignment succeeds")
}

pub(crate) fn scores(entries: &[(&str, &str)]) -> EvaluationForm {
    EvaluationForm {
        scores: entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect(),
        notes: BTreeMap::new(),
        checked_competencies: BTreeMap::new(),
        completed_internships: Vec::new(),
        internship_status: None,
        incomplete_internship_note: String::new(),
    }
}

/// A complete sheet over the eight built-in criteria.
pub(crate) fn full_scores(values: [u32; 8]) -> EvaluationForm {
    let keys = [
        "geodetic_sciences",
        "topography",
        "photogrammetry",
        "cartography",
        "land_law",
        "gis",
        "remote_sensing",
        "internships",
    ];
    let entries: Vec<(String, String)> = keys
        .iter()
        .zip(values)
        .map(|(key, value)| ((*key).to_string(), value.to_string()))
        .collect();
    EvaluationForm {
        scores: entries.into_iter().collect(),
        ..EvaluationForm::default()
    }
}
