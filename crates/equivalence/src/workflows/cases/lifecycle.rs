//! Pure rules of the case state machine: which statuses admit which
//! transitions, who receives the validation notification, and the
//! prior-decision visibility rule.

use super::domain::{AssignmentEntry, CaseStatus, IntakeRecord, UserId};

/// Assignment is allowed while the case has not been evaluated yet;
/// re-assigning an already assigned case updates the reviewer set.
pub fn can_assign(status: CaseStatus) -> bool {
    matches!(status, CaseStatus::Unprocessed | CaseStatus::Assigned)
}

/// Scoring and submission are reviewer actions on an assigned case, and
/// remain possible after a first submission until the case is archived.
pub fn can_evaluate(status: CaseStatus) -> bool {
    matches!(status, CaseStatus::Assigned | CaseStatus::Evaluated)
}

/// Returning a case to the reviewer reopens anything not yet archived.
pub fn can_return_to_reviewer(status: CaseStatus) -> bool {
    matches!(status, CaseStatus::Assigned | CaseStatus::Evaluated)
}

/// The ready-for-validation notification goes to the administrator who made
/// the most recent assignment, falling back to any known administrator.
pub fn resolve_validation_recipient(
    history: &[AssignmentEntry],
    administrators: &[UserId],
) -> Option<UserId> {
    history
        .last()
        .map(|entry| entry.administrator.clone())
        .or_else(|| administrators.first().cloned())
}

/// Prior-decision information is displayed only while no evaluation exists;
/// the moment any scoring record is persisted the live evaluation takes
/// over, even though `has_prior_decision` stays true on the intake record.
pub fn prior_decision_visible(intake: Option<&IntakeRecord>, has_evaluation: bool) -> bool {
    match intake {
        Some(record) => record.has_prior_decision && !has_evaluation,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(admin: &str) -> AssignmentEntry {
        AssignmentEntry {
            administrator: UserId(admin.to_string()),
            reviewers: vec![UserId("rev-1".to_string())],
            assigned_at: Utc::now(),
        }
    }

    #[test]
    fn assignment_is_blocked_after_evaluation() {
        assert!(can_assign(CaseStatus::Unprocessed));
        assert!(can_assign(CaseStatus::Assigned));
        assert!(!can_assign(CaseStatus::Evaluated));
        assert!(!can_assign(CaseStatus::Archived));
    }

    #[test]
    fn validation_recipient_prefers_latest_assignment() {
        let history = vec![entry("admin-1"), entry("admin-2")];
        let fallback = vec![UserId("admin-9".to_string())];
        assert_eq!(
            resolve_validation_recipient(&history, &fallback),
            Some(UserId("admin-2".to_string()))
        );
        assert_eq!(
            resolve_validation_recipient(&[], &fallback),
            Some(UserId("admin-9".to_string()))
        );
        assert_eq!(resolve_validation_recipient(&[], &[]), None);
    }

    #[test]
    fn prior_decision_hidden_once_evaluation_exists() {
        let intake = IntakeRecord::with_prior_decision(None, "granted in 2019");
        assert!(prior_decision_visible(Some(&intake), false));
        assert!(!prior_decision_visible(Some(&intake), true));
        assert!(!prior_decision_visible(None, false));
        let fresh = IntakeRecord::new_case();
        assert!(!prior_decision_visible(Some(&fresh), false));
    }
}
