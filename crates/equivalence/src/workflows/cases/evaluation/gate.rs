//! Mandatory-criteria gate: each mandatory criterion must reach half of its
//! maximum or the whole file is judged insufficient regardless of total.

use std::collections::BTreeMap;

use serde::Serialize;

use super::super::rubric::RubricConfig;
use super::CaseEvaluation;

/// Gate result for one scored criterion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionGateEntry {
    pub name: String,
    pub score: u32,
    pub min: f64,
    pub max: u32,
    pub acquired: bool,
    pub pct: f64,
    pub custom: bool,
}

/// Aggregate over every criterion with an entered score. Non-mandatory and
/// custom criteria are reported acquired unconditionally; only mandatory
/// ones can appear in `not_acquired`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MandatoryGate {
    pub criteria: BTreeMap<String, CriterionGateEntry>,
    pub not_acquired: Vec<String>,
}

impl MandatoryGate {
    pub fn passed(&self) -> bool {
        self.not_acquired.is_empty()
    }
}

/// Evaluate the gate against the active rubric. Criteria without an entered
/// score are skipped; the completeness requirement lives in the submission
/// validation, not here.
pub fn review_mandatory_criteria(
    evaluation: &CaseEvaluation,
    rubric: &RubricConfig,
) -> MandatoryGate {
    let mut criteria = BTreeMap::new();
    let mut not_acquired = Vec::new();

    for criterion in rubric.active_fixed() {
        let Some(score) = evaluation
            .fixed_entries
            .get(&criterion)
            .and_then(|entry| entry.score)
        else {
            continue;
        };
        let max = rubric.max_for(criterion);
        let pct = f64::from(score) / f64::from(max) * 100.0;
        if criterion.is_mandatory() {
            let min = f64::from(max) * 0.5;
            let acquired = f64::from(score) >= min;
            if !acquired {
                not_acquired.push(criterion.label().to_string());
            }
            criteria.insert(
                criterion.slug().to_string(),
                CriterionGateEntry {
                    name: criterion.label().to_string(),
                    score,
                    min,
                    max,
                    acquired,
                    pct,
                    custom: false,
                },
            );
        } else {
            criteria.insert(
                criterion.slug().to_string(),
                CriterionGateEntry {
                    name: criterion.label().to_string(),
                    score,
                    min: 0.0,
                    max,
                    acquired: true,
                    pct,
                    custom: false,
                },
            );
        }
    }

    for criterion in &rubric.custom_criteria {
        let Some(score) = evaluation
            .custom_entry(criterion.id)
            .and_then(|entry| entry.score)
        else {
            continue;
        };
        criteria.insert(
            format!("custom_{}", criterion.id),
            CriterionGateEntry {
                name: criterion.name.clone(),
                score,
                min: 0.0,
                max: criterion.max_points,
                acquired: true,
                pct: f64::from(score) / f64::from(criterion.max_points) * 100.0,
                custom: true,
            },
        );
    }

    MandatoryGate {
        criteria,
        not_acquired,
    }
}
