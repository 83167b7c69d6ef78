//! Score classification: the reviewer-facing interpretation tiers and the
//! commission decision categories. The two ladders use different boundaries
//! on purpose and must stay separate functions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::gate::MandatoryGate;

/// Reviewer-facing interpretation of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretationTier {
    InsufficientMandatory,
    Excellence,
    Solid,
    Insufficient,
}

/// The interpretation shown on the evaluation screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallInterpretation {
    pub tier: InterpretationTier,
    pub title: String,
    pub description: String,
    pub total_score: u32,
    pub not_acquired: Vec<String>,
}

/// Classify for the reviewer: a failed gate wins over any total; otherwise
/// 76 and above is excellence, 50 and above is solid, the rest insufficient.
/// Boundaries are inclusive on the lower bound.
pub fn interpret_overall(gate: &MandatoryGate, total_score: u32) -> OverallInterpretation {
    if !gate.passed() {
        let failed = gate.not_acquired.join(", ");
        return OverallInterpretation {
            tier: InterpretationTier::InsufficientMandatory,
            title: "Insufficient training: mandatory criteria not acquired".to_string(),
            description: format!(
                "Insufficient training for granting equivalence. Mandatory criteria not \
                 acquired: {failed}. The file is judged insufficient even with a total \
                 score of {total_score} points."
            ),
            total_score,
            not_acquired: gate.not_acquired.clone(),
        };
    }

    if total_score >= 76 {
        OverallInterpretation {
            tier: InterpretationTier::Excellence,
            title: "Training validated with excellence".to_string(),
            description: "Training fully in line with the requirements of the surveying \
                          engineer degree, with the option of requiring complementary \
                          internships."
                .to_string(),
            total_score,
            not_acquired: Vec::new(),
        }
    } else if total_score >= 50 {
        OverallInterpretation {
            tier: InterpretationTier::Solid,
            title: "Solid training".to_string(),
            description: "Equivalence recommended subject to improvements in the form of \
                          complementary coursework and internships."
                .to_string(),
            total_score,
            not_acquired: Vec::new(),
        }
    } else {
        OverallInterpretation {
            tier: InterpretationTier::Insufficient,
            title: "Insufficient training".to_string(),
            description: "Insufficient training for obtaining equivalence. A full degree \
                          program is required."
                .to_string(),
            total_score,
            not_acquired: Vec::new(),
        }
    }
}

/// The five formal decision categories recorded for the commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCategory {
    EquivalenceGranted,
    FileCompletion,
    DefenseInvitation,
    QualifyingExamInvitation,
    NotEquivalent,
}

impl DecisionCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::EquivalenceGranted => "Equivalence granted",
            Self::FileCompletion => "File completion requested",
            Self::DefenseInvitation => "Invitation to a defense",
            Self::QualifyingExamInvitation => "Invitation to a qualifying exam",
            Self::NotEquivalent => "Not equivalent",
        }
    }
}

/// Map a total score to the commission category. This ladder is defined
/// independently of [`interpret_overall`]; the boundary values differ and
/// the two must not be unified.
pub fn classify_commission(total_score: u32) -> DecisionCategory {
    if total_score >= 76 {
        DecisionCategory::EquivalenceGranted
    } else if total_score >= 60 {
        DecisionCategory::FileCompletion
    } else if total_score >= 40 {
        DecisionCategory::DefenseInvitation
    } else if total_score >= 20 {
        DecisionCategory::QualifyingExamInvitation
    } else {
        DecisionCategory::NotEquivalent
    }
}

/// Evaluation facts the recommendation template draws from.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationContext<'a> {
    pub total_score: u32,
    pub missing_documents: &'a [String],
}

/// Render the recommendation for a decision category. Pure function of its
/// inputs; the caller stores the result on the decision record.
pub fn recommendation_text(category: DecisionCategory, ctx: RecommendationContext<'_>) -> String {
    let mut lines = Vec::new();
    match category {
        DecisionCategory::EquivalenceGranted => {
            lines.push("Equivalence granted.".to_string());
            lines.push("No further conditions required.".to_string());
        }
        DecisionCategory::FileCompletion => {
            lines.push("File completion requested.".to_string());
            if !ctx.missing_documents.is_empty() {
                lines.push("Missing documents to provide:".to_string());
                for document in ctx.missing_documents {
                    lines.push(format!("  - {document}"));
                }
            }
            if ctx.total_score < 60 {
                lines.push("Recommended internships:".to_string());
                lines.push("  - Topography internship: 2 weeks".to_string());
                lines.push("  - Geodesy internship: 2 weeks".to_string());
            }
            if ctx.total_score < 70 {
                lines.push("Supplementary coursework recommended.".to_string());
            }
        }
        DecisionCategory::DefenseInvitation => {
            lines.push("Invitation to a defense before the commission.".to_string());
            lines.push("Complementary training required.".to_string());
            lines.push("A new application is possible after the training.".to_string());
        }
        DecisionCategory::QualifyingExamInvitation => {
            lines.push("Invitation to the qualifying exam.".to_string());
            lines.push("Complementary training required.".to_string());
            lines.push("A new application is possible after the training.".to_string());
        }
        DecisionCategory::NotEquivalent => {
            lines.push("Equivalence refused.".to_string());
            lines.push("Complementary training required.".to_string());
            lines.push("A new application is possible after the training.".to_string());
        }
    }
    lines.join("\n")
}

/// The formal record written for the commission when an evaluation is
/// submitted. One per candidate, replaced on re-evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub total_score: u32,
    pub category: DecisionCategory,
    pub recommendation: String,
    #[serde(default)]
    pub commission_comments: String,
    pub decided_at: DateTime<Utc>,
}
