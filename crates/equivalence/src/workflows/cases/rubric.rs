//! Administrator-controlled scoring rubric: fixed criteria with
//! configurable maxima, custom criteria with their own competency
//! checklists, and the internship catalog.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The eight built-in scored categories of the evaluation sheet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FixedCriterion {
    GeodeticSciences,
    Topography,
    Photogrammetry,
    Cartography,
    LandLaw,
    Gis,
    RemoteSensing,
    Internships,
}

impl FixedCriterion {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::GeodeticSciences,
            Self::Topography,
            Self::Photogrammetry,
            Self::Cartography,
            Self::LandLaw,
            Self::Gis,
            Self::RemoteSensing,
            Self::Internships,
        ]
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::GeodeticSciences => "geodetic_sciences",
            Self::Topography => "topography",
            Self::Photogrammetry => "photogrammetry",
            Self::Cartography => "cartography",
            Self::LandLaw => "land_law",
            Self::Gis => "gis",
            Self::RemoteSensing => "remote_sensing",
            Self::Internships => "internships",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::GeodeticSciences => "Geodetic sciences",
            Self::Topography => "Topography",
            Self::Photogrammetry => "Photogrammetry",
            Self::Cartography => "Cartography",
            Self::LandLaw => "Land law, cadastre and land management",
            Self::Gis => "Geographic information systems",
            Self::RemoteSensing => "Remote sensing",
            Self::Internships => "Internships and professional practice",
        }
    }

    pub const fn default_max(self) -> u32 {
        match self {
            Self::GeodeticSciences
            | Self::Topography
            | Self::Photogrammetry
            | Self::Cartography => 16,
            Self::LandLaw | Self::Gis | Self::RemoteSensing | Self::Internships => 10,
        }
    }

    /// A criterion scored below half of its maximum gates the whole file as
    /// insufficient. GIS, remote sensing and internships are scored for
    /// information only.
    pub const fn is_mandatory(self) -> bool {
        !matches!(self, Self::Gis | Self::RemoteSensing | Self::Internships)
    }

    fn default_competencies(self) -> &'static [&'static str] {
        match self {
            Self::GeodeticSciences => &[
                "Geometric geodesy",
                "Astronomy and space geodesy",
                "Physical geodesy",
                "Least-squares adjustment and compensation",
                "Geodetic reference systems and frames",
                "Map projections",
                "Applied geodesy",
                "GNSS",
                "Micro-geodesy and precision measurement techniques",
            ],
            Self::Topography => &[
                "Surveying theory and practice",
                "Topometry and instrumentation",
                "Land measurement techniques",
            ],
            Self::Photogrammetry => &[
                "Foundational and advanced photogrammetry",
                "Aerial photography orientation",
                "Aerotriangulation",
                "Photogrammetric restitution",
                "Derived products (DTM/orthophoto)",
                "Drone acquisition",
            ],
            Self::Cartography => &[
                "Topographic cartography",
                "Cartographic representation systems",
                "Thematic cartography",
                "Semiology and cartographic language",
                "CAD and computer-assisted drawing",
                "Drone cartography",
            ],
            Self::LandLaw => &[
                "Land law",
                "Cadastral techniques",
                "Land management and planning",
                "Cadastre and property regulations",
            ],
            Self::Gis => &[
                "GIS foundations",
                "Spatial data management and analysis",
                "Geographic databases",
                "Web mapping",
            ],
            Self::RemoteSensing => &[
                "Physical foundations of remote sensing",
                "Optical and radar image processing",
                "Remote-sensing applications",
            ],
            Self::Internships => &[],
        }
    }
}

impl fmt::Display for FixedCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for FixedCriterion {
    type Err = UnknownCriterionSlug;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|criterion| criterion.slug() == value)
            .ok_or_else(|| UnknownCriterionSlug(value.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown fixed criterion '{0}'")]
pub struct UnknownCriterionSlug(pub String);

/// One entry of a competency checklist. Items carry stable ids so that
/// checked marks on evaluations survive reordering and deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyItem {
    pub id: u32,
    pub label: String,
}

/// An administrator-defined scored category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCriterion {
    pub id: u32,
    pub name: String,
    pub max_points: u32,
    #[serde(default)]
    pub competencies: Vec<CompetencyItem>,
}

/// An internship the reviewer can tick off on the evaluation sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternshipTemplate {
    pub id: u32,
    pub name: String,
    pub duration: String,
}

/// Ids 1 through 5 belong to the built-in internships; configured ones are
/// allocated above this range.
const DEFAULT_INTERNSHIP_COUNT: u32 = 5;

pub fn default_internships() -> Vec<InternshipTemplate> {
    let seed = [
        ("Land-registry conservation internship", "1 week"),
        ("Cadastre internship", "2 weeks"),
        ("Geodesy internship", "2 weeks"),
        ("Topography internship", "2 weeks"),
        ("Photogrammetry internship", "2 weeks"),
    ];
    seed.into_iter()
        .enumerate()
        .map(|(index, (name, duration))| InternshipTemplate {
            id: index as u32 + 1,
            name: name.to_string(),
            duration: duration.to_string(),
        })
        .collect()
}

/// Errors raised by rubric mutations.
#[derive(Debug, thiserror::Error)]
pub enum RubricError {
    #[error("maximum for {criterion} must be a positive integer")]
    NonPositiveMax { criterion: String },
    #[error("criterion name must not be empty")]
    EmptyName,
    #[error("competency label must not be empty")]
    EmptyCompetency,
    #[error("no custom criterion with id {0}")]
    UnknownCustomCriterion(u32),
    #[error("no competency with id {competency} on {criterion}")]
    UnknownCompetency { criterion: String, competency: u32 },
    #[error("no internship with id {0}")]
    UnknownInternship(u32),
}

/// The versioned, administrator-editable definition of what can be scored.
/// Exactly one instance is active at a time; the store bumps `version` on
/// every persisted mutation so in-flight evaluations can detect staleness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricConfig {
    pub version: u64,
    pub fixed_max: BTreeMap<FixedCriterion, u32>,
    pub removed_fixed: BTreeSet<FixedCriterion>,
    pub custom_criteria: Vec<CustomCriterion>,
    pub fixed_competencies: BTreeMap<FixedCriterion, Vec<CompetencyItem>>,
    pub configurable_internships: Vec<InternshipTemplate>,
    pub removed_default_internships: BTreeSet<u32>,
    pub created_at: DateTime<Utc>,
}

impl RubricConfig {
    pub fn with_defaults(created_at: DateTime<Utc>) -> Self {
        let mut rubric = Self {
            version: 1,
            fixed_max: FixedCriterion::ordered()
                .into_iter()
                .map(|criterion| (criterion, criterion.default_max()))
                .collect(),
            removed_fixed: BTreeSet::new(),
            custom_criteria: Vec::new(),
            fixed_competencies: BTreeMap::new(),
            configurable_internships: Vec::new(),
            removed_default_internships: BTreeSet::new(),
            created_at,
        };
        rubric.normalize();
        rubric
    }

    /// Repair the shape of a loaded rubric: seed missing maxima and
    /// competency checklists, and restore the id ordering of custom
    /// criteria. Idempotent; run on every load.
    pub fn normalize(&mut self) {
        for criterion in FixedCriterion::ordered() {
            self.fixed_max
                .entry(criterion)
                .or_insert_with(|| criterion.default_max());

            let checklist = self.fixed_competencies.entry(criterion).or_default();
            if checklist.is_empty() {
                *checklist = criterion
                    .default_competencies()
                    .iter()
                    .enumerate()
                    .map(|(index, label)| CompetencyItem {
                        id: index as u32 + 1,
                        label: (*label).to_string(),
                    })
                    .collect();
            }
        }
        self.custom_criteria.sort_by_key(|criterion| criterion.id);
    }

    pub fn max_for(&self, criterion: FixedCriterion) -> u32 {
        self.fixed_max
            .get(&criterion)
            .copied()
            .unwrap_or_else(|| criterion.default_max())
    }

    /// Fixed criteria still part of the sheet, in display order.
    pub fn active_fixed(&self) -> impl Iterator<Item = FixedCriterion> + '_ {
        FixedCriterion::ordered()
            .into_iter()
            .filter(move |criterion| !self.removed_fixed.contains(criterion))
    }

    pub fn custom_criterion(&self, id: u32) -> Option<&CustomCriterion> {
        self.custom_criteria
            .iter()
            .find(|criterion| criterion.id == id)
    }

    pub fn competencies_for(&self, criterion: FixedCriterion) -> &[CompetencyItem] {
        self.fixed_competencies
            .get(&criterion)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn set_fixed_max(
        &mut self,
        criterion: FixedCriterion,
        value: u32,
    ) -> Result<(), RubricError> {
        if value == 0 {
            return Err(RubricError::NonPositiveMax {
                criterion: criterion.label().to_string(),
            });
        }
        self.fixed_max.insert(criterion, value);
        Ok(())
    }

    /// Mark a fixed criterion as removed. Historical score data is kept;
    /// the criterion just stops participating in validation and totals.
    pub fn remove_fixed_criterion(&mut self, criterion: FixedCriterion) {
        self.removed_fixed.insert(criterion);
    }

    /// Append a custom criterion. The id is one above the current maximum so
    /// insertion order survives arbitrary deletions, and the list is
    /// re-sorted by id afterwards (a no-op when already sorted).
    pub fn add_custom_criterion(
        &mut self,
        name: impl Into<String>,
        max_points: u32,
    ) -> Result<u32, RubricError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RubricError::EmptyName);
        }
        if max_points == 0 {
            return Err(RubricError::NonPositiveMax { criterion: name });
        }
        let id = self
            .custom_criteria
            .iter()
            .map(|criterion| criterion.id)
            .max()
            .unwrap_or(0)
            + 1;
        self.custom_criteria.push(CustomCriterion {
            id,
            name,
            max_points,
            competencies: Vec::new(),
        });
        self.custom_criteria.sort_by_key(|criterion| criterion.id);
        Ok(id)
    }

    pub fn remove_custom_criterion(&mut self, id: u32) -> Result<(), RubricError> {
        let before = self.custom_criteria.len();
        self.custom_criteria.retain(|criterion| criterion.id != id);
        if self.custom_criteria.len() == before {
            return Err(RubricError::UnknownCustomCriterion(id));
        }
        self.custom_criteria.sort_by_key(|criterion| criterion.id);
        Ok(())
    }

    pub fn add_fixed_competency(
        &mut self,
        criterion: FixedCriterion,
        label: impl Into<String>,
    ) -> Result<u32, RubricError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(RubricError::EmptyCompetency);
        }
        let checklist = self.fixed_competencies.entry(criterion).or_default();
        let id = next_competency_id(checklist);
        checklist.push(CompetencyItem { id, label });
        Ok(id)
    }

    pub fn remove_fixed_competency(
        &mut self,
        criterion: FixedCriterion,
        competency_id: u32,
    ) -> Result<(), RubricError> {
        let checklist = self.fixed_competencies.entry(criterion).or_default();
        let before = checklist.len();
        checklist.retain(|item| item.id != competency_id);
        if checklist.len() == before {
            return Err(RubricError::UnknownCompetency {
                criterion: criterion.label().to_string(),
                competency: competency_id,
            });
        }
        Ok(())
    }

    pub fn add_custom_competency(
        &mut self,
        criterion_id: u32,
        label: impl Into<String>,
    ) -> Result<u32, RubricError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(RubricError::EmptyCompetency);
        }
        let criterion = self
            .custom_criteria
            .iter_mut()
            .find(|criterion| criterion.id == criterion_id)
            .ok_or(RubricError::UnknownCustomCriterion(criterion_id))?;
        let id = next_competency_id(&criterion.competencies);
        criterion.competencies.push(CompetencyItem { id, label });
        Ok(id)
    }

    pub fn remove_custom_competency(
        &mut self,
        criterion_id: u32,
        competency_id: u32,
    ) -> Result<(), RubricError> {
        let criterion = self
            .custom_criteria
            .iter_mut()
            .find(|criterion| criterion.id == criterion_id)
            .ok_or(RubricError::UnknownCustomCriterion(criterion_id))?;
        let before = criterion.competencies.len();
        criterion.competencies.retain(|item| item.id != competency_id);
        if criterion.competencies.len() == before {
            return Err(RubricError::UnknownCompetency {
                criterion: criterion.name.clone(),
                competency: competency_id,
            });
        }
        Ok(())
    }

    pub fn add_internship(
        &mut self,
        name: impl Into<String>,
        duration: impl Into<String>,
    ) -> Result<u32, RubricError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RubricError::EmptyName);
        }
        let id = self
            .configurable_internships
            .iter()
            .map(|internship| internship.id)
            .max()
            .unwrap_or(DEFAULT_INTERNSHIP_COUNT)
            + 1;
        self.configurable_internships.push(InternshipTemplate {
            id,
            name,
            duration: duration.into(),
        });
        Ok(id)
    }

    /// Built-in internships are marked removed (ids stay reserved);
    /// configured ones are deleted outright.
    pub fn remove_internship(&mut self, id: u32) -> Result<(), RubricError> {
        if id >= 1 && id <= DEFAULT_INTERNSHIP_COUNT {
            self.removed_default_internships.insert(id);
            return Ok(());
        }
        let before = self.configurable_internships.len();
        self.configurable_internships
            .retain(|internship| internship.id != id);
        if self.configurable_internships.len() == before {
            return Err(RubricError::UnknownInternship(id));
        }
        Ok(())
    }

    /// The internships currently offered on the evaluation sheet: defaults
    /// not removed by the administrator, then configured ones.
    pub fn internship_catalog(&self) -> Vec<InternshipTemplate> {
        let mut catalog: Vec<InternshipTemplate> = default_internships()
            .into_iter()
            .filter(|internship| !self.removed_default_internships.contains(&internship.id))
            .collect();
        catalog.extend(self.configurable_internships.iter().cloned());
        catalog
    }

    pub fn internship(&self, id: u32) -> Option<InternshipTemplate> {
        self.internship_catalog()
            .into_iter()
            .find(|internship| internship.id == id)
    }
}

fn next_competency_id(checklist: &[CompetencyItem]) -> u32 {
    checklist.iter().map(|item| item.id).max().unwrap_or(0) + 1
}
