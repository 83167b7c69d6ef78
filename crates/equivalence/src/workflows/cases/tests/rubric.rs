use super::common::{admin, fixture, reviewer};
use crate::workflows::cases::rubric::FixedCriterion;
use crate::workflows::cases::service::CaseServiceError;

#[test]
fn default_rubric_seeds_maxima_and_checklists() {
    let fx = fixture();
    let rubric = fx.service.active_rubric().expect("rubric loads");

    assert_eq!(rubric.max_for(FixedCriterion::GeodeticSciences), 16);
    assert_eq!(rubric.max_for(FixedCriterion::Topography), 16);
    assert_eq!(rubric.max_for(FixedCriterion::Photogrammetry), 16);
    assert_eq!(rubric.max_for(FixedCriterion::Cartography), 16);
    assert_eq!(rubric.max_for(FixedCriterion::LandLaw), 10);
    assert_eq!(rubric.max_for(FixedCriterion::Gis), 10);
    assert_eq!(rubric.max_for(FixedCriterion::RemoteSensing), 10);
    assert_eq!(rubric.max_for(FixedCriterion::Internships), 10);

    let mandatory: Vec<_> = FixedCriterion::ordered()
        .into_iter()
        .filter(|criterion| criterion.is_mandatory())
        .collect();
    assert_eq!(mandatory.len(), 5);
    assert!(!FixedCriterion::Gis.is_mandatory());
    assert!(!FixedCriterion::RemoteSensing.is_mandatory());
    assert!(!FixedCriterion::Internships.is_mandatory());

    assert_eq!(
        rubric.competencies_for(FixedCriterion::GeodeticSciences).len(),
        9
    );
    assert_eq!(rubric.competencies_for(FixedCriterion::Topography).len(), 3);
    assert!(rubric.competencies_for(FixedCriterion::Internships).is_empty());
    assert_eq!(rubric.internship_catalog().len(), 5);
}

#[test]
fn set_fixed_max_rejects_zero() {
    let fx = fixture();
    let result = fx
        .service
        .set_fixed_max(&admin(), FixedCriterion::Topography, 0);
    assert!(matches!(result, Err(CaseServiceError::Rubric(_))));

    fx.service
        .set_fixed_max(&admin(), FixedCriterion::Topography, 20)
        .expect("positive maximum accepted");
    let rubric = fx.service.active_rubric().expect("rubric loads");
    assert_eq!(rubric.max_for(FixedCriterion::Topography), 20);
}

#[test]
fn rubric_mutations_require_administrator() {
    let fx = fixture();
    let result = fx
        .service
        .set_fixed_max(&reviewer(), FixedCriterion::Topography, 12);
    assert!(matches!(
        result,
        Err(CaseServiceError::PermissionDenied { .. })
    ));
    let result = fx.service.add_custom_criterion(&reviewer(), "Hydrography", 10);
    assert!(matches!(
        result,
        Err(CaseServiceError::PermissionDenied { .. })
    ));
}

#[test]
fn custom_criterion_ids_are_never_reused() {
    let fx = fixture();
    let actor = admin();
    assert_eq!(
        fx.service
            .add_custom_criterion(&actor, "Hydrography", 10)
            .expect("add"),
        1
    );
    assert_eq!(
        fx.service
            .add_custom_criterion(&actor, "Geomatics law", 8)
            .expect("add"),
        2
    );
    assert_eq!(
        fx.service
            .add_custom_criterion(&actor, "Urban planning", 6)
            .expect("add"),
        3
    );

    fx.service
        .remove_custom_criterion(&actor, 2)
        .expect("remove");

    // After deleting id 2 the next id is still one above the maximum.
    assert_eq!(
        fx.service
            .add_custom_criterion(&actor, "Marine geodesy", 5)
            .expect("add"),
        4
    );

    let rubric = fx.service.active_rubric().expect("rubric loads");
    let ids: Vec<u32> = rubric.custom_criteria.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 3, 4], "list stays sorted by id");
}

#[test]
fn custom_competency_ids_survive_deletion() {
    let fx = fixture();
    let actor = admin();
    let criterion = fx
        .service
        .add_custom_criterion(&actor, "Hydrography", 10)
        .expect("add criterion");

    let first = fx
        .service
        .add_custom_competency(&actor, criterion, "Bathymetry")
        .expect("add competency");
    let second = fx
        .service
        .add_custom_competency(&actor, criterion, "Tide modelling")
        .expect("add competency");
    assert_eq!((first, second), (1, 2));

    fx.service
        .remove_custom_competency(&actor, criterion, first)
        .expect("remove competency");
    let third = fx
        .service
        .add_custom_competency(&actor, criterion, "Sonar surveying")
        .expect("add competency");
    assert_eq!(third, 3, "competency ids are not reused either");

    let rubric = fx.service.active_rubric().expect("rubric loads");
    let competencies = &rubric
        .custom_criterion(criterion)
        .expect("criterion present")
        .competencies;
    let ids: Vec<u32> = competencies.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn removing_fixed_criterion_keeps_it_out_of_the_active_set() {
    let fx = fixture();
    fx.service
        .remove_fixed_criterion(&admin(), FixedCriterion::Gis)
        .expect("remove");
    let rubric = fx.service.active_rubric().expect("rubric loads");
    assert!(rubric.removed_fixed.contains(&FixedCriterion::Gis));
    assert!(!rubric
        .active_fixed()
        .any(|criterion| criterion == FixedCriterion::Gis));
    // The configured maximum is retained, only hidden.
    assert_eq!(rubric.max_for(FixedCriterion::Gis), 10);
}

#[test]
fn internship_catalog_handles_default_removal_and_additions() {
    let fx = fixture();
    let actor = admin();

    fx.service
        .remove_internship(&actor, 1)
        .expect("remove built-in internship");
    let id = fx
        .service
        .add_internship(&actor, "Hydrographic survey internship", "3 weeks")
        .expect("add internship");
    assert_eq!(id, 6, "configured internships allocate above the built-ins");

    let rubric = fx.service.active_rubric().expect("rubric loads");
    let catalog = rubric.internship_catalog();
    assert_eq!(catalog.len(), 5);
    assert!(!catalog.iter().any(|internship| internship.id == 1));
    assert!(catalog.iter().any(|internship| internship.id == 6));

    let unknown = fx.service.remove_internship(&actor, 42);
    assert!(matches!(unknown, Err(CaseServiceError::Rubric(_))));
}

#[test]
fn rubric_version_advances_on_every_mutation() {
    let fx = fixture();
    let before = fx.service.active_rubric().expect("rubric loads").version;
    fx.service
        .set_fixed_max(&admin(), FixedCriterion::Cartography, 18)
        .expect("mutation");
    let after = fx.service.active_rubric().expect("rubric loads").version;
    assert!(after > before);
}
