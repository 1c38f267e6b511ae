mod support;

use photoroll_core::{
    CoreConfig, DateTaxonomyConfig, DateTreeService, SqliteTermRepository, TakenDate,
    TaxonomyKind, TermLevel, TermRepoError, TermRepository, TermSpec, TermValidationError,
};
use support::setup;

#[test]
fn dates_in_same_month_share_year_and_month_nodes() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let service = DateTreeService::new(&terms, &config);

    let first = service.ensure_date_path("2024", "07", "01", "taken_date");
    let second = service.ensure_date_path("2024", "07", "15", "taken_date");

    assert_eq!(first.year, second.year);
    assert_eq!(first.month, second.month);
    assert_ne!(first.day, second.day);

    let stored = terms.list_terms("taken_date").unwrap();
    let slugs: Vec<&str> = stored.iter().map(|term| term.slug.as_str()).collect();
    assert_eq!(slugs, vec!["2024", "2024-07", "2024-07-01", "2024-07-15"]);

    let year_id = first.year.unwrap();
    let month_id = first.month.unwrap();
    let months = terms.list_children(year_id).unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].display_name, "July 2024");
    let days = terms.list_children(month_id).unwrap();
    assert_eq!(days.len(), 2);
    assert!(days.iter().all(|day| day.level == TermLevel::Day));
}

#[test]
fn unknown_bucket_is_unique_per_taxonomy() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let service = DateTreeService::new(&terms, &config);

    let ids: Vec<_> = (0..5)
        .flat_map(|_| {
            config
                .taken_date_taxonomies
                .iter()
                .flat_map(|taxonomy| service.ensure_taken_date(&TakenDate::Unknown, taxonomy))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(ids.len(), 10);

    for taxonomy in &config.taken_date_taxonomies {
        let unknown: Vec<_> = terms
            .list_terms(&taxonomy.name)
            .unwrap()
            .into_iter()
            .filter(|term| term.slug == "unknown")
            .collect();
        assert_eq!(unknown.len(), 1, "taxonomy {}", taxonomy.name);
        assert_eq!(unknown[0].display_name, "Unknown");
    }
}

#[test]
fn flat_taxonomy_gets_single_node_per_date() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let service = DateTreeService::new(&terms, &config);
    let taken_day = DateTaxonomyConfig::new("taken_day", TaxonomyKind::Flat);

    let ids = service.ensure_taken_date(&TakenDate::known("2023", "11", "15"), &taken_day);
    assert_eq!(ids.len(), 1);

    let term = terms.get_term(ids[0]).unwrap().unwrap();
    assert_eq!(term.slug, "2023-11-15");
    assert_eq!(term.display_name, "November 15, 2023");
    assert_eq!(term.parent_id, None);
}

#[test]
fn rejected_level_leaves_its_descendants_absent() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let service = DateTreeService::new(&terms, &config);

    // Upper-case month text does not form a valid slug.
    let path = service.ensure_date_path("2024", "Jul", "01", "taken_date");
    assert!(path.year.is_some());
    assert_eq!(path.month, None);
    assert_eq!(path.day, None);
    assert_eq!(path.term_ids().len(), 1);
}

#[test]
fn unregistered_taxonomy_yields_no_nodes() {
    let (conn, _) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let service = DateTreeService::new(&terms, &CoreConfig::default());

    let path = service.ensure_date_path("2024", "07", "01", "missing_taxonomy");
    assert!(path.term_ids().is_empty());
    assert_eq!(service.ensure_unknown("missing_taxonomy"), None);
}

#[test]
fn term_validation_rejects_broken_hierarchy() {
    let (conn, _) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();

    let orphan_month = TermSpec {
        taxonomy: "taken_date".to_string(),
        slug: "2024-07".to_string(),
        display_name: "July 2024".to_string(),
        level: TermLevel::Month,
        parent_id: None,
    };
    assert!(matches!(
        terms.ensure_term(&orphan_month),
        Err(TermRepoError::Validation(TermValidationError::MissingParent(
            TermLevel::Month
        )))
    ));

    let year_in_flat = TermSpec {
        taxonomy: "taken_day".to_string(),
        slug: "2024".to_string(),
        display_name: "2024".to_string(),
        level: TermLevel::Year,
        parent_id: None,
    };
    assert!(matches!(
        terms.ensure_term(&year_in_flat),
        Err(TermRepoError::Validation(
            TermValidationError::LevelNotAllowed { .. }
        ))
    ));

    let year = terms
        .ensure_term(&TermSpec {
            taxonomy: "taken_date".to_string(),
            slug: "2024".to_string(),
            display_name: "2024".to_string(),
            level: TermLevel::Year,
            parent_id: None,
        })
        .unwrap();
    let day_under_year = TermSpec {
        taxonomy: "taken_date".to_string(),
        slug: "2024-07-01".to_string(),
        display_name: "July 1, 2024".to_string(),
        level: TermLevel::Day,
        parent_id: Some(year.term_id),
    };
    assert!(matches!(
        terms.ensure_term(&day_under_year),
        Err(TermRepoError::Validation(
            TermValidationError::ParentMismatch { .. }
        ))
    ));
}

#[test]
fn registering_taxonomy_with_other_kind_is_rejected() {
    let (conn, _) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();

    terms
        .register_taxonomy("taken_date", TaxonomyKind::Hierarchical)
        .unwrap();
    assert!(matches!(
        terms.register_taxonomy("taken_date", TaxonomyKind::Flat),
        Err(TermRepoError::Validation(
            TermValidationError::TaxonomyKindConflict { .. }
        ))
    ));
}
