mod support;

use photoroll_core::{
    DateScope, Item, ItemRepository, RawImageMetadata, SqliteItemRepository,
    SqliteTermRepository, SyncError, TakenDate, TakenDateService, TermRepository,
};
use support::{add_photo, day, setup, FakeMetadataReader};

fn named(file_name: &str) -> RawImageMetadata {
    RawImageMetadata {
        file_name: Some(file_name.to_string()),
        ..RawImageMetadata::default()
    }
}

#[test]
fn sync_item_stores_date_and_assigns_every_taxonomy() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let (item_id, _) = add_photo(&items, &config, day(2024, 8, 1), &[], "uploads/a.jpg");
    let reader = FakeMetadataReader::default().with("uploads/a.jpg", named("20240701-sunset.jpg"));

    let service = TakenDateService::new(&items, &terms, reader, &config);
    let date = service.sync_item(item_id).unwrap();
    assert_eq!(date, TakenDate::known("2024", "07", "01"));

    let stored = items.get_item(item_id).unwrap().unwrap();
    assert_eq!(stored.taken_on, date);

    let tree_ids = items.item_term_ids(item_id, "taken_date").unwrap();
    let tree_slugs: Vec<String> = tree_ids
        .iter()
        .map(|id| terms.get_term(*id).unwrap().unwrap().slug)
        .collect();
    assert_eq!(tree_slugs, vec!["2024", "2024-07", "2024-07-01"]);

    let flat_ids = items.item_term_ids(item_id, "taken_day").unwrap();
    assert_eq!(flat_ids.len(), 1);
    assert_eq!(
        terms.get_term(flat_ids[0]).unwrap().unwrap().slug,
        "2024-07-01"
    );
}

#[test]
fn resync_replaces_previous_assignment() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let (item_id, _) = add_photo(&items, &config, day(2024, 8, 1), &[], "a.jpg");

    let first = TakenDateService::new(
        &items,
        &terms,
        FakeMetadataReader::default().with("a.jpg", named("holiday.jpg")),
        &config,
    );
    assert!(first.sync_item(item_id).unwrap().is_unknown());
    assert_eq!(items.item_term_ids(item_id, "taken_date").unwrap().len(), 1);

    let second = TakenDateService::new(
        &items,
        &terms,
        FakeMetadataReader::default().with("a.jpg", named("20230102.jpg")),
        &config,
    );
    second.sync_item(item_id).unwrap();
    assert_eq!(items.item_term_ids(item_id, "taken_date").unwrap().len(), 3);
}

#[test]
fn run_sync_counts_outcomes_and_shares_one_unknown_node() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    add_photo(&items, &config, day(2024, 8, 1), &[], "dated.jpg");
    add_photo(&items, &config, day(2024, 8, 1), &[], "blank-1.jpg");
    add_photo(&items, &config, day(2024, 8, 1), &[], "blank-2.jpg");
    add_photo(&items, &config, day(2024, 8, 1), &[], "unreadable.jpg");
    let bare = Item::new("no image", Some(day(2024, 8, 1)));
    items.insert_item(&bare).unwrap();

    let reader = FakeMetadataReader::default()
        .with("dated.jpg", named("20240705_1.jpg"))
        .with("blank-1.jpg", named("blank-1.jpg"))
        .with("blank-2.jpg", RawImageMetadata::default());
    let service = TakenDateService::new(&items, &terms, reader, &config);

    let report = service.run_sync(DateScope::All).unwrap();
    assert_eq!(report.resolved, 1);
    assert_eq!(report.unknown, 3);
    assert_eq!(report.failed, 1);

    for taxonomy in ["taken_date", "taken_day"] {
        let unknown = terms.find_by_slug(taxonomy, "unknown").unwrap().unwrap();
        let shared: Vec<_> = items
            .list_items(DateScope::All)
            .unwrap()
            .into_iter()
            .filter(|item| {
                items
                    .item_term_ids(item.item_id, taxonomy)
                    .unwrap()
                    .contains(&unknown.term_id)
            })
            .collect();
        assert_eq!(shared.len(), 3);
    }
}

#[test]
fn metadata_failure_keeps_stored_date() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let (item_id, _) = add_photo(&items, &config, day(2024, 8, 1), &[], "a.jpg");

    TakenDateService::new(
        &items,
        &terms,
        FakeMetadataReader::default().with("a.jpg", named("20240101.jpg")),
        &config,
    )
    .sync_item(item_id)
    .unwrap();

    let failing = TakenDateService::new(&items, &terms, FakeMetadataReader::default(), &config);
    assert!(matches!(
        failing.sync_item(item_id),
        Err(SyncError::Metadata(_))
    ));
    assert_eq!(
        items.get_item(item_id).unwrap().unwrap().taken_on,
        TakenDate::known("2024", "01", "01")
    );
}

#[test]
fn empty_scope_and_missing_item_are_reported() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let service = TakenDateService::new(&items, &terms, FakeMetadataReader::default(), &config);

    assert!(matches!(
        service.run_sync(DateScope::Day(day(2024, 1, 1))),
        Err(SyncError::NoEligibleItems)
    ));
    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        service.sync_item(missing),
        Err(SyncError::ItemNotFound(id)) if id == missing
    ));
}
