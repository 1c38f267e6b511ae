mod support;

use photoroll_core::{
    Aggregate, AggregateRepoError, AggregateRepository, GenreKey, Image, ItemRepository,
    SqliteAggregateRepository, SqliteItemRepository, SqliteTermRepository, TermRepository,
    TermSpec,
};
use support::{add_genre, setup};

#[test]
fn duplicate_key_insert_is_a_conflict() {
    let (conn, config) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let aggregates = SqliteAggregateRepository::try_new(&conn).unwrap();
    let date_term = terms
        .ensure_term(&TermSpec::flat("published_date", "2024-07-01", "July 1, 2024"))
        .unwrap();
    let image = Image::new("a.jpg");
    items.insert_image(&image).unwrap();

    let first = Aggregate::new("first", vec![image.image_id], GenreKey::All, date_term.term_id);
    aggregates.insert_aggregate(&first).unwrap();

    let second = Aggregate::new("second", Vec::new(), GenreKey::All, date_term.term_id);
    assert!(matches!(
        aggregates.insert_aggregate(&second),
        Err(AggregateRepoError::Conflict {
            genre: GenreKey::All,
            ..
        })
    ));

    let genre = add_genre(&terms, &config, "sports", "Sports");
    let other_genre = Aggregate::new("third", Vec::new(), GenreKey::Term(genre), date_term.term_id);
    aggregates.insert_aggregate(&other_genre).unwrap();
    assert_eq!(aggregates.list_aggregates(Some(date_term.term_id)).unwrap().len(), 2);
}

#[test]
fn stored_image_order_round_trips_through_updates() {
    let (conn, _) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let aggregates = SqliteAggregateRepository::try_new(&conn).unwrap();
    let date_term = terms
        .ensure_term(&TermSpec::flat("published_date", "2024-07-01", "July 1, 2024"))
        .unwrap();
    let images: Vec<Image> = (0..3).map(|n| Image::new(format!("{n}.jpg"))).collect();
    for image in &images {
        items.insert_image(image).unwrap();
    }

    let mut aggregate = Aggregate::new(
        "2024-07-01 \u{2013} All",
        vec![images[2].image_id, images[0].image_id],
        GenreKey::All,
        date_term.term_id,
    );
    aggregates.insert_aggregate(&aggregate).unwrap();

    aggregate.set_images(vec![images[0].image_id, images[1].image_id, images[2].image_id]);
    aggregates.update_aggregate(&aggregate).unwrap();

    let stored = aggregates
        .find_by_key(date_term.term_id, GenreKey::All)
        .unwrap()
        .unwrap();
    assert_eq!(stored, aggregate);
}

#[test]
fn updating_missing_aggregate_is_not_found() {
    let (conn, _) = setup();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    let aggregates = SqliteAggregateRepository::try_new(&conn).unwrap();
    let date_term = terms
        .ensure_term(&TermSpec::flat("published_date", "2024-07-01", "July 1, 2024"))
        .unwrap();

    let ghost = Aggregate::new("ghost", Vec::new(), GenreKey::All, date_term.term_id);
    assert!(matches!(
        aggregates.update_aggregate(&ghost),
        Err(AggregateRepoError::NotFound(id)) if id == ghost.aggregate_id
    ));
}
