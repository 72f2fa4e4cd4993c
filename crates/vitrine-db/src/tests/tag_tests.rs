//! Tests for tag maintenance: slug-keyed dedup and set replacement.

use crate::test_fixtures::{seed_collection, seed_item, TestDatabase};
use vitrine_core::{ItemKind, TagRepository};

#[tokio::test]
async fn test_ensure_dedupes_by_slug() {
    let test_db = TestDatabase::new().await;

    let first = test_db.db.tags.ensure("Glass Plates").await.unwrap();
    assert_eq!(first.slug, "glass-plates");
    assert_eq!(first.name, "Glass Plates");

    // A name that normalizes to the same slug resolves to the same tag,
    // keeping the original display name.
    let second = test_db.db.tags.ensure("glass   plates!").await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.name, "Glass Plates");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_replace_for_item_swaps_the_set() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Tagging", true).await;
    let item = seed_item(&test_db.db, collection, "Subject", ItemKind::Image, true).await;

    test_db
        .db
        .tags
        .replace_for_item(item, &["Bridges".to_string(), "Rivers".to_string()])
        .await
        .unwrap();

    let slugs: Vec<_> = test_db
        .db
        .tags
        .for_item(item)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.slug)
        .collect();
    assert_eq!(slugs, vec!["bridges", "rivers"]);

    // Replacement drops the old links entirely; unsluggable names are
    // skipped rather than erroring.
    test_db
        .db
        .tags
        .replace_for_item(item, &["Canals".to_string(), "!!!".to_string()])
        .await
        .unwrap();

    let slugs: Vec<_> = test_db
        .db
        .tags
        .for_item(item)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.slug)
        .collect();
    assert_eq!(slugs, vec!["canals"]);

    test_db.cleanup().await;
}
