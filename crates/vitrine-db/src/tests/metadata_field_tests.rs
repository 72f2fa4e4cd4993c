//! Tests for configured metadata fields and per-item values.

use crate::test_fixtures::{seed_collection, seed_item, TestDatabase};
use vitrine_core::{FieldType, ItemKind, MetadataFieldRepository};

#[tokio::test]
async fn test_default_fields_listed_in_display_order() {
    let test_db = TestDatabase::new().await;

    let fields = test_db.db.metadata.list().await.unwrap();
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["creator", "date_created", "location", "subject", "rights"]
    );
    assert!(fields.windows(2).all(|w| w[0].display_order <= w[1].display_order));

    let date_created = fields.iter().find(|f| f.name == "date_created").unwrap();
    assert_eq!(date_created.field_type, FieldType::Date);
    assert!(date_created.is_facet);
    // rights is configured but not facet-eligible.
    assert!(!fields.iter().find(|f| f.name == "rights").unwrap().is_facet);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_find_by_name() {
    let test_db = TestDatabase::new().await;

    let field = test_db
        .db
        .metadata
        .find_by_name("creator")
        .await
        .unwrap()
        .expect("configured field");
    assert_eq!(field.name, "creator");

    assert!(test_db
        .db
        .metadata
        .find_by_name("no_such_field")
        .await
        .unwrap()
        .is_none());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_value_upsert_is_last_write_wins() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Provenance", true).await;
    let item = seed_item(&test_db.db, collection, "Ledger", ItemKind::Document, true).await;

    let field = test_db
        .db
        .metadata
        .find_by_name("creator")
        .await
        .unwrap()
        .unwrap();

    test_db
        .db
        .metadata
        .upsert_value(item, field.id, "Unknown")
        .await
        .unwrap();
    test_db
        .db
        .metadata
        .upsert_value(item, field.id, "City Archives")
        .await
        .unwrap();

    // One row per (item, field); the second write replaced the first.
    let values = test_db.db.metadata.values_for_item(item).await.unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].name, "creator");
    assert_eq!(values[0].value, "City Archives");

    test_db.cleanup().await;
}
