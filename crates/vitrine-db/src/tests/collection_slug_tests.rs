//! Tests for slug derivation and collision behavior on collections.

use crate::test_fixtures::TestDatabase;
use vitrine_core::{
    CollectionRef, CollectionRepository, CreateCollectionRequest, Error, UpdateCollectionRequest,
};

fn create_req(title: &str) -> CreateCollectionRequest {
    CreateCollectionRequest {
        title: title.to_string(),
        description: None,
        metadata: None,
        is_public: true,
        created_by: None,
    }
}

#[tokio::test]
async fn test_slug_derived_from_title() {
    let test_db = TestDatabase::new().await;

    let collection = test_db
        .db
        .collections
        .create(create_req("Historical Photos"))
        .await
        .expect("create collection");
    assert_eq!(collection.slug, "historical-photos");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_title_rejected_with_already_exists() {
    let test_db = TestDatabase::new().await;

    test_db
        .db
        .collections
        .create(create_req("Historical Photos"))
        .await
        .expect("first create");

    let err = test_db
        .db
        .collections
        .create(create_req("Historical Photos"))
        .await
        .expect_err("duplicate title must be rejected");

    match &err {
        Error::Conflict(msg) => assert!(msg.contains("already exists"), "message: {}", msg),
        other => panic!("expected Conflict, got {:?}", other),
    }

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_titles_normalizing_to_same_slug_collide() {
    let test_db = TestDatabase::new().await;

    test_db
        .db
        .collections
        .create(create_req("Maps & Charts"))
        .await
        .expect("first create");

    // Different punctuation, same normalized slug.
    let err = test_db
        .db
        .collections
        .create(create_req("maps-charts"))
        .await
        .expect_err("normalized duplicate must be rejected");
    assert!(matches!(err, Error::Conflict(_)));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_rename_rederives_slug_and_rechecks_collision() {
    let test_db = TestDatabase::new().await;
    let collections = &test_db.db.collections;

    let a = collections.create(create_req("Audio Archives")).await.unwrap();
    collections.create(create_req("Manuscripts")).await.unwrap();

    // Renaming regenerates the slug.
    let renamed = collections
        .update(
            a.id,
            UpdateCollectionRequest {
                title: Some("Oral Histories".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("rename");
    assert_eq!(renamed.slug, "oral-histories");

    // Renaming onto an existing slug is rejected.
    let err = collections
        .update(
            a.id,
            UpdateCollectionRequest {
                title: Some("Manuscripts!".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("collision on rename");
    assert!(matches!(err, Error::Conflict(_)));

    // Renaming to a casing variant of itself is allowed (self excluded).
    let same = collections
        .update(
            a.id,
            UpdateCollectionRequest {
                title: Some("ORAL HISTORIES".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("self-rename");
    assert_eq!(same.slug, "oral-histories");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_get_by_id_and_slug() {
    let test_db = TestDatabase::new().await;
    let collections = &test_db.db.collections;

    let created = collections.create(create_req("Glass Negatives")).await.unwrap();

    let by_id = collections
        .get(&CollectionRef::Id(created.id))
        .await
        .unwrap()
        .expect("fetch by id");
    let by_slug = collections
        .get(&CollectionRef::Slug("glass-negatives".to_string()))
        .await
        .unwrap()
        .expect("fetch by slug");
    assert_eq!(by_id.id, by_slug.id);
    assert_eq!(by_id.item_count, Some(0));

    assert!(collections
        .get(&CollectionRef::Slug("no-such-slug".to_string()))
        .await
        .unwrap()
        .is_none());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_title_without_alphanumerics_rejected() {
    let test_db = TestDatabase::new().await;

    let err = test_db
        .db
        .collections
        .create(create_req("!!!"))
        .await
        .expect_err("unsluggable title");
    assert!(matches!(err, Error::InvalidInput(_)));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_empty_update_rejected() {
    let test_db = TestDatabase::new().await;

    let created = test_db
        .db
        .collections
        .create(create_req("Postcards"))
        .await
        .unwrap();

    let err = test_db
        .db
        .collections
        .update(created.id, UpdateCollectionRequest::default())
        .await
        .expect_err("empty update");
    assert!(matches!(err, Error::InvalidInput(_)));

    test_db.cleanup().await;
}
