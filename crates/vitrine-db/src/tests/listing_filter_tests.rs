//! Tests for item listing: filter composition, pagination/count
//! symmetry, and tag/metadata join semantics.

use std::collections::HashMap;

use crate::test_fixtures::{seed_collection, seed_item, TestDatabase};
use vitrine_core::{
    defaults, CreateItemRequest, Error, ItemFilter, ItemKind, ItemRepository, ListItemsRequest,
    UpdateItemRequest, Visibility,
};

fn filter_from(pairs: &[(&str, &str)]) -> ItemFilter {
    let params: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ItemFilter::from_params(&params)
}

fn list_req(filter: ItemFilter, limit: i64, offset: i64) -> ListItemsRequest {
    ListItemsRequest {
        filter,
        visibility: Visibility::All,
        limit,
        offset,
    }
}

/// `total` from the count query must equal the row count with pagination
/// effectively removed, for every filter combination exercised.
async fn assert_total_matches_rows(test_db: &TestDatabase, filter: ItemFilter) {
    let paged = test_db
        .db
        .items
        .list(list_req(filter.clone(), 1, 0))
        .await
        .expect("paged list");
    let unpaged = test_db
        .db
        .items
        .list(list_req(filter, i64::MAX, 0))
        .await
        .expect("unpaged list");
    assert_eq!(paged.total, unpaged.items.len() as i64);
    assert_eq!(paged.total, unpaged.total);
}

#[tokio::test]
async fn test_type_filter_with_pagination() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Mixed Media", true).await;

    seed_item(&test_db.db, collection, "Photo One", ItemKind::Image, true).await;
    seed_item(&test_db.db, collection, "Photo Two", ItemKind::Image, true).await;
    seed_item(&test_db.db, collection, "Charter", ItemKind::Document, true).await;
    seed_item(&test_db.db, collection, "Deed", ItemKind::Document, true).await;

    let response = test_db
        .db
        .items
        .list(list_req(filter_from(&[("type", "image")]), 2, 0))
        .await
        .expect("list images");

    assert_eq!(response.items.len(), 2);
    assert_eq!(response.total, 2);
    // hasMore arithmetic: offset + limit < total.
    let has_more = 0 + 2 < response.total;
    assert!(!has_more);
    assert!(response
        .items
        .iter()
        .all(|i| i.item_type == ItemKind::Image));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_ordering_is_newest_first() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Ordering", true).await;

    let first = seed_item(&test_db.db, collection, "Oldest", ItemKind::Image, true).await;
    let second = seed_item(&test_db.db, collection, "Middle", ItemKind::Image, true).await;
    let third = seed_item(&test_db.db, collection, "Newest", ItemKind::Image, true).await;

    let response = test_db
        .db
        .items
        .list(list_req(ItemFilter::default(), 10, 0))
        .await
        .unwrap();

    let ids: Vec<_> = response.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![third, second, first]);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_tag_filter_matches_any_linked_tag() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Tagged", true).await;

    let tagged = test_db
        .db
        .items
        .create(CreateItemRequest {
            collection_id: collection,
            title: "City Hall".to_string(),
            description: None,
            item_type: ItemKind::Image,
            media_url: "/media/city-hall.jpg".to_string(),
            thumbnail_url: None,
            metadata: None,
            rights_statement: None,
            is_public: true,
            created_by: None,
            tags: vec!["Architecture".to_string(), "Government".to_string()],
            metadata_fields: Default::default(),
            content: None,
        })
        .await
        .unwrap();
    seed_item(&test_db.db, collection, "Untagged", ItemKind::Image, true).await;

    let response = test_db
        .db
        .items
        .list(list_req(filter_from(&[("tag", "architecture")]), 10, 0))
        .await
        .unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].id, tagged);
    // Tag objects ride along on the summary.
    let slugs: Vec<_> = response.items[0].tags.iter().map(|t| t.slug.as_str()).collect();
    assert_eq!(slugs, vec!["architecture", "government"]);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_multiple_meta_filters_and_together() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Metadata", true).await;

    let mut both = HashMap::new();
    both.insert("creator".to_string(), "City Archives".to_string());
    both.insert("location".to_string(), "Main Street".to_string());

    let mut one = HashMap::new();
    one.insert("creator".to_string(), "City Archives".to_string());

    let matching = test_db
        .db
        .items
        .create(CreateItemRequest {
            collection_id: collection,
            title: "Matches Both".to_string(),
            description: None,
            item_type: ItemKind::Image,
            media_url: "/media/both.jpg".to_string(),
            thumbnail_url: None,
            metadata: None,
            rights_statement: None,
            is_public: true,
            created_by: None,
            tags: Vec::new(),
            metadata_fields: both,
            content: None,
        })
        .await
        .unwrap();

    test_db
        .db
        .items
        .create(CreateItemRequest {
            collection_id: collection,
            title: "Matches One".to_string(),
            description: None,
            item_type: ItemKind::Image,
            media_url: "/media/one.jpg".to_string(),
            thumbnail_url: None,
            metadata: None,
            rights_statement: None,
            is_public: true,
            created_by: None,
            tags: Vec::new(),
            metadata_fields: one,
            content: None,
        })
        .await
        .unwrap();

    let response = test_db
        .db
        .items
        .list(list_req(
            filter_from(&[
                ("meta_creator", "City Archives"),
                ("meta_location", "Main Street"),
            ]),
            10,
            0,
        ))
        .await
        .unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].id, matching);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_count_matches_rows_across_filter_combinations() {
    let test_db = TestDatabase::new().await;
    let public = seed_collection(&test_db.db, "Public Shelf", true).await;
    let other = seed_collection(&test_db.db, "Other Shelf", true).await;

    seed_item(&test_db.db, public, "A", ItemKind::Image, true).await;
    seed_item(&test_db.db, public, "B", ItemKind::Document, true).await;
    seed_item(&test_db.db, other, "C", ItemKind::Image, true).await;
    seed_item(&test_db.db, other, "D", ItemKind::Audio, false).await;

    assert_total_matches_rows(&test_db, ItemFilter::default()).await;
    assert_total_matches_rows(&test_db, filter_from(&[("type", "image")])).await;
    assert_total_matches_rows(&test_db, filter_from(&[("collection", "public-shelf")])).await;
    assert_total_matches_rows(
        &test_db,
        filter_from(&[("collection", "other-shelf"), ("type", "audio")]),
    )
    .await;

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_unknown_type_yields_empty_not_error() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Kinds", true).await;
    seed_item(&test_db.db, collection, "A", ItemKind::Image, true).await;

    let response = test_db
        .db
        .items
        .list(list_req(filter_from(&[("type", "hologram")]), 10, 0))
        .await
        .expect("unsatisfiable filter still succeeds");
    assert_eq!(response.total, 0);
    assert!(response.items.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_single_item_fetch_and_view_count() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Viewing", true).await;
    let id = seed_item(&test_db.db, collection, "Watched", ItemKind::Video, true).await;

    let detail = test_db.db.items.get(id).await.unwrap().expect("item exists");
    assert_eq!(detail.item.view_count, 0);
    assert_eq!(detail.item.thumbnail_url, detail.item.media_url);

    test_db.db.items.increment_view_count(id).await.unwrap();
    test_db.db.items.increment_view_count(id).await.unwrap();

    let detail = test_db.db.items.get(id).await.unwrap().unwrap();
    assert_eq!(detail.item.view_count, 2);

    assert!(test_db
        .db
        .items
        .get(vitrine_core::new_v7())
        .await
        .unwrap()
        .is_none());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_related_items_share_collection_or_tag() {
    let test_db = TestDatabase::new().await;
    let shelf_a = seed_collection(&test_db.db, "Shelf A", true).await;
    let shelf_b = seed_collection(&test_db.db, "Shelf B", true).await;

    let make = |collection, title: &str, tags: Vec<String>, is_public| CreateItemRequest {
        collection_id: collection,
        title: title.to_string(),
        description: None,
        item_type: ItemKind::Image,
        media_url: format!("/media/{}.jpg", title.to_lowercase().replace(' ', "-")),
        thumbnail_url: None,
        metadata: None,
        rights_statement: None,
        is_public,
        created_by: None,
        tags,
        metadata_fields: Default::default(),
        content: None,
    };

    let subject = test_db
        .db
        .items
        .create(make(shelf_a, "Subject", vec!["bridges".to_string()], true))
        .await
        .unwrap();
    let same_shelf = test_db
        .db
        .items
        .create(make(shelf_a, "Same Shelf", vec![], true))
        .await
        .unwrap();
    let shared_tag = test_db
        .db
        .items
        .create(make(shelf_b, "Shared Tag", vec!["bridges".to_string()], true))
        .await
        .unwrap();
    let private_neighbor = test_db
        .db
        .items
        .create(make(shelf_a, "Private Neighbor", vec![], false))
        .await
        .unwrap();
    let unrelated = test_db
        .db
        .items
        .create(make(shelf_b, "Unrelated", vec![], true))
        .await
        .unwrap();

    let detail = test_db.db.items.get(subject).await.unwrap().unwrap();
    let related: Vec<_> = detail.related_items.iter().map(|r| r.id).collect();

    assert!(related.contains(&same_shelf));
    assert!(related.contains(&shared_tag));
    assert!(!related.contains(&subject), "self is excluded");
    assert!(!related.contains(&private_neighbor), "private is excluded");
    assert!(!related.contains(&unrelated));
    assert!(related.len() as i64 <= defaults::RELATED_ITEMS_LIMIT);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_update_without_columns_rejected() {
    let test_db = TestDatabase::new().await;
    let collection = seed_collection(&test_db.db, "Updates", true).await;
    let id = seed_item(&test_db.db, collection, "Before", ItemKind::Image, true).await;

    let err = test_db
        .db
        .items
        .update(id, UpdateItemRequest::default())
        .await
        .expect_err("no updatable columns");
    assert!(matches!(err, Error::InvalidInput(_)));

    test_db
        .db
        .items
        .update(
            id,
            UpdateItemRequest {
                title: Some("After".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("title update");

    let detail = test_db.db.items.get(id).await.unwrap().unwrap();
    assert_eq!(detail.item.title, "After");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_create_requires_existing_collection() {
    let test_db = TestDatabase::new().await;

    let err = test_db
        .db
        .items
        .create(CreateItemRequest {
            collection_id: vitrine_core::new_v7(),
            title: "Orphan".to_string(),
            description: None,
            item_type: ItemKind::Image,
            media_url: "/media/orphan.jpg".to_string(),
            thumbnail_url: None,
            metadata: None,
            rights_statement: None,
            is_public: true,
            created_by: None,
            tags: Vec::new(),
            metadata_fields: Default::default(),
            content: None,
        })
        .await
        .expect_err("missing collection");
    assert!(matches!(err, Error::NotFound(_)));

    test_db.cleanup().await;
}
