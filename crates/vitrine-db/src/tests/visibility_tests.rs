//! Tests for the visibility gate across listing, single fetch, search,
//! and facet aggregation.

use std::collections::HashMap;

use crate::facets::PgFacetAggregator;
use crate::test_fixtures::{seed_collection, seed_item, TestDatabase};
use vitrine_core::{
    CollectionRepository, CreateItemRequest, ItemFilter, ItemKind, ItemRepository,
    ListCollectionsRequest, ListItemsRequest, Visibility,
};

fn public_list(filter: ItemFilter) -> ListItemsRequest {
    ListItemsRequest {
        filter,
        visibility: Visibility::PublicOnly,
        limit: 50,
        offset: 0,
    }
}

#[tokio::test]
async fn test_unprivileged_listing_hides_private_rows() {
    let test_db = TestDatabase::new().await;
    let public = seed_collection(&test_db.db, "Public Wing", true).await;
    let private = seed_collection(&test_db.db, "Private Wing", false).await;

    seed_item(&test_db.db, public, "Visible", ItemKind::Image, true).await;
    // Private item in a public collection.
    seed_item(&test_db.db, public, "Hidden Item", ItemKind::Image, false).await;
    // Public item in a private collection: the conjunction hides it too.
    seed_item(&test_db.db, private, "Hidden By Collection", ItemKind::Image, true).await;

    let response = test_db
        .db
        .items
        .list(public_list(ItemFilter::default()))
        .await
        .unwrap();

    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].title, "Visible");
    assert!(response.items.iter().all(|i| i.is_public));

    // Privileged scope sees everything.
    let all = test_db
        .db
        .items
        .list(ListItemsRequest {
            filter: ItemFilter::default(),
            visibility: Visibility::All,
            limit: 50,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_private_collection_filter_does_not_leak() {
    let test_db = TestDatabase::new().await;
    let private = seed_collection(&test_db.db, "Vault", false).await;
    seed_item(&test_db.db, private, "Sealed", ItemKind::Document, true).await;

    // Explicitly filtering by the private collection's id still returns
    // nothing to an unprivileged requester.
    let mut params = HashMap::new();
    params.insert("collection".to_string(), private.to_string());
    let response = test_db
        .db
        .items
        .list(public_list(ItemFilter::from_params(&params)))
        .await
        .unwrap();

    assert_eq!(response.total, 0);
    assert!(response.items.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_collection_listing_respects_visibility() {
    let test_db = TestDatabase::new().await;
    seed_collection(&test_db.db, "Open Stacks", true).await;
    seed_collection(&test_db.db, "Closed Stacks", false).await;

    let public_view = test_db
        .db
        .collections
        .list(ListCollectionsRequest {
            visibility: Visibility::PublicOnly,
            limit: 50,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(public_view.total, 1);
    assert!(public_view.collections.iter().all(|c| c.is_public));

    let admin_view = test_db
        .db
        .collections
        .list(ListCollectionsRequest {
            visibility: Visibility::All,
            limit: 50,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(admin_view.total, 2);

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_forbidden_vs_missing_on_single_fetch() {
    let test_db = TestDatabase::new().await;
    let private = seed_collection(&test_db.db, "Restricted", false).await;
    let id = seed_item(&test_db.db, private, "Classified", ItemKind::Image, true).await;

    // The repository returns the row; the visibility policy decides.
    let detail = test_db.db.items.get(id).await.unwrap().expect("row exists");
    let visibility = Visibility::for_privileged(false);
    assert!(!visibility.allows(detail.item.is_public, detail.collection_is_public));
    assert!(Visibility::for_privileged(true)
        .allows(detail.item.is_public, detail.collection_is_public));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_type_facet_counts_match_visible_items() {
    let test_db = TestDatabase::new().await;
    let public = seed_collection(&test_db.db, "Gallery", true).await;
    let private = seed_collection(&test_db.db, "Backroom", false).await;

    seed_item(&test_db.db, public, "Img A", ItemKind::Image, true).await;
    seed_item(&test_db.db, public, "Img B", ItemKind::Image, true).await;
    seed_item(&test_db.db, public, "Doc A", ItemKind::Document, true).await;
    // Not visibility-qualifying: private item, and items of a private
    // collection.
    seed_item(&test_db.db, public, "Img Hidden", ItemKind::Image, false).await;
    seed_item(&test_db.db, private, "Audio Hidden", ItemKind::Audio, true).await;

    let groups = test_db
        .db
        .facets
        .aggregate(Visibility::PublicOnly)
        .await
        .unwrap();

    assert_eq!(
        PgFacetAggregator::type_count(&groups, ItemKind::Image),
        Some(2)
    );
    assert_eq!(
        PgFacetAggregator::type_count(&groups, ItemKind::Document),
        Some(1)
    );
    // Kinds with zero qualifying items are absent, not zero-valued.
    assert_eq!(PgFacetAggregator::type_count(&groups, ItemKind::Audio), None);
    assert_eq!(PgFacetAggregator::type_count(&groups, ItemKind::Video), None);

    // The privileged scope counts the hidden rows too.
    let groups = test_db.db.facets.aggregate(Visibility::All).await.unwrap();
    assert_eq!(
        PgFacetAggregator::type_count(&groups, ItemKind::Image),
        Some(3)
    );
    assert_eq!(
        PgFacetAggregator::type_count(&groups, ItemKind::Audio),
        Some(1)
    );

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_metadata_facets_gate_and_ordering() {
    let test_db = TestDatabase::new().await;
    let public = seed_collection(&test_db.db, "Facetable", true).await;

    let with_creator = |title: &str, creator: &str, is_public| {
        let mut fields = HashMap::new();
        fields.insert("creator".to_string(), creator.to_string());
        CreateItemRequest {
            collection_id: public,
            title: title.to_string(),
            description: None,
            item_type: ItemKind::Image,
            media_url: format!("/media/{}.jpg", title.to_lowercase().replace(' ', "-")),
            thumbnail_url: None,
            metadata: None,
            rights_statement: None,
            is_public,
            created_by: None,
            tags: Vec::new(),
            metadata_fields: fields,
            content: None,
        }
    };

    test_db.db.items.create(with_creator("P1", "Archives", true)).await.unwrap();
    test_db.db.items.create(with_creator("P2", "Archives", true)).await.unwrap();
    test_db.db.items.create(with_creator("P3", "Donor", true)).await.unwrap();
    test_db.db.items.create(with_creator("P4", "Donor", false)).await.unwrap();

    let groups = test_db
        .db
        .facets
        .aggregate(Visibility::PublicOnly)
        .await
        .unwrap();

    let creator = groups
        .iter()
        .find(|g| g.name == "creator")
        .expect("creator facet present");
    // Count descending: Archives (2) before Donor (1); the private item
    // does not count.
    assert_eq!(creator.values[0].value, "Archives");
    assert_eq!(creator.values[0].count, 2);
    assert_eq!(creator.values[1].value, "Donor");
    assert_eq!(creator.values[1].count, 1);

    // Facet-eligible fields with no values at all are omitted.
    assert!(groups.iter().all(|g| g.name != "location"));
    // The implicit type facet is always last and always present.
    assert_eq!(groups.last().unwrap().name, "type");

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_search_respects_visibility_gate() {
    let test_db = TestDatabase::new().await;
    let public = seed_collection(&test_db.db, "Search Wing", true).await;

    let photograph = test_db
        .db
        .items
        .create(CreateItemRequest {
            collection_id: public,
            title: "Lighthouse Photograph".to_string(),
            description: Some("A lighthouse at dusk".to_string()),
            item_type: ItemKind::Image,
            media_url: "/media/lighthouse.jpg".to_string(),
            thumbnail_url: None,
            metadata: None,
            rights_statement: None,
            is_public: true,
            created_by: None,
            tags: Vec::new(),
            metadata_fields: Default::default(),
            content: Some("coastal lighthouse maritime navigation".to_string()),
        })
        .await
        .unwrap();

    // The search entry is written as part of item creation.
    assert!(test_db.db.search.has_entry(photograph).await.unwrap());

    test_db
        .db
        .items
        .create(CreateItemRequest {
            collection_id: public,
            title: "Private Lighthouse Plans".to_string(),
            description: None,
            item_type: ItemKind::Document,
            media_url: "/media/plans.pdf".to_string(),
            thumbnail_url: None,
            metadata: None,
            rights_statement: None,
            is_public: false,
            created_by: None,
            tags: Vec::new(),
            metadata_fields: Default::default(),
            content: None,
        })
        .await
        .unwrap();

    let (hits, total) = test_db
        .db
        .search
        .search("lighthouse", Visibility::PublicOnly, 20, 0)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Lighthouse Photograph");
    assert!(hits[0].snippet.contains("<mark>"), "snippet: {}", hits[0].snippet);

    let (_, total_privileged) = test_db
        .db
        .search
        .search("lighthouse", Visibility::All, 20, 0)
        .await
        .unwrap();
    assert_eq!(total_privileged, 2);

    test_db.cleanup().await;
}
