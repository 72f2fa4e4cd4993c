//! Repository traits for vitrine abstractions.
//!
//! These traits define the persistence-gateway interfaces the API layer
//! programs against, enabling pluggable backends and testability.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::filter::ItemFilter;
use crate::models::*;
use crate::visibility::Visibility;

// =============================================================================
// COLLECTION REPOSITORY
// =============================================================================

/// Request for listing collections.
#[derive(Debug, Clone, Default)]
pub struct ListCollectionsRequest {
    pub visibility: Visibility,
    pub limit: i64,
    pub offset: i64,
}

/// Response for listing collections.
#[derive(Debug, Clone)]
pub struct ListCollectionsResponse {
    pub collections: Vec<Collection>,
    /// Count of collections matching the visibility scope, ignoring
    /// pagination.
    pub total: i64,
}

/// Request for creating a collection. The slug is derived from the title.
#[derive(Debug, Clone)]
pub struct CreateCollectionRequest {
    pub title: String,
    pub description: Option<String>,
    pub metadata: Option<JsonValue>,
    pub is_public: bool,
    pub created_by: Option<Uuid>,
}

/// Partial update of a collection. Absent fields are left untouched; a
/// new title re-derives the slug.
#[derive(Debug, Clone, Default)]
pub struct UpdateCollectionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<JsonValue>,
    pub is_public: Option<bool>,
}

impl UpdateCollectionRequest {
    /// True when no recognized field is present.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.thumbnail_url.is_none()
            && self.metadata.is_none()
            && self.is_public.is_none()
    }
}

/// Persistence gateway for collections.
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn list(&self, req: ListCollectionsRequest) -> Result<ListCollectionsResponse>;

    /// Fetch by id or slug, including the item count. Visibility is the
    /// caller's concern: the row is returned regardless so the handler can
    /// distinguish forbidden from missing.
    async fn get(&self, r: &CollectionRef) -> Result<Option<Collection>>;

    /// Create with slug derivation; rejects with `Conflict` when another
    /// collection already owns the derived slug.
    async fn create(&self, req: CreateCollectionRequest) -> Result<Collection>;

    /// Partial update; re-derives and re-checks the slug when the title
    /// changes. Rejects with `InvalidInput` when the request is empty.
    async fn update(&self, id: Uuid, req: UpdateCollectionRequest) -> Result<Collection>;

    /// Delete the collection and, explicitly and transactionally, every
    /// dependent row (items, tag links, metadata values, search entries).
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// ITEM REPOSITORY
// =============================================================================

/// Request for listing items.
#[derive(Debug, Clone, Default)]
pub struct ListItemsRequest {
    pub filter: ItemFilter,
    pub visibility: Visibility,
    pub limit: i64,
    pub offset: i64,
}

/// Response for listing items. `total` comes from a count query sharing
/// the row query's exact filter clauses.
#[derive(Debug, Clone)]
pub struct ListItemsResponse {
    pub items: Vec<ItemSummary>,
    pub total: i64,
}

/// Request for creating an item.
#[derive(Debug, Clone)]
pub struct CreateItemRequest {
    pub collection_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub item_type: ItemKind,
    pub media_url: String,
    /// Defaults to `media_url` when absent.
    pub thumbnail_url: Option<String>,
    pub metadata: Option<JsonValue>,
    pub rights_statement: Option<String>,
    pub is_public: bool,
    pub created_by: Option<Uuid>,
    pub tags: Vec<String>,
    /// Metadata field values keyed by field name; names that match no
    /// configured field are skipped.
    pub metadata_fields: HashMap<String, String>,
    /// Free-text content for the search index.
    pub content: Option<String>,
}

/// Partial update of an item. Only the allowed columns participate in the
/// emptiness check; tag/metadata/content updates ride along.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<JsonValue>,
    pub rights_statement: Option<String>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub metadata_fields: Option<HashMap<String, String>>,
    pub content: Option<String>,
}

impl UpdateItemRequest {
    /// True when none of the updatable item columns is present.
    pub fn columns_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.media_url.is_none()
            && self.thumbnail_url.is_none()
            && self.metadata.is_none()
            && self.rights_statement.is_none()
            && self.is_public.is_none()
    }
}

/// Persistence gateway for items.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn list(&self, req: ListItemsRequest) -> Result<ListItemsResponse>;

    /// Full single-item fetch: tags, metadata field values, related items
    /// (public only). Returns the row regardless of visibility; the
    /// handler applies the gate.
    async fn get(&self, id: Uuid) -> Result<Option<ItemDetail>>;

    /// Create the item plus its tag links, metadata values, and search
    /// entry. Fails `NotFound` when the collection does not exist.
    async fn create(&self, req: CreateItemRequest) -> Result<Uuid>;

    /// Partial update. Fails `InvalidInput` when no updatable column is
    /// present; fails `NotFound` for an unknown id.
    async fn update(&self, id: Uuid, req: UpdateItemRequest) -> Result<()>;

    /// Delete the item row; dependent rows are removed in the same
    /// transaction. Blob cleanup is the caller's concern (gather keys via
    /// [`ItemRepository::media_refs`] first).
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Best-effort view counter bump; one increment per successful fetch.
    async fn increment_view_count(&self, id: Uuid) -> Result<()>;

    /// Media references for one item, or `None` when the item is unknown.
    async fn media_refs(&self, id: Uuid) -> Result<Option<MediaRefs>>;

    /// Media references for every item in a collection.
    async fn media_refs_in_collection(&self, collection_id: Uuid) -> Result<Vec<MediaRefs>>;
}

// =============================================================================
// TAG REPOSITORY
// =============================================================================

/// Persistence gateway for tags and item-tag links.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Insert-or-get by derived slug.
    async fn ensure(&self, name: &str) -> Result<Tag>;

    async fn for_item(&self, item_id: Uuid) -> Result<Vec<Tag>>;

    /// Replace an item's tag set with the given names (ensuring each tag
    /// exists first).
    async fn replace_for_item(&self, item_id: Uuid, names: &[String]) -> Result<Vec<Tag>>;
}

// =============================================================================
// METADATA FIELD REPOSITORY
// =============================================================================

/// Persistence gateway for configured metadata fields and per-item values.
#[async_trait]
pub trait MetadataFieldRepository: Send + Sync {
    /// All configured fields, ordered by display order.
    async fn list(&self) -> Result<Vec<MetadataField>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<MetadataField>>;

    /// Last-write-wins upsert of one (item, field) value.
    async fn upsert_value(&self, item_id: Uuid, field_id: Uuid, value: &str) -> Result<()>;

    async fn values_for_item(&self, item_id: Uuid) -> Result<Vec<ItemFieldValue>>;
}

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Request for creating a user. The password arrives pre-hashed; the
/// persistence layer never sees the plaintext.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
}

/// Persistence gateway for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn count(&self) -> Result<i64>;

    async fn create(&self, req: CreateUserRequest) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get(&self, id: Uuid) -> Result<Option<User>>;
}
