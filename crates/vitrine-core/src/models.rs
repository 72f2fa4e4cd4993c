//! Core data models for vitrine.
//!
//! These types are shared across all vitrine crates and represent the
//! domain entities: collections, items, tags, metadata fields, users,
//! and the aggregates derived from them (facets, search hits).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// ITEM KIND
// =============================================================================

/// Closed set of item kinds.
///
/// Every item is exactly one of these; handlers dispatch by exhaustive
/// matching rather than inspecting MIME strings at render time. The wire
/// name for `Model3d` is `3d` for compatibility with existing clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "document")]
    Document,
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "3d")]
    Model3d,
}

impl ItemKind {
    /// All kinds, in display order.
    pub const ALL: [ItemKind; 5] = [
        ItemKind::Image,
        ItemKind::Document,
        ItemKind::Audio,
        ItemKind::Video,
        ItemKind::Model3d,
    ];

    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Model3d => "3d",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "3d" | "3d-model" | "model" => Ok(Self::Model3d),
            _ => Err(format!("Invalid item type: {}", s)),
        }
    }
}

// =============================================================================
// COLLECTIONS
// =============================================================================

/// A named grouping of items, public or private.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    /// URL-safe unique identifier derived from the title.
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    /// Arbitrary key-value metadata, opaque to the core.
    pub metadata: JsonValue,
    pub is_public: bool,
    pub thumbnail_url: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of items in the collection. Populated on single-collection
    /// fetch; omitted from the wire when not computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
}

/// Reference to a collection by either id or slug.
///
/// Public URLs use slugs, admin tooling uses ids; anything that parses as
/// a UUID is treated as an id, everything else as a slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionRef {
    Id(Uuid),
    Slug(String),
}

impl CollectionRef {
    pub fn parse(s: &str) -> Self {
        match Uuid::parse_str(s) {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Slug(s.to_string()),
        }
    }
}

impl std::str::FromStr for CollectionRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

// =============================================================================
// ITEMS
// =============================================================================

/// An item row as returned by list queries: the item itself plus the
/// joined collection title/slug and its tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub item_type: ItemKind,
    pub media_url: String,
    pub thumbnail_url: String,
    pub metadata: JsonValue,
    pub rights_statement: Option<String>,
    pub is_public: bool,
    pub view_count: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub collection_title: String,
    pub collection_slug: String,
    pub tags: Vec<Tag>,
}

/// Full single-item payload: summary plus metadata field values and
/// related items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: ItemSummary,
    /// Owning collection's visibility flag, used by the visibility gate
    /// before the payload is released. Never serialized.
    #[serde(skip_serializing, default)]
    pub collection_is_public: bool,
    pub metadata_fields: Vec<ItemFieldValue>,
    pub related_items: Vec<RelatedItem>,
}

/// Compact representation of a related item (same collection or shared tag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedItem {
    pub id: Uuid,
    pub title: String,
    pub thumbnail_url: String,
    pub item_type: ItemKind,
}

/// Media storage keys referenced by an item, gathered before deletion so
/// blobs can be removed from storage first.
#[derive(Debug, Clone)]
pub struct MediaRefs {
    pub media_url: String,
    pub thumbnail_url: String,
}

// =============================================================================
// TAGS
// =============================================================================

/// A flat tag. Slug is unique; display name keeps the original casing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

// =============================================================================
// METADATA FIELDS
// =============================================================================

/// Type of a configured metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Date,
    Enum,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Enum => "enum",
        }
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "date" => Ok(Self::Date),
            "enum" => Ok(Self::Enum),
            _ => Err(format!("Invalid field type: {}", s)),
        }
    }
}

/// A configured metadata field. The name doubles as the `meta_<name>`
/// filter-query key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataField {
    pub id: Uuid,
    pub name: String,
    pub field_type: FieldType,
    /// Whether the field participates in facet aggregation.
    pub is_facet: bool,
    pub display_order: i32,
}

/// A (field, value) pair attached to an item, as returned on single-item
/// fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFieldValue {
    pub name: String,
    pub field_type: FieldType,
    pub value: String,
}

// =============================================================================
// FACETS
// =============================================================================

/// One distinct value and the number of distinct items holding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub count: i64,
}

/// Aggregated counts for one facet field (or the implicit `type` facet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetGroup {
    /// Facet key in the response map: the metadata field name, or `type`.
    #[serde(skip_serializing, default)]
    pub name: String,
    pub field_type: FieldType,
    pub values: Vec<FacetValue>,
}

// =============================================================================
// SEARCH
// =============================================================================

/// A full-text search hit: the matching item plus a highlighted snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub item_type: ItemKind,
    pub media_url: String,
    pub thumbnail_url: String,
    pub is_public: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub collection_title: String,
    pub collection_slug: String,
    /// Query-highlighted excerpt (`<mark>` delimiters).
    pub snippet: String,
    pub score: f32,
}

// =============================================================================
// USERS
// =============================================================================

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Editor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// An account that can administer collections and items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2id hash, never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_item_kind_round_trip() {
        for kind in ItemKind::ALL {
            assert_eq!(ItemKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn test_item_kind_model3d_wire_name() {
        let json = serde_json::to_string(&ItemKind::Model3d).unwrap();
        assert_eq!(json, "\"3d\"");
        let back: ItemKind = serde_json::from_str("\"3d\"").unwrap();
        assert_eq!(back, ItemKind::Model3d);
    }

    #[test]
    fn test_item_kind_rejects_unknown() {
        assert!(ItemKind::from_str("hologram").is_err());
    }

    #[test]
    fn test_collection_ref_parse() {
        let id = Uuid::now_v7();
        assert_eq!(
            CollectionRef::parse(&id.to_string()),
            CollectionRef::Id(id)
        );
        assert_eq!(
            CollectionRef::parse("historical-photos"),
            CollectionRef::Slug("historical-photos".to_string())
        );
    }
}
