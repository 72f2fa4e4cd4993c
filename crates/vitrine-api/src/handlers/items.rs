//! Item HTTP handlers.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use vitrine_core::{
    defaults, CreateItemRequest, FacetGroup, ItemFilter, ItemKind, ItemRepository, ItemSummary,
    ListItemsRequest, UpdateItemRequest,
};
use vitrine_db::MediaStore;

use crate::handlers::auth::{Requester, RequireAuth};
use crate::{ApiError, AppState, PaginationMeta};

/// Build the `facets` response object keyed by field name.
fn facets_to_json(groups: Vec<FacetGroup>) -> JsonValue {
    let mut map = serde_json::Map::new();
    for group in groups {
        map.insert(
            group.name.clone(),
            serde_json::json!({
                "field_type": group.field_type,
                "values": group.values,
            }),
        );
    }
    JsonValue::Object(map)
}

#[derive(Debug, serde::Serialize)]
pub struct ListItemsEnvelope {
    pub items: Vec<ItemSummary>,
    pub pagination: PaginationMeta,
    /// Present only when `facets=true`; `null` otherwise.
    pub facets: Option<JsonValue>,
}

/// `GET /api/items`
///
/// Recognized query parameters: `collection`, `type`, `tag`,
/// `meta_<field>`, `limit`, `offset`, `facets`. Anything else is ignored.
pub async fn list_items(
    State(state): State<AppState>,
    requester: Requester,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = defaults::page_params(
        params.get("limit").and_then(|v| v.parse().ok()),
        params.get("offset").and_then(|v| v.parse().ok()),
    );
    let facets_requested = params.get("facets").map(|v| v == "true").unwrap_or(false);

    let visibility = requester.visibility();
    let response = state
        .db
        .items
        .list(ListItemsRequest {
            filter: ItemFilter::from_params(&params),
            visibility,
            limit,
            offset,
        })
        .await?;

    // Facets deliberately see the whole corpus under the visibility gate,
    // not the currently narrowed set.
    let facets = if facets_requested {
        Some(facets_to_json(state.db.facets.aggregate(visibility).await?))
    } else {
        None
    };

    Ok(Json(ListItemsEnvelope {
        pagination: PaginationMeta::new(response.total, limit, offset),
        items: response.items,
        facets,
    }))
}

/// `GET /api/items/:id`
///
/// Side effect: bumps the view counter once per successful fetch. The
/// returned payload carries the pre-increment count.
pub async fn get_item(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .db
        .items
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    // Exists-but-private is Forbidden, never NotFound.
    if !requester
        .visibility()
        .allows(detail.item.is_public, detail.collection_is_public)
    {
        return Err(ApiError::Forbidden("This item is private".to_string()));
    }

    state.db.items.increment_view_count(id).await?;

    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct CreateItemBody {
    collection_id: Option<Uuid>,
    title: Option<String>,
    description: Option<String>,
    item_type: Option<String>,
    media_url: Option<String>,
    thumbnail_url: Option<String>,
    metadata: Option<JsonValue>,
    rights_statement: Option<String>,
    is_public: Option<bool>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    metadata_fields: HashMap<String, String>,
    /// Free-text content for the search index.
    content: Option<String>,
}

/// `POST /api/items` (privileged)
pub async fn create_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateItemBody>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(collection_id), Some(title), Some(item_type)) =
        (body.collection_id, body.title, body.item_type)
    else {
        return Err(ApiError::BadRequest(
            "collection_id, title, and item_type are required".to_string(),
        ));
    };

    let item_type: ItemKind = item_type
        .parse()
        .map_err(|e: String| ApiError::BadRequest(e))?;
    let media_url = body
        .media_url
        .ok_or_else(|| ApiError::BadRequest("media_url is required".to_string()))?;

    let id = state
        .db
        .items
        .create(CreateItemRequest {
            collection_id,
            title,
            description: body.description,
            item_type,
            media_url,
            thumbnail_url: body.thumbnail_url,
            metadata: body.metadata,
            rights_statement: body.rights_statement,
            is_public: body.is_public.unwrap_or(true),
            created_by: Some(user.id),
            tags: body.tags,
            metadata_fields: body.metadata_fields,
            content: body.content,
        })
        .await?;

    tracing::info!(subsystem = "api", op = "create_item", item_id = %id, "Item created");

    let detail = state
        .db
        .items
        .get(id)
        .await?
        .ok_or_else(|| ApiError::Internal("Item vanished after insert".to_string()))?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemBody {
    title: Option<String>,
    description: Option<String>,
    media_url: Option<String>,
    thumbnail_url: Option<String>,
    metadata: Option<JsonValue>,
    rights_statement: Option<String>,
    is_public: Option<bool>,
    tags: Option<Vec<String>>,
    metadata_fields: Option<HashMap<String, String>>,
    content: Option<String>,
}

/// `PUT /api/items/:id` (privileged) — partial update; unknown body
/// fields are ignored by deserialization, absent ones left untouched.
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateItemBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .items
        .update(
            id,
            UpdateItemRequest {
                title: body.title,
                description: body.description,
                media_url: body.media_url,
                thumbnail_url: body.thumbnail_url,
                metadata: body.metadata,
                rights_statement: body.rights_statement,
                is_public: body.is_public,
                tags: body.tags,
                metadata_fields: body.metadata_fields,
                content: body.content,
            },
        )
        .await?;

    let detail = state
        .db
        .items
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;
    Ok(Json(detail))
}

/// `DELETE /api/items/:id` (privileged)
///
/// Blobs are deleted from storage first, best-effort: a failed blob
/// delete is logged and does not block the record delete.
pub async fn delete_item(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let refs = state
        .db
        .items
        .media_refs(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))?;

    if state.config.delete_blobs {
        if let Ok(store) = state.db.media_store() {
            delete_blobs(store, &refs.media_url, &refs.thumbnail_url).await;
        }
    }

    state.db.items.delete(id).await?;
    tracing::info!(subsystem = "api", op = "delete_item", item_id = %id, "Item deleted");

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Delete an item's blobs, skipping the thumbnail when it aliases the
/// media blob. Failures are logged, not propagated.
pub(crate) async fn delete_blobs(store: &MediaStore, media_url: &str, thumbnail_url: &str) {
    if let Some(key) = MediaStore::key_from_url(media_url) {
        if let Err(e) = store.delete(key).await {
            tracing::warn!(storage_key = %key, error = %e, "Blob delete failed");
        }
    }
    if thumbnail_url != media_url {
        let media_key = MediaStore::key_from_url(media_url);
        if let Some(key) = MediaStore::key_from_url(thumbnail_url) {
            // Thumbnail URLs may be transform-parameter aliases of the
            // media blob; only delete a genuinely distinct key.
            if Some(key) != media_key {
                if let Err(e) = store.delete(key).await {
                    tracing::warn!(storage_key = %key, error = %e, "Thumbnail blob delete failed");
                }
            }
        }
    }
}
