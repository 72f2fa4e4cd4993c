//! Collection HTTP handlers.
//!
//! The `:id` path segment accepts an id or a slug for reads; writes
//! resolve the reference first, then act by id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use vitrine_core::{
    defaults, Collection, CollectionRef, CollectionRepository, CreateCollectionRequest,
    ItemRepository, ListCollectionsRequest, UpdateCollectionRequest,
};

use crate::handlers::auth::{Requester, RequireAuth};
use crate::handlers::items::delete_blobs;
use crate::{ApiError, AppState, PaginationMeta};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub struct ListCollectionsEnvelope {
    pub collections: Vec<Collection>,
    pub pagination: PaginationMeta,
}

/// `GET /api/collections`
pub async fn list_collections(
    State(state): State<AppState>,
    requester: Requester,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = defaults::page_params(query.limit, query.offset);

    let response = state
        .db
        .collections
        .list(ListCollectionsRequest {
            visibility: requester.visibility(),
            limit,
            offset,
        })
        .await?;

    Ok(Json(ListCollectionsEnvelope {
        pagination: PaginationMeta::new(response.total, limit, offset),
        collections: response.collections,
    }))
}

/// `GET /api/collections/:id` — id or slug; includes the item count.
pub async fn get_collection(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state
        .db
        .collections
        .get(&CollectionRef::parse(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    if !requester.visibility().allows(collection.is_public, true) {
        return Err(ApiError::Forbidden(
            "This collection is private".to_string(),
        ));
    }

    Ok(Json(collection))
}

#[derive(Debug, Deserialize)]
pub struct CreateCollectionBody {
    title: Option<String>,
    description: Option<String>,
    metadata: Option<JsonValue>,
    is_public: Option<bool>,
}

/// `POST /api/collections` (privileged) — derives the slug; duplicate
/// slugs are rejected with 400 "already exists".
pub async fn create_collection(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateCollectionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(title) = body.title.filter(|t| !t.is_empty()) else {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    };

    let collection = state
        .db
        .collections
        .create(CreateCollectionRequest {
            title,
            description: body.description,
            metadata: body.metadata,
            is_public: body.is_public.unwrap_or(true),
            created_by: Some(user.id),
        })
        .await?;

    tracing::info!(
        subsystem = "api",
        op = "create_collection",
        collection_id = %collection.id,
        slug = %collection.slug,
        "Collection created"
    );

    Ok((StatusCode::CREATED, Json(collection)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCollectionBody {
    title: Option<String>,
    description: Option<String>,
    thumbnail_url: Option<String>,
    metadata: Option<JsonValue>,
    is_public: Option<bool>,
}

/// `PUT /api/collections/:id` (privileged) — partial update; a title
/// change re-derives the slug.
pub async fn update_collection(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<String>,
    Json(body): Json<UpdateCollectionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state
        .db
        .collections
        .get(&CollectionRef::parse(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    let updated = state
        .db
        .collections
        .update(
            existing.id,
            UpdateCollectionRequest {
                title: body.title,
                description: body.description,
                thumbnail_url: body.thumbnail_url,
                metadata: body.metadata,
                is_public: body.is_public,
            },
        )
        .await?;

    Ok(Json(updated))
}

/// `DELETE /api/collections/:id` (privileged)
///
/// Item blobs are removed from storage first (best-effort), then the
/// collection and its dependents are deleted in one transaction.
pub async fn delete_collection(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state
        .db
        .collections
        .get(&CollectionRef::parse(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    if state.config.delete_blobs {
        if let Ok(store) = state.db.media_store() {
            let refs = state.db.items.media_refs_in_collection(existing.id).await?;
            for r in &refs {
                delete_blobs(store, &r.media_url, &r.thumbnail_url).await;
            }
        }
    }

    state.db.collections.delete(existing.id).await?;
    tracing::info!(
        subsystem = "api",
        op = "delete_collection",
        collection_id = %existing.id,
        "Collection deleted"
    );

    Ok(Json(serde_json::json!({ "success": true })))
}
