//! Full-text search handler.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use vitrine_core::{defaults, SearchHit};

use crate::handlers::auth::Requester;
use crate::{ApiError, AppState, PaginationMeta};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub struct SearchEnvelope {
    pub items: Vec<SearchHit>,
    pub pagination: PaginationMeta,
    pub query: String,
}

/// `GET /api/search?q=&limit=&offset=`
pub async fn search_items(
    State(state): State<AppState>,
    requester: Requester,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(q) = query.q.filter(|q| !q.is_empty()) else {
        return Err(ApiError::BadRequest(
            "Query parameter required".to_string(),
        ));
    };

    let (limit, offset) = defaults::page_params(query.limit, query.offset);

    let (hits, total) = state
        .db
        .search
        .search(&q, requester.visibility(), limit, offset)
        .await?;

    tracing::debug!(
        subsystem = "api",
        op = "search",
        query = %q,
        result_count = hits.len(),
        "Search executed"
    );

    Ok(Json(SearchEnvelope {
        pagination: PaginationMeta::new(total, limit, offset),
        items: hits,
        query: q,
    }))
}
