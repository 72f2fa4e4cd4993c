//! Full-text search implementation.
//!
//! Searches the per-item shadow records (`search_entries`) using
//! PostgreSQL tsvector with field-weighted ranking: title (A) >
//! description (B) > content (C). Snippets are generated by
//! `ts_headline` with `<mark>` delimiters. The count query shares the
//! row query's WHERE so the pagination envelope stays consistent.

use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use vitrine_core::{Error, ItemKind, Result, SearchHit, Visibility};

/// Full-text search provider over the item search index.
pub struct PgSearchIndex {
    pool: Pool<Postgres>,
}

impl PgSearchIndex {
    /// Create a new PgSearchIndex with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search the index, returning the matching page and the total count.
    ///
    /// `websearch_to_tsquery` gives users quoted-phrase and `-exclusion`
    /// operators without exposing raw tsquery syntax errors.
    pub async fn search(
        &self,
        query: &str,
        visibility: Visibility,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<SearchHit>, i64)> {
        let gate = if visibility.public_only() {
            "AND i.is_public AND c.is_public"
        } else {
            ""
        };

        let count_sql = format!(
            "SELECT COUNT(*) AS total
             FROM items i
             JOIN collections c ON i.collection_id = c.id
             JOIN search_entries se ON se.item_id = i.id
             WHERE se.tsv @@ websearch_to_tsquery('english', $1) {}",
            gate
        );
        let total: i64 = sqlx::query(&count_sql)
            .bind(query)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .get("total");

        let rows_sql = format!(
            "SELECT i.id, i.collection_id, i.title, i.description, i.item_type,
                    i.media_url, i.thumbnail_url, i.is_public, i.view_count,
                    i.created_at, i.updated_at,
                    c.title AS collection_title, c.slug AS collection_slug,
                    ts_rank(se.tsv, websearch_to_tsquery('english', $1), 32) AS score,
                    ts_headline('english',
                                concat_ws(' ', se.title, se.description, se.content),
                                websearch_to_tsquery('english', $1),
                                'StartSel=<mark>, StopSel=</mark>, MaxWords=32, MinWords=8, MaxFragments=1') AS snippet
             FROM items i
             JOIN collections c ON i.collection_id = c.id
             JOIN search_entries se ON se.item_id = i.id
             WHERE se.tsv @@ websearch_to_tsquery('english', $1) {}
             ORDER BY score DESC, i.id DESC
             LIMIT $2 OFFSET $3",
            gate
        );
        let rows = sqlx::query(&rows_sql)
            .bind(query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let hits = rows
            .into_iter()
            .map(|row| {
                let item_type: String = row.get("item_type");
                SearchHit {
                    id: row.get("id"),
                    collection_id: row.get("collection_id"),
                    title: row.get("title"),
                    description: row.get("description"),
                    item_type: item_type.parse().unwrap_or(ItemKind::Document),
                    media_url: row.get("media_url"),
                    thumbnail_url: row.get("thumbnail_url"),
                    is_public: row.get("is_public"),
                    view_count: row.get("view_count"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                    collection_title: row.get("collection_title"),
                    collection_slug: row.get("collection_slug"),
                    snippet: row.get("snippet"),
                    score: row.get::<Option<f32>, _>("score").unwrap_or(0.0),
                }
            })
            .collect();

        Ok((hits, total))
    }

    /// Whether an item currently has a search entry.
    pub async fn has_entry(&self, item_id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM search_entries WHERE item_id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.is_some())
    }
}
