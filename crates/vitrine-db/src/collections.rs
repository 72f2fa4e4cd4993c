//! Collection repository implementation.
//!
//! Slugs are derived from titles on create and re-derived on rename, with
//! collision checks in both paths. Deletion removes every dependent row
//! in one explicit transaction rather than leaning on engine-specific
//! cascade configuration.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use vitrine_core::{
    new_v7, slugify, Collection, CollectionRef, CollectionRepository, CreateCollectionRequest,
    Error, ListCollectionsRequest, ListCollectionsResponse, Result, UpdateCollectionRequest,
};

use crate::filter::{bind_params, QueryParam};

const COLLECTION_COLUMNS: &str = "c.id, c.slug, c.title, c.description, c.metadata, c.is_public, \
     c.thumbnail_url, c.created_by, c.created_at, c.updated_at, \
     COALESCE((SELECT COUNT(*) FROM items WHERE collection_id = c.id), 0) AS item_count";

/// PostgreSQL implementation of CollectionRepository.
pub struct PgCollectionRepository {
    pool: Pool<Postgres>,
}

impl PgCollectionRepository {
    /// Create a new PgCollectionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<Collection>> {
        let sql = format!(
            "SELECT {} FROM collections c WHERE c.id = $1",
            COLLECTION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| collection_from_row(&r)))
    }

    /// Reject a slug already owned by another collection.
    async fn check_slug_free(
        tx: &mut Transaction<'_, Postgres>,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<()> {
        let existing = match exclude {
            Some(id) => sqlx::query("SELECT id FROM collections WHERE slug = $1 AND id != $2")
                .bind(slug)
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(Error::Database)?,
            None => sqlx::query("SELECT id FROM collections WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&mut **tx)
                .await
                .map_err(Error::Database)?,
        };

        if existing.is_some() {
            return Err(Error::Conflict(
                "Collection with this title already exists".to_string(),
            ));
        }
        Ok(())
    }
}

fn collection_from_row(row: &PgRow) -> Collection {
    Collection {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        metadata: row
            .get::<Option<serde_json::Value>, _>("metadata")
            .unwrap_or_else(|| serde_json::json!({})),
        is_public: row.get("is_public"),
        thumbnail_url: row.get("thumbnail_url"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        item_count: Some(row.get("item_count")),
    }
}

/// Derive and validate the slug for a title.
fn derive_slug(title: &str) -> Result<String> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(Error::InvalidInput(
            "Title must contain at least one alphanumeric character".to_string(),
        ));
    }
    Ok(slug)
}

#[async_trait]
impl CollectionRepository for PgCollectionRepository {
    async fn list(&self, req: ListCollectionsRequest) -> Result<ListCollectionsResponse> {
        let visibility_clause = if req.visibility.public_only() {
            "WHERE c.is_public"
        } else {
            ""
        };

        let count_sql = format!(
            "SELECT COUNT(*) AS total FROM collections c {}",
            visibility_clause
        );
        let total: i64 = sqlx::query(&count_sql)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .get("total");

        let rows_sql = format!(
            "SELECT {} FROM collections c {}
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT $1 OFFSET $2",
            COLLECTION_COLUMNS, visibility_clause
        );
        let rows = sqlx::query(&rows_sql)
            .bind(req.limit)
            .bind(req.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(ListCollectionsResponse {
            collections: rows.iter().map(collection_from_row).collect(),
            total,
        })
    }

    async fn get(&self, r: &CollectionRef) -> Result<Option<Collection>> {
        match r {
            CollectionRef::Id(id) => self.fetch_by_id(*id).await,
            CollectionRef::Slug(slug) => {
                let sql = format!(
                    "SELECT {} FROM collections c WHERE c.slug = $1",
                    COLLECTION_COLUMNS
                );
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(Error::Database)?;
                Ok(row.map(|r| collection_from_row(&r)))
            }
        }
    }

    async fn create(&self, req: CreateCollectionRequest) -> Result<Collection> {
        let slug = derive_slug(&req.title)?;
        let id = new_v7();
        let metadata = req.metadata.unwrap_or_else(|| serde_json::json!({}));

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        Self::check_slug_free(&mut tx, &slug, None).await?;

        sqlx::query(
            "INSERT INTO collections (id, slug, title, description, metadata, is_public, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&slug)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&metadata)
        .bind(req.is_public)
        .bind(req.created_by)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        self.fetch_by_id(id)
            .await?
            .ok_or_else(|| Error::Internal("Collection vanished after insert".to_string()))
    }

    async fn update(&self, id: Uuid, req: UpdateCollectionRequest) -> Result<Collection> {
        if req.is_empty() {
            return Err(Error::InvalidInput("No fields to update".to_string()));
        }

        let mut sets: Vec<String> = Vec::new();
        let mut params: Vec<QueryParam> = Vec::new();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        if let Some(title) = &req.title {
            // A new title means a new slug, re-checked for collisions
            // against everything but this collection.
            let slug = derive_slug(title)?;
            Self::check_slug_free(&mut tx, &slug, Some(id)).await?;

            params.push(QueryParam::String(title.clone()));
            sets.push(format!("title = ${}", params.len()));
            params.push(QueryParam::String(slug));
            sets.push(format!("slug = ${}", params.len()));
        }
        if let Some(v) = &req.description {
            params.push(QueryParam::String(v.clone()));
            sets.push(format!("description = ${}", params.len()));
        }
        if let Some(v) = &req.thumbnail_url {
            params.push(QueryParam::String(v.clone()));
            sets.push(format!("thumbnail_url = ${}", params.len()));
        }
        if let Some(v) = &req.metadata {
            params.push(QueryParam::Json(v.clone()));
            sets.push(format!("metadata = ${}", params.len()));
        }
        if let Some(v) = req.is_public {
            params.push(QueryParam::Bool(v));
            sets.push(format!("is_public = ${}", params.len()));
        }
        sets.push("updated_at = now()".to_string());

        let sql = format!(
            "UPDATE collections SET {} WHERE id = ${}",
            sets.join(", "),
            params.len() + 1
        );
        let result = bind_params(sqlx::query(&sql), &params)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Collection not found".to_string()));
        }

        tx.commit().await.map_err(Error::Database)?;

        self.fetch_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound("Collection not found".to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let existing = sqlx::query("SELECT id FROM collections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        if existing.is_none() {
            return Err(Error::NotFound("Collection not found".to_string()));
        }

        // Explicit cascade: metadata values, tag links, and search entries
        // for every item in the collection, then the items, then the
        // collection row itself.
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "DELETE FROM item_metadata
             WHERE item_id IN (SELECT id FROM items WHERE collection_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query(
            "DELETE FROM item_tags
             WHERE item_id IN (SELECT id FROM items WHERE collection_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query(
            "DELETE FROM search_entries
             WHERE item_id IN (SELECT id FROM items WHERE collection_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("DELETE FROM items WHERE collection_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
