//! Item repository implementation.
//!
//! The listing path compiles the request filter once and feeds the same
//! WHERE fragment to both the row query and the count query, so the
//! pagination total always agrees with the filtered set.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use vitrine_core::{
    defaults, new_v7, slugify, CreateItemRequest, Error, ItemDetail, ItemKind, ItemRepository,
    ItemSummary, ListItemsRequest, ListItemsResponse, MediaRefs, RelatedItem, Result, Tag,
    UpdateItemRequest,
};

use crate::filter::{bind_params, ItemFilterQueryBuilder, QueryParam};

/// Columns selected by every item row query, joined with the owning
/// collection's title and slug.
const ITEM_COLUMNS: &str = "i.id, i.collection_id, i.title, i.description, i.item_type, \
     i.media_url, i.thumbnail_url, i.metadata, i.rights_statement, i.is_public, \
     i.view_count, i.created_by, i.created_at, i.updated_at, \
     c.title AS collection_title, c.slug AS collection_slug";

/// PostgreSQL implementation of ItemRepository.
pub struct PgItemRepository {
    pool: Pool<Postgres>,
}

impl PgItemRepository {
    /// Create a new PgItemRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fetch tags for a page of items in one round trip.
    async fn tags_for_items(&self, item_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Tag>>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT it.item_id, t.id, t.name, t.slug
             FROM item_tags it
             JOIN tags t ON t.id = it.tag_id
             WHERE it.item_id = ANY($1)
             ORDER BY t.slug",
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut by_item: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_item
                .entry(row.get("item_id"))
                .or_default()
                .push(Tag {
                    id: row.get("id"),
                    name: row.get("name"),
                    slug: row.get("slug"),
                });
        }
        Ok(by_item)
    }

    /// Ensure a tag exists and link it to the item, within a transaction.
    async fn link_tag_tx(
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
        name: &str,
    ) -> Result<()> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Ok(());
        }

        sqlx::query("INSERT INTO tags (id, name, slug) VALUES ($1, $2, $3) ON CONFLICT (slug) DO NOTHING")
            .bind(new_v7())
            .bind(name)
            .bind(&slug)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        let tag_id: Uuid = sqlx::query("SELECT id FROM tags WHERE slug = $1")
            .bind(&slug)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?
            .get("id");

        sqlx::query(
            "INSERT INTO item_tags (item_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(item_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    /// Upsert metadata values for an item, skipping names that match no
    /// configured field, within a transaction.
    async fn upsert_metadata_tx(
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
        values: &HashMap<String, String>,
    ) -> Result<()> {
        for (name, value) in values {
            let field = sqlx::query("SELECT id FROM metadata_fields WHERE name = $1")
                .bind(name)
                .fetch_optional(&mut **tx)
                .await
                .map_err(Error::Database)?;

            if let Some(field) = field {
                let field_id: Uuid = field.get("id");
                sqlx::query(
                    "INSERT INTO item_metadata (item_id, field_id, value) VALUES ($1, $2, $3)
                     ON CONFLICT (item_id, field_id) DO UPDATE SET value = EXCLUDED.value",
                )
                .bind(item_id)
                .bind(field_id)
                .bind(value)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
            }
        }
        Ok(())
    }
}

fn item_summary_from_row(row: &PgRow) -> ItemSummary {
    let item_type: String = row.get("item_type");
    ItemSummary {
        id: row.get("id"),
        collection_id: row.get("collection_id"),
        title: row.get("title"),
        description: row.get("description"),
        item_type: item_type.parse().unwrap_or(ItemKind::Document),
        media_url: row.get("media_url"),
        thumbnail_url: row.get("thumbnail_url"),
        metadata: row
            .get::<Option<serde_json::Value>, _>("metadata")
            .unwrap_or_else(|| serde_json::json!({})),
        rights_statement: row.get("rights_statement"),
        is_public: row.get("is_public"),
        view_count: row.get("view_count"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        collection_title: row.get("collection_title"),
        collection_slug: row.get("collection_slug"),
        tags: Vec::new(),
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    async fn list(&self, req: ListItemsRequest) -> Result<ListItemsResponse> {
        let compiled = ItemFilterQueryBuilder::new(req.filter, req.visibility, 0).build();

        // Count query: identical filter clauses, no pagination.
        let count_sql = format!(
            "SELECT COUNT(*) AS total
             FROM items i
             JOIN collections c ON i.collection_id = c.id
             WHERE {}",
            compiled.where_clause
        );
        let total: i64 = bind_params(sqlx::query(&count_sql), &compiled.params)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .get("total");

        let limit_idx = compiled.next_placeholder(0);
        let offset_idx = limit_idx + 1;
        let rows_sql = format!(
            "SELECT {}
             FROM items i
             JOIN collections c ON i.collection_id = c.id
             WHERE {}
             ORDER BY i.created_at DESC, i.id DESC
             LIMIT ${} OFFSET ${}",
            ITEM_COLUMNS, compiled.where_clause, limit_idx, offset_idx
        );
        let rows = bind_params(sqlx::query(&rows_sql), &compiled.params)
            .bind(req.limit)
            .bind(req.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut items: Vec<ItemSummary> = rows.iter().map(item_summary_from_row).collect();

        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let mut tags = self.tags_for_items(&ids).await?;
        for item in &mut items {
            item.tags = tags.remove(&item.id).unwrap_or_default();
        }

        Ok(ListItemsResponse { items, total })
    }

    async fn get(&self, id: Uuid) -> Result<Option<ItemDetail>> {
        let sql = format!(
            "SELECT {}, c.is_public AS collection_is_public
             FROM items i
             JOIN collections c ON i.collection_id = c.id
             WHERE i.id = $1",
            ITEM_COLUMNS
        );
        let Some(row) = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
        else {
            return Ok(None);
        };

        let mut item = item_summary_from_row(&row);
        let collection_is_public: bool = row.get("collection_is_public");

        let mut tags = self.tags_for_items(&[id]).await?;
        item.tags = tags.remove(&id).unwrap_or_default();

        let metadata_fields = sqlx::query(
            "SELECT mf.name, mf.field_type, im.value
             FROM item_metadata im
             JOIN metadata_fields mf ON im.field_id = mf.id
             WHERE im.item_id = $1
             ORDER BY mf.display_order",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .map(|row| {
            let field_type: String = row.get("field_type");
            vitrine_core::ItemFieldValue {
                name: row.get("name"),
                field_type: field_type.parse().unwrap_or(vitrine_core::FieldType::Text),
                value: row.get("value"),
            }
        })
        .collect();

        // Related: same collection or shared tag, excluding self, public
        // only (item and owning collection both).
        let related_items = sqlx::query(
            "SELECT DISTINCT i.id, i.title, i.thumbnail_url, i.item_type
             FROM items i
             JOIN collections c ON i.collection_id = c.id
             WHERE i.id != $1
               AND i.is_public AND c.is_public
               AND (
                 i.collection_id = $2
                 OR EXISTS (
                   SELECT 1 FROM item_tags it1
                   JOIN item_tags it2 ON it1.tag_id = it2.tag_id
                   WHERE it1.item_id = i.id AND it2.item_id = $1
                 )
               )
             LIMIT $3",
        )
        .bind(id)
        .bind(item.collection_id)
        .bind(defaults::RELATED_ITEMS_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?
        .into_iter()
        .map(|row| {
            let item_type: String = row.get("item_type");
            RelatedItem {
                id: row.get("id"),
                title: row.get("title"),
                thumbnail_url: row.get("thumbnail_url"),
                item_type: item_type.parse().unwrap_or(ItemKind::Document),
            }
        })
        .collect();

        Ok(Some(ItemDetail {
            item,
            collection_is_public,
            metadata_fields,
            related_items,
        }))
    }

    async fn create(&self, req: CreateItemRequest) -> Result<Uuid> {
        let collection = sqlx::query("SELECT id FROM collections WHERE id = $1")
            .bind(req.collection_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        if collection.is_none() {
            return Err(Error::NotFound("Collection not found".to_string()));
        }

        let id = new_v7();
        let thumbnail_url = req
            .thumbnail_url
            .clone()
            .unwrap_or_else(|| req.media_url.clone());
        let metadata = req.metadata.clone().unwrap_or_else(|| serde_json::json!({}));

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO items (
                id, collection_id, title, description, item_type, media_url,
                thumbnail_url, metadata, rights_statement, is_public, created_by
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(id)
        .bind(req.collection_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.item_type.as_str())
        .bind(&req.media_url)
        .bind(&thumbnail_url)
        .bind(&metadata)
        .bind(&req.rights_statement)
        .bind(req.is_public)
        .bind(req.created_by)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        for name in &req.tags {
            Self::link_tag_tx(&mut tx, id, name).await?;
        }

        Self::upsert_metadata_tx(&mut tx, id, &req.metadata_fields).await?;

        sqlx::query(
            "INSERT INTO search_entries (item_id, title, description, content)
             VALUES ($1, $2, $3, COALESCE($4, ''))
             ON CONFLICT (item_id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                content = EXCLUDED.content",
        )
        .bind(id)
        .bind(&req.title)
        .bind(req.description.clone().unwrap_or_default())
        .bind(&req.content)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, req: UpdateItemRequest) -> Result<()> {
        if req.columns_empty() {
            return Err(Error::InvalidInput("No fields to update".to_string()));
        }

        let mut sets: Vec<String> = Vec::new();
        let mut params: Vec<QueryParam> = Vec::new();

        if let Some(v) = &req.title {
            params.push(QueryParam::String(v.clone()));
            sets.push(format!("title = ${}", params.len()));
        }
        if let Some(v) = &req.description {
            params.push(QueryParam::String(v.clone()));
            sets.push(format!("description = ${}", params.len()));
        }
        if let Some(v) = &req.media_url {
            params.push(QueryParam::String(v.clone()));
            sets.push(format!("media_url = ${}", params.len()));
        }
        if let Some(v) = &req.thumbnail_url {
            params.push(QueryParam::String(v.clone()));
            sets.push(format!("thumbnail_url = ${}", params.len()));
        }
        if let Some(v) = &req.metadata {
            params.push(QueryParam::Json(v.clone()));
            sets.push(format!("metadata = ${}", params.len()));
        }
        if let Some(v) = &req.rights_statement {
            params.push(QueryParam::String(v.clone()));
            sets.push(format!("rights_statement = ${}", params.len()));
        }
        if let Some(v) = req.is_public {
            params.push(QueryParam::Bool(v));
            sets.push(format!("is_public = ${}", params.len()));
        }
        sets.push("updated_at = now()".to_string());

        let sql = format!(
            "UPDATE items SET {} WHERE id = ${}",
            sets.join(", "),
            params.len() + 1
        );

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let result = bind_params(sqlx::query(&sql), &params)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Item not found".to_string()));
        }

        if let Some(tags) = &req.tags {
            sqlx::query("DELETE FROM item_tags WHERE item_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            for name in tags {
                Self::link_tag_tx(&mut tx, id, name).await?;
            }
        }

        if let Some(values) = &req.metadata_fields {
            Self::upsert_metadata_tx(&mut tx, id, values).await?;
        }

        // Keep the search entry in step with the item's text; content is
        // only replaced when the caller supplied it.
        sqlx::query(
            "INSERT INTO search_entries (item_id, title, description, content)
             SELECT i.id, i.title, COALESCE(i.description, ''), COALESCE($2, '')
             FROM items i WHERE i.id = $1
             ON CONFLICT (item_id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                content = COALESCE($2, search_entries.content)",
        )
        .bind(id)
        .bind(&req.content)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let existing = sqlx::query("SELECT id FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        if existing.is_none() {
            return Err(Error::NotFound("Item not found".to_string()));
        }

        // Dependent rows are removed explicitly so the cascade works the
        // same on any backing store, FK configuration or not.
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM item_metadata WHERE item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("DELETE FROM item_tags WHERE item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("DELETE FROM search_entries WHERE item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<()> {
        // Best-effort: no transaction, no read-back. Lost increments under
        // concurrent fetches are an accepted inaccuracy.
        sqlx::query("UPDATE items SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn media_refs(&self, id: Uuid) -> Result<Option<MediaRefs>> {
        let row = sqlx::query("SELECT media_url, thumbnail_url FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|r| MediaRefs {
            media_url: r.get("media_url"),
            thumbnail_url: r.get("thumbnail_url"),
        }))
    }

    async fn media_refs_in_collection(&self, collection_id: Uuid) -> Result<Vec<MediaRefs>> {
        let rows =
            sqlx::query("SELECT media_url, thumbnail_url FROM items WHERE collection_id = $1")
                .bind(collection_id)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| MediaRefs {
                media_url: r.get("media_url"),
                thumbnail_url: r.get("thumbnail_url"),
            })
            .collect())
    }
}
