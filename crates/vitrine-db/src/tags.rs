//! Tag repository implementation.
//!
//! Tags are flat: a display name plus a unique slug. `ensure` is an
//! insert-or-get keyed on the derived slug, so two names normalizing to
//! the same slug resolve to one tag.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use vitrine_core::{new_v7, slugify, Error, Result, Tag, TagRepository};

/// PostgreSQL implementation of TagRepository.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn ensure_tx(tx: &mut Transaction<'_, Postgres>, name: &str) -> Result<Tag> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(Error::InvalidInput(
                "Tag name must contain at least one alphanumeric character".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO tags (id, name, slug) VALUES ($1, $2, $3) ON CONFLICT (slug) DO NOTHING",
        )
        .bind(new_v7())
        .bind(name)
        .bind(&slug)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let row = sqlx::query("SELECT id, name, slug FROM tags WHERE slug = $1")
            .bind(&slug)
            .fetch_one(&mut **tx)
            .await
            .map_err(Error::Database)?;

        Ok(Tag {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
        })
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn ensure(&self, name: &str) -> Result<Tag> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let tag = Self::ensure_tx(&mut tx, name).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(tag)
    }

    async fn for_item(&self, item_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, t.slug
             FROM tags t
             JOIN item_tags it ON t.id = it.tag_id
             WHERE it.item_id = $1
             ORDER BY t.slug",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
                slug: row.get("slug"),
            })
            .collect())
    }

    async fn replace_for_item(&self, item_id: Uuid, names: &[String]) -> Result<Vec<Tag>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM item_tags WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            if slugify(name).is_empty() {
                continue;
            }
            let tag = Self::ensure_tx(&mut tx, name).await?;
            sqlx::query(
                "INSERT INTO item_tags (item_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(item_id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            tags.push(tag);
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(tags)
    }
}
