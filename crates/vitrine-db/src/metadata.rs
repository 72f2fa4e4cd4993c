//! Metadata field repository implementation.
//!
//! Fields are configured rows (name, type, facet eligibility, display
//! order); values are one row per (item, field) with last-write-wins
//! upsert semantics.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use vitrine_core::{
    Error, FieldType, ItemFieldValue, MetadataField, MetadataFieldRepository, Result,
};

/// PostgreSQL implementation of MetadataFieldRepository.
pub struct PgMetadataFieldRepository {
    pool: Pool<Postgres>,
}

impl PgMetadataFieldRepository {
    /// Create a new PgMetadataFieldRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn field_from_row(row: &PgRow) -> MetadataField {
    let field_type: String = row.get("field_type");
    MetadataField {
        id: row.get("id"),
        name: row.get("name"),
        field_type: field_type.parse().unwrap_or(FieldType::Text),
        is_facet: row.get("is_facet"),
        display_order: row.get("display_order"),
    }
}

#[async_trait]
impl MetadataFieldRepository for PgMetadataFieldRepository {
    async fn list(&self) -> Result<Vec<MetadataField>> {
        let rows = sqlx::query(
            "SELECT id, name, field_type, is_facet, display_order
             FROM metadata_fields
             ORDER BY display_order",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(field_from_row).collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<MetadataField>> {
        let row = sqlx::query(
            "SELECT id, name, field_type, is_facet, display_order
             FROM metadata_fields
             WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| field_from_row(&r)))
    }

    async fn upsert_value(&self, item_id: Uuid, field_id: Uuid, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO item_metadata (item_id, field_id, value) VALUES ($1, $2, $3)
             ON CONFLICT (item_id, field_id) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(item_id)
        .bind(field_id)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn values_for_item(&self, item_id: Uuid) -> Result<Vec<ItemFieldValue>> {
        let rows = sqlx::query(
            "SELECT mf.name, mf.field_type, im.value
             FROM item_metadata im
             JOIN metadata_fields mf ON im.field_id = mf.id
             WHERE im.item_id = $1
             ORDER BY mf.display_order",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let field_type: String = row.get("field_type");
                ItemFieldValue {
                    name: row.get("name"),
                    field_type: field_type.parse().unwrap_or(FieldType::Text),
                    value: row.get("value"),
                }
            })
            .collect())
    }
}
