//! Facet aggregation.
//!
//! Facets describe the whole corpus under the current visibility gate —
//! deliberately NOT narrowed by the other active filters, so a client can
//! always show global counts next to a narrowed result list. The gate is
//! the only predicate applied.

use sqlx::{Pool, Postgres, Row};

use vitrine_core::{
    defaults, Error, FacetGroup, FacetValue, FieldType, ItemKind, Result, Visibility,
};

/// Computes facet value counts for facet-eligible metadata fields plus
/// the implicit `type` facet.
pub struct PgFacetAggregator {
    pool: Pool<Postgres>,
}

impl PgFacetAggregator {
    /// Create a new PgFacetAggregator with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Aggregate facets under the given visibility scope.
    ///
    /// Returns one group per facet-eligible field (display order, top 10
    /// values by distinct-item count, empty fields omitted) followed by
    /// the `type` facet (never truncated; kinds with zero items absent).
    pub async fn aggregate(&self, visibility: Visibility) -> Result<Vec<FacetGroup>> {
        let gate = if visibility.public_only() {
            "AND i.is_public AND c.is_public"
        } else {
            ""
        };

        let fields = sqlx::query(
            "SELECT id, name, field_type FROM metadata_fields
             WHERE is_facet ORDER BY display_order",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut groups = Vec::with_capacity(fields.len() + 1);

        for field in &fields {
            let field_id: uuid::Uuid = field.get("id");
            let sql = format!(
                "SELECT im.value, COUNT(DISTINCT i.id) AS count
                 FROM item_metadata im
                 JOIN items i ON im.item_id = i.id
                 JOIN collections c ON i.collection_id = c.id
                 WHERE im.field_id = $1 {}
                 GROUP BY im.value
                 ORDER BY count DESC, im.value
                 LIMIT $2",
                gate
            );
            let values: Vec<FacetValue> = sqlx::query(&sql)
                .bind(field_id)
                .bind(defaults::FACET_VALUE_LIMIT)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?
                .into_iter()
                .map(|row| FacetValue {
                    value: row.get("value"),
                    count: row.get("count"),
                })
                .collect();

            // A field with no qualifying values is omitted entirely.
            if values.is_empty() {
                continue;
            }

            let field_type: String = field.get("field_type");
            groups.push(FacetGroup {
                name: field.get("name"),
                field_type: field_type.parse().unwrap_or(FieldType::Text),
                values,
            });
        }

        // Implicit item-kind facet, always present, never truncated.
        let sql = format!(
            "SELECT i.item_type AS value, COUNT(*) AS count
             FROM items i
             JOIN collections c ON i.collection_id = c.id
             WHERE TRUE {}
             GROUP BY i.item_type
             ORDER BY count DESC, i.item_type",
            gate
        );
        let values: Vec<FacetValue> = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?
            .into_iter()
            .map(|row| FacetValue {
                value: row.get("value"),
                count: row.get("count"),
            })
            .collect();

        groups.push(FacetGroup {
            name: "type".to_string(),
            field_type: FieldType::Text,
            values,
        });

        Ok(groups)
    }

    /// Sum of `type` facet counts for one kind, for verification in tests.
    pub fn type_count(groups: &[FacetGroup], kind: ItemKind) -> Option<i64> {
        groups
            .iter()
            .find(|g| g.name == "type")
            .and_then(|g| g.values.iter().find(|v| v.value == kind.as_str()))
            .map(|v| v.count)
    }
}
