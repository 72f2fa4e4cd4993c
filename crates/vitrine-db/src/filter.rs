//! Item filter query builder.
//!
//! Compiles an [`ItemFilter`] plus the visibility scope into a WHERE
//! clause fragment and a typed, positional parameter list. The row query
//! and the paired count query consume the SAME build result, so
//! `pagination.total` always describes exactly the filtered set — the two
//! queries differ only in projection, ordering, and LIMIT/OFFSET.
//!
//! All values are parameterized; user input never reaches the SQL text.
//! Clauses are written against the aliases `i` (items) and `c` (the
//! joined collections row).

use uuid::Uuid;

use vitrine_core::{CollectionRef, ItemFilter, Visibility};

/// A typed query parameter, bound positionally.
#[derive(Debug, Clone)]
pub enum QueryParam {
    /// Single UUID parameter.
    Uuid(Uuid),
    /// String parameter.
    String(String),
    /// Integer parameter.
    Int(i64),
    /// Boolean parameter.
    Bool(bool),
    /// JSONB parameter.
    Json(serde_json::Value),
}

/// Result of compiling an item filter.
#[derive(Debug, Clone)]
pub struct FilterQuery {
    /// The WHERE clause fragment (without the `WHERE` keyword).
    pub where_clause: String,
    /// Query parameters in the order they appear in the SQL.
    pub params: Vec<QueryParam>,
    /// Number of active filter dimensions (excluding visibility).
    pub active_dimensions: usize,
}

impl FilterQuery {
    /// Placeholder index for the first parameter appended after the
    /// filter parameters (e.g. LIMIT).
    pub fn next_placeholder(&self, offset: usize) -> usize {
        offset + self.params.len() + 1
    }
}

/// Generates SQL WHERE fragments from an [`ItemFilter`].
///
/// # Example
///
/// ```rust,ignore
/// let builder = ItemFilterQueryBuilder::new(filter, Visibility::PublicOnly, 0);
/// let compiled = builder.build();
/// // compiled.where_clause: "(i.is_public AND c.is_public) AND i.item_type = $1"
/// // compiled.params: [String("image")]
/// ```
pub struct ItemFilterQueryBuilder {
    filter: ItemFilter,
    visibility: Visibility,
    param_offset: usize,
}

impl ItemFilterQueryBuilder {
    /// Create a new builder.
    ///
    /// `param_offset` is the number of parameters already present in the
    /// enclosing query before the filter's own.
    pub fn new(filter: ItemFilter, visibility: Visibility, param_offset: usize) -> Self {
        Self {
            filter,
            visibility,
            param_offset,
        }
    }

    /// Compile the filter into a WHERE fragment and parameter list.
    pub fn build(&self) -> FilterQuery {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<QueryParam> = Vec::new();
        let mut idx = self.param_offset;

        // An unsatisfiable filter (e.g. unknown item kind) short-circuits
        // to an empty result set instead of erroring.
        if self.filter.match_none {
            clauses.push("FALSE".to_string());
        }

        // Visibility gate first: the public/private conjunction.
        if self.visibility.public_only() {
            clauses.push("(i.is_public AND c.is_public)".to_string());
        }

        if let Some(ref collection) = self.filter.collection {
            idx += 1;
            match collection {
                CollectionRef::Id(id) => {
                    clauses.push(format!("i.collection_id = ${}", idx));
                    params.push(QueryParam::Uuid(*id));
                }
                CollectionRef::Slug(slug) => {
                    clauses.push(format!("c.slug = ${}", idx));
                    params.push(QueryParam::String(slug.clone()));
                }
            }
        }

        if let Some(kind) = self.filter.item_type {
            idx += 1;
            clauses.push(format!("i.item_type = ${}", idx));
            params.push(QueryParam::String(kind.as_str().to_string()));
        }

        if let Some(ref tag) = self.filter.tag {
            idx += 1;
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM item_tags it JOIN tags t ON it.tag_id = t.id \
                 WHERE it.item_id = i.id AND t.slug = ${})",
                idx
            ));
            params.push(QueryParam::String(tag.clone()));
        }

        // Each metadata filter is an independent existence condition; an
        // item must satisfy all of them.
        for (field, value) in &self.filter.metadata {
            let name_idx = idx + 1;
            let value_idx = idx + 2;
            idx += 2;
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM item_metadata im \
                 JOIN metadata_fields mf ON im.field_id = mf.id \
                 WHERE im.item_id = i.id AND mf.name = ${} AND im.value = ${})",
                name_idx, value_idx
            ));
            params.push(QueryParam::String(field.clone()));
            params.push(QueryParam::String(value.clone()));
        }

        let where_clause = if clauses.is_empty() {
            "TRUE".to_string()
        } else {
            clauses.join(" AND ")
        };

        FilterQuery {
            where_clause,
            params,
            active_dimensions: self.filter.active_dimensions(),
        }
    }
}

/// Bind a compiled parameter list onto a query, in order.
pub fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    params: &'q [QueryParam],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for param in params {
        query = match param {
            QueryParam::Uuid(v) => query.bind(v),
            QueryParam::String(v) => query.bind(v),
            QueryParam::Int(v) => query.bind(v),
            QueryParam::Bool(v) => query.bind(v),
            QueryParam::Json(v) => query.bind(v),
        };
    }
    query
}
