//! # vitrine-db
//!
//! PostgreSQL persistence gateway for vitrine.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for collections, items, tags, metadata
//!   fields, and users
//! - The item filter query builder shared by row and count queries
//! - Facet aggregation
//! - Full-text search with PostgreSQL tsvector
//! - Blob storage for media uploads (pluggable backend, filesystem
//!   implementation)
//!
//! ## Example
//!
//! ```rust,ignore
//! use vitrine_db::Database;
//! use vitrine_core::{CollectionRepository, CreateCollectionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/vitrine").await?;
//!
//!     let collection = db.collections.create(CreateCollectionRequest {
//!         title: "Historical Photos".to_string(),
//!         description: None,
//!         metadata: None,
//!         is_public: true,
//!         created_by: None,
//!     }).await?;
//!
//!     println!("Created collection: {}", collection.slug);
//!     Ok(())
//! }
//! ```

pub mod collections;
pub mod facets;
pub mod filter;
pub mod items;
pub mod media_storage;
pub mod metadata;
pub mod pool;
pub mod search;
pub mod tags;
pub mod users;

#[cfg(test)]
mod tests;

// Test fixtures are always compiled so integration tests (in tests/) can
// reuse the schema-scoped database harness.
pub mod test_fixtures;

// Re-export core types
pub use vitrine_core::*;

// Re-export repository implementations
pub use collections::PgCollectionRepository;
pub use facets::PgFacetAggregator;
pub use filter::{bind_params, FilterQuery, ItemFilterQueryBuilder, QueryParam};
pub use items::PgItemRepository;
pub use media_storage::{FilesystemBackend, MediaStore, StorageBackend, MEDIA_URL_PREFIX};
pub use metadata::PgMetadataFieldRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use search::PgSearchIndex;
pub use tags::PgTagRepository;
pub use users::PgUserRepository;

/// The assembled persistence gateway: one repository per entity plus the
/// facet aggregator, search index, and (optionally) the media blob store.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Collection repository.
    pub collections: PgCollectionRepository,
    /// Item repository.
    pub items: PgItemRepository,
    /// Tag repository.
    pub tags: PgTagRepository,
    /// Metadata field repository.
    pub metadata: PgMetadataFieldRepository,
    /// Facet aggregator.
    pub facets: PgFacetAggregator,
    /// Full-text search index.
    pub search: PgSearchIndex,
    /// User repository.
    pub users: PgUserRepository,
    /// Media blob store. Use `with_media_store` to configure.
    pub media: Option<MediaStore>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            collections: PgCollectionRepository::new(pool.clone()),
            items: PgItemRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            metadata: PgMetadataFieldRepository::new(pool.clone()),
            facets: PgFacetAggregator::new(pool.clone()),
            search: PgSearchIndex::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            media: None,
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::new(pool))
    }

    /// Attach a media blob store.
    pub fn with_media_store(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.media = Some(MediaStore::new(backend));
        self
    }

    /// The media store, or an error when none is configured.
    pub fn media_store(&self) -> Result<&MediaStore> {
        self.media
            .as_ref()
            .ok_or_else(|| Error::Config("Media storage is not configured".to_string()))
    }

    /// Run pending database migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
