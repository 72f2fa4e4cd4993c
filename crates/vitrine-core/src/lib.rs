//! # vitrine-core
//!
//! Core types, traits, and domain logic for the vitrine digital
//! collections platform.
//!
//! This crate provides:
//! - Domain models (collections, items, tags, metadata fields, users)
//! - Repository traits implemented by the database layer
//! - The row-level visibility policy
//! - Typed filter parsing for item listings
//! - Upload validation, storage-key derivation, and item-kind inference
//! - Slug derivation
//! - Shared error type and structured-logging field constants

pub mod defaults;
pub mod error;
pub mod filter;
pub mod logging;
pub mod media;
pub mod models;
pub mod slug;
pub mod traits;
pub mod visibility;

pub use error::{Error, Result};
pub use filter::ItemFilter;
pub use models::*;
pub use slug::slugify;
pub use traits::*;
pub use visibility::Visibility;

use uuid::Uuid;

/// Generate a new UUIDv7 (time-ordered) identifier.
///
/// All entity ids are v7 so primary-key order follows creation order,
/// which keeps `ORDER BY created_at DESC, id DESC` stable.
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
