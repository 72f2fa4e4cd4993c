//! Database-backed test modules.
//!
//! These tests require a running PostgreSQL instance; see
//! [`crate::test_fixtures`] for configuration.

mod collection_slug_tests;
mod listing_filter_tests;
mod metadata_field_tests;
mod tag_tests;
mod user_tests;
mod visibility_tests;
