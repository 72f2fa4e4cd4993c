//! Centralized default constants for the vitrine system.
//!
//! **This module is the single source of truth** for shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

/// One mebibyte, in bytes.
pub const MIB: u64 = 1024 * 1024;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list and search endpoints.
pub const PAGE_LIMIT: i64 = 20;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

/// Clamp requested pagination parameters to non-negative values,
/// substituting the defaults when absent.
pub fn page_params(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(PAGE_LIMIT).max(0),
        offset.unwrap_or(PAGE_OFFSET).max(0),
    )
}

// =============================================================================
// UPLOADS
// =============================================================================

/// Default upload size ceiling (100 MiB), overridable via
/// `MAX_UPLOAD_SIZE`.
pub const MAX_UPLOAD_BYTES: u64 = 100 * MIB;

/// Length of the random token in derived storage keys.
pub const STORAGE_KEY_TOKEN_LEN: usize = 6;

// =============================================================================
// QUERY SHAPING
// =============================================================================

/// Maximum related items returned on single-item fetch.
pub const RELATED_ITEMS_LIMIT: i64 = 6;

/// Distinct values retained per metadata facet (the implicit `type` facet
/// is never truncated).
pub const FACET_VALUE_LIMIT: i64 = 10;

// =============================================================================
// SESSIONS
// =============================================================================

/// Session lifetime: 7 days.
pub const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
