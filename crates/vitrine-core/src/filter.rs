//! Typed item filters parsed from request query parameters.
//!
//! The filter is a plain data structure; SQL generation lives in the
//! database crate. Keeping the parse step pure means the recognized-key
//! rules (and the ignore-unrecognized rule) are unit-testable without a
//! database.

use std::collections::HashMap;
use std::str::FromStr;

use crate::models::{CollectionRef, ItemKind};

/// Query-parameter key for the collection filter.
pub const FILTER_KEY_COLLECTION: &str = "collection";
/// Query-parameter key for the item-kind filter.
pub const FILTER_KEY_TYPE: &str = "type";
/// Query-parameter key for the tag filter.
pub const FILTER_KEY_TAG: &str = "tag";
/// Prefix for metadata-field filters (`meta_<fieldname>`).
pub const FILTER_META_PREFIX: &str = "meta_";

/// Recognized filters for an item listing request.
///
/// Unrecognized query keys are ignored at parse time, never errors.
/// Metadata filters are kept sorted by field name so the compiled SQL is
/// deterministic for a given set of parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    /// Restrict to a collection, by id or slug.
    pub collection: Option<CollectionRef>,
    /// Restrict to a single item kind.
    pub item_type: Option<ItemKind>,
    /// Restrict to items carrying a tag, by tag slug.
    pub tag: Option<String>,
    /// Exact-match metadata filters; all must hold.
    pub metadata: Vec<(String, String)>,
    /// Set when a filter value can never match (e.g. an unknown item
    /// kind). The compiled query returns no rows rather than erroring.
    pub match_none: bool,
}

impl ItemFilter {
    /// Parse the recognized filter keys out of a query-parameter map.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut filter = ItemFilter::default();

        if let Some(v) = params.get(FILTER_KEY_COLLECTION) {
            if !v.is_empty() {
                filter.collection = Some(CollectionRef::parse(v));
            }
        }

        if let Some(v) = params.get(FILTER_KEY_TYPE) {
            if !v.is_empty() {
                match ItemKind::from_str(v) {
                    Ok(kind) => filter.item_type = Some(kind),
                    // An unknown kind matches nothing, same as binding the
                    // raw string against the closed column domain.
                    Err(_) => filter.match_none = true,
                }
            }
        }

        if let Some(v) = params.get(FILTER_KEY_TAG) {
            if !v.is_empty() {
                filter.tag = Some(v.clone());
            }
        }

        let mut metadata: Vec<(String, String)> = params
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(FILTER_META_PREFIX)
                    .filter(|name| !name.is_empty())
                    .map(|name| (name.to_string(), v.clone()))
            })
            .collect();
        metadata.sort();
        filter.metadata = metadata;

        filter
    }

    /// True when no filter dimension is active.
    pub fn is_empty(&self) -> bool {
        self.collection.is_none()
            && self.item_type.is_none()
            && self.tag.is_none()
            && self.metadata.is_empty()
            && !self.match_none
    }

    /// Number of active filter dimensions.
    pub fn active_dimensions(&self) -> usize {
        usize::from(self.collection.is_some())
            + usize::from(self.item_type.is_some())
            + usize::from(self.tag.is_some())
            + self.metadata.len()
    }
}
