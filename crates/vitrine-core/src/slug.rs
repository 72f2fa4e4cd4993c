//! Slug derivation for collections and tags.
//!
//! Slugs are lowercase ASCII with non-alphanumeric runs collapsed to a
//! single separator. The same input always yields the same slug; collision
//! handling (rejection on create, re-check on rename) is the repository's
//! concern.

/// Derive a URL-safe slug from a title or tag name.
///
/// Lowercases ASCII alphanumerics, collapses every other run of characters
/// (including non-ASCII) into a single `-`, and strips leading/trailing
/// separators.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_sep = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Historical Photos"), "historical-photos");
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("Maps — & Charts!!"), "maps-charts");
        assert_eq!(slugify("  lots   of   spaces  "), "lots-of-spaces");
    }

    #[test]
    fn test_slugify_keeps_digits() {
        assert_eq!(slugify("1920s Street Views"), "1920s-street-views");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Café Menus"), "caf-menus");
    }

    #[test]
    fn test_slugify_idempotent() {
        let once = slugify("Historical Photos");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn test_slugify_empty_and_symbolic() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
