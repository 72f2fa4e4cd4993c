//! Upload validation, storage-key derivation, and item-kind inference.
//!
//! Validation order is size first, then type. The type check is a union:
//! a file is accepted when EITHER its declared MIME type OR its filename
//! extension (case-insensitive) matches an allowed group. Generic binary
//! uploads (`application/octet-stream`) are admitted for the 3D formats
//! that browsers cannot type.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::ItemKind;

/// Fallback MIME type when the client declares none.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Allowed upload types: declared MIME type paired with the extensions
/// that identify the same format.
pub const ALLOWED_TYPES: &[(&str, &[&str])] = &[
    // Images
    ("image/jpeg", &["jpg", "jpeg"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/webp", &["webp"]),
    ("image/svg+xml", &["svg"]),
    // Documents
    ("application/pdf", &["pdf"]),
    // Audio
    ("audio/mpeg", &["mp3"]),
    ("audio/wav", &["wav"]),
    ("audio/ogg", &["ogg"]),
    ("audio/webm", &["webm"]),
    // Video
    ("video/mp4", &["mp4"]),
    ("video/webm", &["webm"]),
    ("video/ogg", &["ogv"]),
    // 3D models
    ("model/gltf-binary", &["glb"]),
    ("model/gltf+json", &["gltf"]),
    (OCTET_STREAM, &["glb", "obj", "stl"]),
];

static ALLOWED_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ALLOWED_TYPES
        .iter()
        .flat_map(|(_, exts)| exts.iter().copied())
        .collect()
});

/// Lowercased extension of a filename, if any.
///
/// A name without a dot has no extension; `archive.tar.gz` yields `gz`.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Validate an inbound upload.
///
/// Checks the declared size against the configured ceiling, then the
/// declared MIME type and filename extension against the allowlist
/// (union: either signal admits the file).
pub fn validate_upload(
    declared_size: u64,
    content_type: &str,
    filename: &str,
    max_bytes: u64,
) -> Result<()> {
    if declared_size > max_bytes {
        return Err(Error::PayloadTooLarge {
            limit_mib: max_bytes / defaults::MIB,
        });
    }

    let content_type = if content_type.is_empty() {
        OCTET_STREAM
    } else {
        content_type
    };
    let extension = file_extension(filename);

    let mime_allowed = ALLOWED_TYPES.iter().any(|(mime, _)| *mime == content_type);
    let ext_allowed = extension
        .as_deref()
        .map(|ext| ALLOWED_EXTENSIONS.contains(ext))
        .unwrap_or(false);

    if mime_allowed || ext_allowed {
        Ok(())
    } else {
        Err(Error::UnsupportedMediaType(format!(
            "{} ({})",
            content_type, filename
        )))
    }
}

/// Replace every character outside `[A-Za-z0-9.-]` with an underscore.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derive the storage key for an uploaded file.
///
/// `{millis}-{token}-{sanitized filename}`: collision-resistant via the
/// random token, order-revealing via the timestamp prefix. A key is
/// assigned once and never regenerated for the life of the item.
pub fn derive_storage_key(timestamp_ms: i64, token: &str, original_filename: &str) -> String {
    format!(
        "{}-{}-{}",
        timestamp_ms,
        token,
        sanitize_filename(original_filename)
    )
}

/// Best-effort MIME type for a stored key, from its extension.
///
/// Used when serving blobs back out; the store itself does not record
/// content types. Ambiguous extensions resolve to the first allowlist
/// entry claiming them.
pub fn content_type_for_key(key: &str) -> &'static str {
    match file_extension(key) {
        Some(ext) => ALLOWED_TYPES
            .iter()
            .find(|(_, exts)| exts.iter().any(|e| *e == ext))
            .map(|(mime, _)| *mime)
            .unwrap_or(OCTET_STREAM),
        None => OCTET_STREAM,
    }
}

/// Infer an item kind from the declared MIME type and filename.
///
/// Used when the caller does not supply an explicit kind. Unrecognized
/// types fall back to `document` rather than failing.
pub fn infer_item_kind(content_type: &str, filename: &str) -> ItemKind {
    if content_type.starts_with("image/") {
        return ItemKind::Image;
    }
    if content_type == "application/pdf" {
        return ItemKind::Document;
    }
    if content_type.starts_with("audio/") {
        return ItemKind::Audio;
    }
    if content_type.starts_with("video/") {
        return ItemKind::Video;
    }
    let ext = file_extension(filename).unwrap_or_default();
    if content_type.starts_with("model/")
        || ["glb", "gltf", "obj", "stl"]
            .iter()
            .any(|e| content_type.contains(e) || ext == *e)
    {
        return ItemKind::Model3d;
    }
    ItemKind::Document
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 100 * defaults::MIB;

    #[test]
    fn test_oversize_rejected_with_ceiling_in_message() {
        let err = validate_upload(150 * defaults::MIB, "image/png", "big.png", MAX).unwrap_err();
        match &err {
            Error::PayloadTooLarge { limit_mib } => assert_eq!(*limit_mib, 100),
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
        assert!(err.to_string().contains("100MB"));
    }

    #[test]
    fn test_mime_match_alone_is_sufficient() {
        // Declared image/png with a 3D extension: MIME rule admits it.
        assert!(validate_upload(1024, "image/png", "model.glb", MAX).is_ok());
    }

    #[test]
    fn test_extension_match_alone_is_sufficient() {
        // Generic binary with a glb extension: extension rule admits it.
        assert!(validate_upload(1024, OCTET_STREAM, "model.glb", MAX).is_ok());
        assert!(validate_upload(1024, "", "scan.stl", MAX).is_ok());
    }

    #[test]
    fn test_neither_signal_rejects() {
        let err = validate_upload(1024, "application/x-msdownload", "setup.exe", MAX).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(validate_upload(1024, OCTET_STREAM, "PHOTO.JPG", MAX).is_ok());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("my photo (1).jpg"),
            "my_photo__1_.jpg"
        );
        assert_eq!(sanitize_filename("clean-name.png"), "clean-name.png");
    }

    #[test]
    fn test_derive_storage_key_shape() {
        let key = derive_storage_key(1718000000123, "a1b2c3", "city hall.jpg");
        assert_eq!(key, "1718000000123-a1b2c3-city_hall.jpg");
    }

    #[test]
    fn test_content_type_for_key() {
        assert_eq!(
            content_type_for_key("1718000000123-a1b2c3-photo.jpg"),
            "image/jpeg"
        );
        assert_eq!(content_type_for_key("scan.glb"), "model/gltf-binary");
        assert_eq!(content_type_for_key("no-extension"), OCTET_STREAM);
    }

    #[test]
    fn test_infer_item_kind_table() {
        assert_eq!(infer_item_kind("image/jpeg", "a.jpg"), ItemKind::Image);
        assert_eq!(
            infer_item_kind("application/pdf", "a.pdf"),
            ItemKind::Document
        );
        assert_eq!(infer_item_kind("audio/mpeg", "a.mp3"), ItemKind::Audio);
        assert_eq!(infer_item_kind("video/mp4", "a.mp4"), ItemKind::Video);
        assert_eq!(
            infer_item_kind("model/gltf-binary", "a.glb"),
            ItemKind::Model3d
        );
        assert_eq!(infer_item_kind(OCTET_STREAM, "a.obj"), ItemKind::Model3d);
        // Default fallback is document, not an error.
        assert_eq!(infer_item_kind("text/plain", "a.txt"), ItemKind::Document);
    }
}
