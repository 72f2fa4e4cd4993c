//! Media upload handler.
//!
//! Multipart form with a `file` part and an optional `thumbnail` flag.
//! Validation is size-then-type (see `vitrine_core::media`); accepted
//! files are stored under a derived key that is never regenerated.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use vitrine_core::{defaults, media};
use vitrine_db::MediaStore;

use crate::handlers::auth::RequireAuth;
use crate::{ApiError, AppState};

/// Random token for storage-key derivation: lowercase alphanumerics.
fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// `POST /api/upload` (privileged, multipart)
pub async fn handle_upload(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file: Option<(String, String, axum::body::Bytes)> = None;
    let mut want_thumbnail = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(media::OCTET_STREAM)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((filename, content_type, data));
            }
            Some("thumbnail") => {
                want_thumbnail = field.text().await.unwrap_or_default() == "true";
            }
            _ => {}
        }
    }

    let Some((filename, content_type, data)) = file else {
        return Err(ApiError::BadRequest("No file provided".to_string()));
    };

    media::validate_upload(
        data.len() as u64,
        &content_type,
        &filename,
        state.config.max_upload_bytes,
    )?;

    let key = media::derive_storage_key(
        Utc::now().timestamp_millis(),
        &random_token(defaults::STORAGE_KEY_TOKEN_LEN),
        &filename,
    );

    state.db.media_store()?.store(&key, &data).await?;

    let media_url = MediaStore::url_for(&key);
    // Thumbnail generation is transform-parameter based; SVG needs none.
    let thumbnail_url =
        if want_thumbnail && content_type.starts_with("image/") && content_type != "image/svg+xml"
        {
            format!("{}?width=400&height=400&fit=cover", media_url)
        } else {
            media_url.clone()
        };

    tracing::info!(
        subsystem = "api",
        op = "upload",
        storage_key = %key,
        size_bytes = data.len(),
        user_id = %user.id,
        "Media stored"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "media_url": media_url,
        "thumbnail_url": thumbnail_url,
        "file_type": content_type,
        "file_size": data.len(),
        "extracted_text": "",
    })))
}
