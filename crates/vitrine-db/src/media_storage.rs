//! Media blob storage with a pluggable backend.
//!
//! Blobs are keyed by the derived storage key (timestamp-token-filename);
//! the database only stores `/media/<key>` URLs. The backend trait keeps
//! the gateway testable and leaves room for an object-store
//! implementation; the filesystem backend writes atomically
//! (temp file + rename) under a single base directory.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use vitrine_core::{Error, Result};

/// URL prefix under which stored media is served.
pub const MEDIA_URL_PREFIX: &str = "/media/";

/// Storage backend trait for different blob store implementations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data under the given key.
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read data stored under the given key.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete data under the given key; absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Filesystem storage backend.
///
/// Stores blobs as flat files under the base directory. Keys are already
/// sanitized at derivation time; anything that still looks like a path is
/// rejected outright.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, key: &str) -> Result<PathBuf> {
        // A key is a single filename: no separators, no dot-directories.
        if key.is_empty() || key.contains('/') || key.contains('\\') || key == "." || key == ".." {
            return Err(Error::Storage(format!("Invalid storage key: {}", key)));
        }
        Ok(self.base_path.join(key))
    }

    /// Validate that the backend can write, read, and delete.
    ///
    /// Full round trip at startup to catch permission errors and missing
    /// directories before the first upload does.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_file = self.base_path.join(".health-check");

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.base_path, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(key)?;
        debug!(
            subsystem = "storage",
            component = "media_storage",
            storage_key = %key,
            size_bytes = data.len(),
            "media write"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Atomic write: temp file + rename.
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "media_storage: create failed");
            e
        })?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await?;

        // 0644: readable, never executable.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full_path = self.full_path(key)?;
        if !fs::try_exists(&full_path).await? {
            return Ok(None);
        }
        Ok(Some(fs::read(full_path).await?))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full_path = self.full_path(key)?;
        Ok(fs::try_exists(full_path).await?)
    }
}

/// Media store: the blob side of the persistence gateway.
pub struct MediaStore {
    backend: Box<dyn StorageBackend>,
}

impl MediaStore {
    /// Create a media store over the given backend.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Store a blob under its derived key.
    pub async fn store(&self, key: &str, data: &[u8]) -> Result<()> {
        self.backend.write(key, data).await
    }

    /// Fetch a blob, or `None` when the key is unknown.
    pub async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.read(key).await
    }

    /// Delete a blob. Absent keys succeed silently.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await
    }

    /// Public URL for a stored key.
    pub fn url_for(key: &str) -> String {
        format!("{}{}", MEDIA_URL_PREFIX, key)
    }

    /// Extract the storage key from a `/media/<key>` URL.
    ///
    /// Query-string suffixes (thumbnail transformation parameters) are
    /// stripped; foreign URLs yield `None`.
    pub fn key_from_url(url: &str) -> Option<&str> {
        let key = url.strip_prefix(MEDIA_URL_PREFIX)?;
        let key = key.split('?').next().unwrap_or(key);
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }
}
