//! Redis-backed session store.
//!
//! Sessions live in a key-value store keyed by an opaque session id (the
//! cookie value); each record holds the signed token and its expiry.
//! Redis TTLs do the actual expiration; the stored expiry is a second
//! line of defense for skewed clocks.
//!
//! When Redis is unreachable the store degrades to a no-op: logins still
//! succeed (the client keeps the bearer token), cookie sessions just
//! don't resolve.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_ENABLED`: set to "false" to disable sessions (default: true)
//! - `REDIS_URL`: connection URL (default: redis://localhost:6379)

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vitrine_core::defaults;

/// One stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: Uuid,
    /// The signed token minted at login.
    pub token: String,
    /// Expiry as unix milliseconds.
    pub expires_at_ms: i64,
}

impl SessionRecord {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms < now_ms
    }
}

/// Session store backed by Redis.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    /// Redis connection manager (None if disabled or unreachable).
    connection: RwLock<Option<ConnectionManager>>,
    /// Session TTL in seconds.
    ttl_seconds: u64,
    /// Key prefix.
    prefix: String,
}

impl SessionStore {
    /// Create a session store from environment configuration.
    pub async fn from_env() -> Self {
        let enabled = std::env::var("REDIS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let connection = if enabled {
            match redis::Client::open(redis_url.as_str()) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        info!(
                            subsystem = "sessions",
                            ttl_seconds = defaults::SESSION_TTL_SECS,
                            "Redis session store connected"
                        );
                        Some(conn)
                    }
                    Err(e) => {
                        warn!("Failed to connect to Redis, sessions disabled: {}", e);
                        None
                    }
                },
                Err(e) => {
                    warn!("Invalid Redis URL, sessions disabled: {}", e);
                    None
                }
            }
        } else {
            info!("Session store disabled via REDIS_ENABLED=false");
            None
        };

        Self {
            inner: Arc::new(SessionStoreInner {
                connection: RwLock::new(connection),
                ttl_seconds: defaults::SESSION_TTL_SECS,
                prefix: "vt:session:".to_string(),
            }),
        }
    }

    /// Create a disabled store (for testing or when Redis is unavailable).
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                connection: RwLock::new(None),
                ttl_seconds: defaults::SESSION_TTL_SECS,
                prefix: "vt:session:".to_string(),
            }),
        }
    }

    /// Whether the backing store is reachable.
    pub async fn is_connected(&self) -> bool {
        self.inner.connection.read().await.is_some()
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.inner.prefix, session_id)
    }

    /// Store a session under its id with the configured TTL.
    pub async fn put(&self, session_id: &str, record: &SessionRecord) {
        let Some(mut conn) = self.inner.connection.read().await.clone() else {
            return;
        };

        let payload = match serde_json::to_string(record) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize session: {}", e);
                return;
            }
        };

        if let Err(e) = conn
            .set_ex::<_, _, ()>(self.key(session_id), payload, self.inner.ttl_seconds)
            .await
        {
            warn!("Failed to store session: {}", e);
        }
    }

    /// Fetch a session, dropping records past their stored expiry.
    pub async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let mut conn = self.inner.connection.read().await.clone()?;

        let payload: Option<String> = match conn.get(self.key(session_id)).await {
            Ok(p) => p,
            Err(e) => {
                debug!("Session lookup failed: {}", e);
                return None;
            }
        };

        let record: SessionRecord = serde_json::from_str(&payload?).ok()?;
        if record.is_expired(chrono::Utc::now().timestamp_millis()) {
            self.delete(session_id).await;
            return None;
        }
        Some(record)
    }

    /// Delete a session.
    pub async fn delete(&self, session_id: &str) {
        let Some(mut conn) = self.inner.connection.read().await.clone() else {
            return;
        };
        if let Err(e) = conn.del::<_, ()>(self.key(session_id)).await {
            debug!("Session delete failed: {}", e);
        }
    }
}
