//! Authentication: requester extraction and the auth endpoints.
//!
//! The requester context is built per request from either the session
//! cookie (resolved through the key-value session store) or a bearer
//! token, and passed explicitly into handlers — there is no process-wide
//! auth state. Passwords are hashed with argon2id; tokens are
//! HMAC-signed (see [`crate::services::tokens`]).

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vitrine_core::{defaults, CreateUserRequest, UserRepository, UserRole, Visibility};

use crate::services::tokens::{self, TokenClaims};
use crate::services::SessionRecord;
use crate::{ApiError, AppState};

// =============================================================================
// REQUESTER CONTEXT
// =============================================================================

/// The authenticated identity attached to a request.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl From<TokenClaims> for AuthUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        }
    }
}

/// Requester context: present on every request, authenticated or not.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    pub user: Option<AuthUser>,
}

impl Requester {
    pub fn is_privileged(&self) -> bool {
        self.user.is_some()
    }

    /// The row-level visibility scope for this requester.
    pub fn visibility(&self) -> Visibility {
        Visibility::for_privileged(self.is_privileged())
    }
}

/// Extractor that rejects unauthenticated requests with 401.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthUser);

/// Pull the session id out of the `Cookie` header.
fn session_id_from_cookies(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|part| {
        part.trim()
            .strip_prefix("session=")
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    })
}

async fn resolve_requester(headers: &HeaderMap, state: &AppState) -> Requester {
    let now = Utc::now().timestamp();

    // Session cookie first: resolve through the KV store, then verify
    // the stored token's signature.
    if let Some(session_id) = session_id_from_cookies(headers) {
        if let Some(record) = state.sessions.get(&session_id).await {
            if let Ok(claims) =
                tokens::verify(&record.token, &state.config.session_secret, now)
            {
                return Requester {
                    user: Some(claims.into()),
                };
            }
        }
    }

    // Bearer token fallback.
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            if let Ok(claims) = tokens::verify(token, &state.config.session_secret, now) {
                return Requester {
                    user: Some(claims.into()),
                };
            }
        }
    }

    Requester::default()
}

#[async_trait]
impl FromRequestParts<AppState> for Requester {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(resolve_requester(&parts.headers, state).await)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let requester = resolve_requester(&parts.headers, state).await;
        match requester.user {
            Some(user) => Ok(RequireAuth(user)),
            None => Err(ApiError::Unauthorized("Unauthorized".to_string())),
        }
    }
}

// =============================================================================
// PASSWORD HASHING
// =============================================================================

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// =============================================================================
// AUTH ENDPOINTS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    email: Option<String>,
    password: Option<String>,
}

fn session_cookie(session_id: &str, max_age_secs: u64) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Strict; Max-Age={}; Path=/",
        session_id, max_age_secs
    )
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    };

    let user = state
        .db
        .users
        .find_by_email(&email)
        .await?
        .filter(|u| verify_password(&password, &u.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let now = Utc::now();
    let claims = TokenClaims {
        sub: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        exp: now.timestamp() + defaults::SESSION_TTL_SECS as i64,
    };
    let token = tokens::sign(&claims, &state.config.session_secret)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let session_id = Uuid::new_v4().to_string();
    state
        .sessions
        .put(
            &session_id,
            &SessionRecord {
                user_id: user.id,
                token: token.clone(),
                expires_at_ms: now.timestamp_millis()
                    + defaults::SESSION_TTL_SECS as i64 * 1000,
            },
        )
        .await;

    tracing::info!(subsystem = "api", op = "login", user_id = %user.id, "User logged in");

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(&session_id, defaults::SESSION_TTL_SECS),
        )]),
        Json(serde_json::json!({
            "token": token,
            "user": {
                "id": user.id,
                "email": user.email,
                "name": user.name,
                "role": user.role,
            }
        })),
    ))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(session_id) = session_id_from_cookies(&headers) {
        state.sessions.delete(&session_id).await;
    }

    (
        AppendHeaders([(header::SET_COOKIE, session_cookie("", 0))]),
        Json(serde_json::json!({ "success": true })),
    )
}

#[derive(Debug, Deserialize)]
pub struct SetupBody {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
}

/// `POST /api/auth/setup` — create the first admin account. Refused once
/// any user exists.
pub async fn setup(
    State(state): State<AppState>,
    Json(body): Json<SetupBody>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.users.count().await? > 0 {
        return Err(ApiError::BadRequest("Setup already completed".to_string()));
    }

    let (Some(email), Some(password), Some(name)) = (body.email, body.password, body.name) else {
        return Err(ApiError::BadRequest("All fields required".to_string()));
    };
    if email.is_empty() || password.is_empty() || name.is_empty() {
        return Err(ApiError::BadRequest("All fields required".to_string()));
    }

    let password_hash = hash_password(&password)?;
    let user = state
        .db
        .users
        .create(CreateUserRequest {
            email,
            password_hash,
            name,
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!(subsystem = "api", op = "setup", user_id = %user.id, "Admin user created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Admin user created successfully"
        })),
    ))
}

/// `GET /api/auth/check` — always 200; reports whether the request
/// carries a valid identity.
pub async fn check(requester: Requester) -> impl IntoResponse {
    match requester.user {
        Some(user) => Json(serde_json::json!({
            "authenticated": true,
            "user": user,
        })),
        None => Json(serde_json::json!({ "authenticated": false })),
    }
}
