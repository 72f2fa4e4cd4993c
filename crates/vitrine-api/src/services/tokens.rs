//! Signed auth tokens.
//!
//! A token is `base64url(payload JSON) . base64url(HMAC-SHA256)` over the
//! payload bytes. Verification recomputes the MAC in constant time and
//! then checks expiry. The payload carries just enough identity to build
//! the requester context without a user lookup per request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use vitrine_core::{Error, Result, UserRole};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Expiry as unix seconds.
    pub exp: i64,
}

/// Sign claims into a token string.
pub fn sign(claims: &TokenClaims, secret: &[u8]) -> Result<String> {
    let payload = serde_json::to_vec(claims)?;
    let encoded = URL_SAFE_NO_PAD.encode(&payload);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| Error::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(encoded.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", encoded, signature))
}

/// Verify a token's signature and expiry, returning its claims.
pub fn verify(token: &str, secret: &[u8], now_secs: i64) -> Result<TokenClaims> {
    let (encoded, signature) = token
        .split_once('.')
        .ok_or_else(|| Error::Unauthorized("Invalid token".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| Error::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(encoded.as_bytes());
    let expected = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| Error::Unauthorized("Invalid token".to_string()))?;
    mac.verify_slice(&expected)
        .map_err(|_| Error::Unauthorized("Invalid token".to_string()))?;

    let payload = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| Error::Unauthorized("Invalid token".to_string()))?;
    let claims: TokenClaims = serde_json::from_slice(&payload)
        .map_err(|_| Error::Unauthorized("Invalid token".to_string()))?;

    if claims.exp <= now_secs {
        return Err(Error::Unauthorized("Token expired".to_string()));
    }

    Ok(claims)
}
