//! Credential and session handling.
//!
//! Passwords are hashed with Argon2id and stored as PHC-format strings in the
//! `password_hash` column of the `users` table. Sessions are opaque 32-byte
//! random tokens, hex-encoded, persisted in the `sessions` table and carried
//! by an HttpOnly cookie.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use rand_core::RngCore;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::AppContext;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "trackd_session";

// ─── Passwords ────────────────────────────────────────────────────────────────

/// Hash a password with Argon2id (default memory-hard parameters, random
/// salt). Returns a PHC-format string, e.g. `$argon2id$v=19$m=19456,...`.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC-format hash. `Ok(false)` on
/// mismatch; `Err` only when the stored hash itself is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ─── Session tokens & cookies ─────────────────────────────────────────────────

/// 32 random bytes from the OS, hex-encoded.
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Set-Cookie value for a fresh session. HttpOnly + SameSite=Lax; `Secure`
/// is left to the TLS-terminating proxy in front of the service.
pub fn session_cookie(token: &str, ttl_hours: u32) -> String {
    if ttl_hours == 0 {
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
    } else {
        let max_age = u64::from(ttl_hours) * 3600;
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}")
    }
}

/// Set-Cookie value that expires the session cookie immediately.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Extract a cookie's value from a `Cookie:` header string.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

fn request_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|c| cookie_value(c, SESSION_COOKIE))
        .map(str::to_owned)
}

// ─── Middleware ───────────────────────────────────────────────────────────────

/// The authenticated identity, inserted into request extensions by
/// [`require_session`] and extracted by handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

/// Gate for every project-scoped route: resolves the session cookie to a
/// user or answers 401. This is a JSON API — no login redirects.
pub async fn require_session(
    State(ctx): State<Arc<AppContext>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = request_token(&req) else {
        return unauthorized();
    };

    match ctx.storage.session_user(&token).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser {
                id: user.id,
                username: user.username,
            });
            next.run(req).await
        }
        Ok(None) => unauthorized(),
        Err(e) => {
            error!(err = %e, "session lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}
