// rest/routes/auth.rs — registration, login, logout, identity.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::auth::{self, CurrentUser};
use crate::error::ApiError;
use crate::AppContext;

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let username = body.username.trim().to_string();
    if username.len() < 3 {
        return Err(ApiError::Validation(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if body.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    if ctx.storage.user_by_username(&username).await?.is_some() {
        return Err(ApiError::Conflict("Username is already taken".to_string()));
    }

    let password_hash = auth::hash_password(&body.password)?;
    let user = ctx.storage.create_user(&username, &password_hash).await?;
    info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Account created", "userId": user.id })),
    ))
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<Credentials>,
) -> Result<Response, ApiError> {
    // Unknown user and wrong password answer identically.
    let Some(user) = ctx.storage.user_by_username(body.username.trim()).await? else {
        return Err(ApiError::Unauthorized);
    };
    if !auth::verify_password(&body.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::new_session_token();
    let ttl_hours = ctx.config.session_ttl_hours;
    let expires_at = if ttl_hours == 0 {
        // Far enough out to never expire in practice.
        (Utc::now() + chrono::Duration::days(365 * 100)).to_rfc3339()
    } else {
        (Utc::now() + chrono::Duration::hours(i64::from(ttl_hours))).to_rfc3339()
    };
    ctx.storage
        .create_session(&user.id, &token, &expires_at)
        .await?;
    info!(user_id = %user.id, "user logged in");

    Ok((
        [(header::SET_COOKIE, auth::session_cookie(&token, ttl_hours))],
        Json(json!({ "userId": user.id, "username": user.username })),
    )
        .into_response())
}

/// Deletes the server-side session (when the cookie is present) and expires
/// the cookie. Always succeeds — logging out twice is fine.
pub async fn logout(State(ctx): State<Arc<AppContext>>, req: Request) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|c| auth::cookie_value(c, auth::SESSION_COOKIE))
        .map(str::to_owned);

    if let Some(token) = token {
        ctx.storage.delete_session(&token).await?;
    }

    Ok((
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response())
}

pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<Value> {
    Json(json!({ "userId": user.id, "username": user.username }))
}
