// src/utils/session.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{config::Config, error::AppError};

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "session";

/// Where unauthenticated requests are sent.
pub const LOGIN_PATH: &str = "/auth/login";

/// Claims of the signed session token held by the browser.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionClaims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Id of the server-side session row.
    pub sid: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// The authenticated identity attached to a request by `auth_middleware`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: i64,
    username: String,
}

fn sign_session_token(
    user_id: i64,
    session_id: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = SessionClaims {
        sub: user_id.to_string(),
        sid: session_id.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies signature and expiry of a session token.
pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionClaims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid session".to_string()))?;

    Ok(token_data.claims)
}

/// Stores a new session for the account and returns the signed token for it.
pub async fn create_session(
    pool: &SqlitePool,
    config: &Config,
    user_id: i64,
    username: &str,
) -> Result<String, AppError> {
    let session_id = uuid::Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO sessions (id, user_id, username, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session_id)
        .bind(user_id)
        .bind(username)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store session: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!("Session created for user {}", user_id);

    sign_session_token(user_id, &session_id, &config.session_secret, config.session_ttl)
}

/// Deletes the session a token points to. Invalid tokens are ignored.
pub async fn destroy_session(pool: &SqlitePool, config: &Config, token: &str) -> Result<(), AppError> {
    if let Ok(claims) = verify_session_token(token, &config.session_secret) {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(&claims.sid)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Resolves a session token to the account it belongs to.
///
/// `None` when the token does not verify or its session was destroyed.
pub async fn current_session(
    pool: &SqlitePool,
    secret: &str,
    token: &str,
) -> Result<Option<SessionUser>, AppError> {
    let Ok(claims) = verify_session_token(token, secret) else {
        return Ok(None);
    };

    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT user_id, username FROM sessions WHERE id = ?",
    )
    .bind(&claims.sid)
    .fetch_optional(pool)
    .await?;

    Ok(row
        .filter(|r| r.user_id.to_string() == claims.sub)
        .map(|r| SessionUser {
            id: r.user_id,
            username: r.username,
        }))
}

/// Reads a cookie value from the request headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Finds the session token: the session cookie first, then a Bearer header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    cookie_value(headers, SESSION_COOKIE).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
    })
}

pub fn session_cookie(token: &str, max_age: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    )
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Axum Middleware: Authentication.
///
/// Resolves the session token of the request. If valid, injects `SessionUser`
/// into the request extensions for handlers to use. Otherwise the client is
/// redirected to the login page.
pub async fn auth_middleware(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(req.headers()) else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    match current_session(&pool, &config.session_secret, token).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => Redirect::to(LOGIN_PATH).into_response(),
        Err(e) => e.into_response(),
    }
}
