// src/handlers/auth.rs

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect},
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        session::{
            LOGIN_PATH, create_session, destroy_session, expired_session_cookie, session_cookie,
            session_token,
        },
    },
};

/// Returns true when the error is SQLite's unique constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Registers a new account.
///
/// Rejects duplicate emails and usernames, hashes the password with Argon2,
/// then sends the browser to the login page.
pub async fn register(
    State(pool): State<SqlitePool>,
    Form(payload): Form<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let username = payload.username.trim().to_string();

    let email_taken = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;
    if email_taken.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let username_taken = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(&username)
        .fetch_optional(&pool)
        .await?;
    if username_taken.is_some() {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    sqlx::query("INSERT INTO users (username, email, password, created_at) VALUES (?, ?, ?, ?)")
        .bind(&username)
        .bind(&email)
        .bind(&hashed_password)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .map_err(|e| {
            // Lost a race against a concurrent registration
            if is_unique_violation(&e) {
                AppError::Conflict("Email or username is already registered".to_string())
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })?;

    tracing::info!("Registered user {}", username);

    Ok(Redirect::to(LOGIN_PATH))
}

/// Authenticates with email and password.
///
/// On success a server-side session is stored and its signed token is set as
/// the session cookie.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Form(payload): Form<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.validate().is_err() {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password, high_score, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })?;

    let user = user.ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = create_session(&pool, &config, user.id, &user.username).await?;

    Ok((
        [(header::SET_COOKIE, session_cookie(&token, config.session_ttl))],
        Redirect::to("/"),
    ))
}

/// Destroys the current session, if any, and clears the cookie.
pub async fn logout(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&headers) {
        destroy_session(&pool, &config, token).await?;
    }

    Ok((
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to(LOGIN_PATH),
    ))
}
