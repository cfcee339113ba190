// src/handlers/oauth.rs

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse, Redirect},
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    config::{Config, OAuthConfig},
    error::AppError,
    handlers::auth::is_unique_violation,
    utils::{
        hash::unusable_password_hash,
        session::{cookie_value, create_session, session_cookie},
    },
};

const STATE_COOKIE: &str = "oauth_state";

/// Query string the identity provider sends back to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// The profile fields we understand. Providers differ in which name field
/// they fill, so all of them are optional.
#[derive(Debug, Deserialize)]
struct ProviderProfile {
    email: Option<String>,
    preferred_username: Option<String>,
    login: Option<String>,
    name: Option<String>,
}

fn oauth_config(config: &Config) -> Result<&OAuthConfig, AppError> {
    config
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::NotFound("OAuth login is not configured".to_string()))
}

/// Sends the browser to the identity provider.
///
/// A random `state` is remembered in a short-lived cookie and checked again in
/// the callback.
pub async fn start(State(config): State<Config>) -> Result<impl IntoResponse, AppError> {
    let oauth = oauth_config(&config)?;
    let state = uuid::Uuid::new_v4().simple().to_string();

    let mut url = oauth.authorize_url.clone();
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &oauth.client_id)
        .append_pair("redirect_uri", oauth.redirect_url.as_str())
        .append_pair("scope", &oauth.scope)
        .append_pair("state", &state);

    let state_cookie = format!(
        "{}={}; Path=/auth/oauth; HttpOnly; SameSite=Lax; Max-Age=600",
        STATE_COOKIE, state
    );

    Ok((
        [(header::SET_COOKIE, state_cookie)],
        Redirect::to(url.as_str()),
    ))
}

/// Completes the authorization-code flow and logs the user in.
///
/// No session is created unless both the token exchange and the profile fetch
/// succeed.
pub async fn callback(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(http): State<reqwest::Client>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, AppError> {
    let oauth = oauth_config(&config)?;

    if let Some(error) = params.error {
        return Err(AppError::Upstream(format!("Identity provider refused login: {}", error)));
    }

    let expected_state = cookie_value(&headers, STATE_COOKIE);
    if params.state.is_none() || params.state.as_deref() != expected_state {
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let profile = fetch_profile(&http, oauth, &code).await?;

    let email = profile
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Upstream("Identity provider did not share an email address".to_string()))?;

    let (user_id, username) = find_or_create_account(&pool, &email, &profile).await?;

    let token = create_session(&pool, &config, user_id, &username).await?;
    tracing::info!("OAuth login for user {}", user_id);

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session_cookie(&token, config.session_ttl)),
            (
                header::SET_COOKIE,
                format!("{}=; Path=/auth/oauth; HttpOnly; SameSite=Lax; Max-Age=0", STATE_COOKIE),
            ),
        ]),
        Redirect::to("/"),
    ))
}

async fn fetch_profile(
    http: &reqwest::Client,
    oauth: &OAuthConfig,
    code: &str,
) -> Result<ProviderProfile, AppError> {
    let token: TokenResponse = http
        .post(oauth.token_url.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", oauth.redirect_url.as_str()),
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let profile = http
        .get(oauth.userinfo_url.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .bearer_auth(&token.access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(profile)
}

/// Turns a provider name into something usable as a username.
fn username_base(email: &str, profile: &ProviderProfile) -> String {
    let raw = profile
        .preferred_username
        .as_deref()
        .or(profile.login.as_deref())
        .or(profile.name.as_deref())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default());

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .take(40)
        .collect();

    if cleaned.chars().count() < 3 {
        "player".to_string()
    } else {
        cleaned
    }
}

/// Reuses the account registered under `email`, or creates one with a free
/// username derived from the profile.
async fn find_or_create_account(
    pool: &SqlitePool,
    email: &str,
    profile: &ProviderProfile,
) -> Result<(i64, String), AppError> {
    let existing = sqlx::query_as::<_, (i64, String)>("SELECT id, username FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some(account) = existing {
        return Ok(account);
    }

    let base = username_base(email, profile);
    let password = unusable_password_hash()?;

    for attempt in 1..=100 {
        let candidate = if attempt == 1 {
            base.clone()
        } else {
            format!("{}{}", base, attempt)
        };

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, email, password, created_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&candidate)
        .bind(email)
        .bind(&password)
        .bind(chrono::Utc::now())
        .fetch_one(pool)
        .await;

        match inserted {
            Ok(id) => {
                tracing::info!("Created account {} from OAuth profile", candidate);
                return Ok((id, candidate));
            }
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => {
                tracing::error!("Failed to create OAuth account: {:?}", e);
                return Err(AppError::from(e));
            }
        }
    }

    Err(AppError::Conflict("Could not find a free username".to_string()))
}
