// src/config.rs

use std::env;
use dotenvy::dotenv;
use url::Url;

/// Number of questions drawn for one quiz session.
pub const QUIZ_SESSION_SIZE: usize = 10;

/// Points awarded for each correctly answered question.
pub const POINTS_PER_CORRECT_ANSWER: i64 = 10;

/// Per-file upload limit for question images (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// How long browsers may cache a question image (7 days).
pub const IMAGE_CACHE_MAX_AGE_SECS: u64 = 604_800;

/// Number of accounts shown on the leaderboard.
pub const LEADERBOARD_SIZE: i64 = 5;

/// Settings of the third-party identity provider used for OAuth login.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    pub redirect_url: Url,
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    /// Lifetime of a login session in seconds.
    pub session_ttl: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub seed_test_data: bool,
    pub oauth: Option<OAuthConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://quiz.db".to_string());

        let session_secret = env::var("SESSION_SECRET")
            .expect("SESSION_SECRET must be set");

        let session_ttl = env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7 * 24 * 60 * 60);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let seed_test_data = env::var("SEED_TEST_DATA")
            .is_ok_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        Self {
            database_url,
            session_secret,
            session_ttl,
            rust_log,
            bind_addr,
            seed_test_data,
            oauth: OAuthConfig::from_env(),
        }
    }
}

impl OAuthConfig {
    /// OAuth login is enabled only when every provider setting is present and
    /// every URL parses. A half-configured provider is logged and disabled.
    fn from_env() -> Option<Self> {
        let client_id = env::var("OAUTH_CLIENT_ID").ok()?;
        let client_secret = env::var("OAUTH_CLIENT_SECRET").ok()?;

        let url_var = |name: &str| -> Option<Url> {
            let raw = env::var(name).ok()?;
            match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("{} is not a valid URL ({}), OAuth login disabled", name, e);
                    None
                }
            }
        };

        Some(Self {
            client_id,
            client_secret,
            authorize_url: url_var("OAUTH_AUTHORIZE_URL")?,
            token_url: url_var("OAUTH_TOKEN_URL")?,
            userinfo_url: url_var("OAUTH_USERINFO_URL")?,
            redirect_url: url_var("OAUTH_REDIRECT_URL")?,
            scope: env::var("OAUTH_SCOPE").unwrap_or_else(|_| "openid email profile".to_string()),
        })
    }
}
