// tests/common/mod.rs

#![allow(dead_code)]

use picquiz::{
    config::{Config, OAuthConfig},
    routes,
    state::AppState,
};
use reqwest::{header, multipart, redirect};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::time::Duration;

/// A 1x1 PNG.
pub const PNG: [u8; 69] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
    0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
    0xCF, 0xC0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0xB4, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
}

pub fn test_config(oauth: Option<OAuthConfig>) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        session_secret: "test_secret_for_integration_tests".to_string(),
        session_ttl: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        seed_test_data: false,
        oauth,
    }
}

/// In-memory database with migrations applied. A single connection that is
/// never recycled, so every query sees the same database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

/// Spawns the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(None).await
}

pub async fn spawn_app_with(oauth: Option<OAuthConfig>) -> TestApp {
    let pool = test_pool().await;
    let state = AppState::new(pool.clone(), test_config(oauth));
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
    }
}

/// Client that shows redirects to the test instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Pulls the session token out of a login response.
pub fn session_token(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("session="))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .filter(|v| !v.is_empty())
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, username: &str, email: &str) -> reqwest::Response {
        client()
            .post(self.url("/auth/register"))
            .form(&[("username", username), ("email", email), ("password", PASSWORD)])
            .send()
            .await
            .expect("Register failed")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        client()
            .post(self.url("/auth/login"))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("Login failed")
    }

    /// Registers a fresh account and logs in. Returns (user id, token).
    pub async fn signed_up_user(&self, prefix: &str) -> (i64, String) {
        let username = unique_name(prefix);
        let email = format!("{}@example.com", username);

        let resp = self.register(&username, &email).await;
        assert_eq!(resp.status().as_u16(), 303);

        let resp = self.login(&email, PASSWORD).await;
        assert_eq!(resp.status().as_u16(), 303);
        let token = session_token(&resp).expect("Session cookie not set");

        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
            .bind(&username)
            .fetch_one(&self.pool)
            .await
            .unwrap();

        (id, token)
    }

    /// Uploads a question through the authoring endpoint.
    pub async fn create_question(&self, token: &str, answer: &str) -> reqwest::Response {
        let form = multipart::Form::new()
            .part(
                "image1",
                multipart::Part::bytes(PNG.to_vec())
                    .file_name("one.png")
                    .mime_str("image/png")
                    .unwrap(),
            )
            .part(
                "image2",
                multipart::Part::bytes(b"GIF89a-second".to_vec())
                    .file_name("two.gif")
                    .mime_str("image/gif")
                    .unwrap(),
            )
            .text("answer", answer.to_string());

        client()
            .post(self.url("/account/questions"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Create question failed")
    }

    pub async fn question_ids(&self, user_id: i64) -> Vec<i64> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }
}
