// tests/oauth_tests.rs

mod common;

use std::collections::HashMap;

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use common::{TestApp, client, session_token, spawn_app, spawn_app_with};
use picquiz::config::OAuthConfig;
use serde_json::{Value, json};
use url::Url;

#[derive(Clone)]
struct Provider {
    profile: Value,
    fail_token: bool,
}

async fn token(
    State(provider): State<Provider>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if provider.fail_token {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if form.get("grant_type").map(String::as_str) != Some("authorization_code")
        || form.get("client_id").map(String::as_str) != Some("quiz-client")
    {
        return Err(StatusCode::BAD_REQUEST);
    }
    let code = form.get("code").cloned().unwrap_or_default();
    Ok(Json(json!({ "access_token": format!("token-{}", code), "token_type": "bearer" })))
}

async fn userinfo(
    State(provider): State<Provider>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer token-"));
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(provider.profile))
}

/// Runs a stand-in identity provider and returns its settings.
async fn spawn_provider(profile: Value, fail_token: bool) -> OAuthConfig {
    let app = Router::new()
        .route("/token", post(token))
        .route("/userinfo", get(userinfo))
        .with_state(Provider { profile, fail_token });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = |path: &str| Url::parse(&format!("{}{}", base, path)).unwrap();
    OAuthConfig {
        client_id: "quiz-client".to_string(),
        client_secret: "quiz-secret".to_string(),
        authorize_url: url("/authorize"),
        token_url: url("/token"),
        userinfo_url: url("/userinfo"),
        redirect_url: Url::parse("http://localhost:3000/auth/oauth/callback").unwrap(),
        scope: "openid email profile".to_string(),
    }
}

async fn callback(app: &TestApp, state: &str, cookie_state: &str) -> reqwest::Response {
    client()
        .get(app.url(&format!("/auth/oauth/callback?code=abc&state={}", state)))
        .header(header::COOKIE, format!("oauth_state={}", cookie_state))
        .send()
        .await
        .unwrap()
}

async fn count(app: &TestApp, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(&app.pool).await.unwrap()
}

#[tokio::test]
async fn start_redirects_to_provider() {
    let oauth = spawn_provider(json!({}), false).await;
    let app = spawn_app_with(Some(oauth)).await;

    let response = client().get(app.url("/auth/oauth/start")).send().await.unwrap();

    assert_eq!(response.status().as_u16(), 303);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let location = Url::parse(location).unwrap();
    assert_eq!(location.path(), "/authorize");

    let params: HashMap<String, String> = location.query_pairs().into_owned().collect();
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["client_id"], "quiz-client");
    assert_eq!(params["redirect_uri"], "http://localhost:3000/auth/oauth/callback");

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("oauth_state={};", params["state"])));
}

#[tokio::test]
async fn callback_creates_account_and_session() {
    let oauth = spawn_provider(
        json!({ "email": "Ada@Example.com", "preferred_username": "ada" }),
        false,
    )
    .await;
    let app = spawn_app_with(Some(oauth)).await;

    let response = callback(&app, "xyz", "xyz").await;

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let token = session_token(&response).expect("Session cookie not set");

    let (username, email): (String, String) =
        sqlx::query_as("SELECT username, email FROM users")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(username, "ada");
    assert_eq!(email, "ada@example.com");
    assert_eq!(count(&app, "SELECT COUNT(*) FROM sessions").await, 1);

    // The session works on protected routes
    let response = client()
        .get(app.url("/api/game-data"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn callback_reuses_account_with_same_email() {
    let oauth = spawn_provider(
        json!({ "email": "existing@example.com", "preferred_username": "someone" }),
        false,
    )
    .await;
    let app = spawn_app_with(Some(oauth)).await;
    app.register("existing", "existing@example.com").await;

    let response = callback(&app, "s1", "s1").await;

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM users").await, 1);
    let owner: String = sqlx::query_scalar("SELECT username FROM sessions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(owner, "existing");
}

#[tokio::test]
async fn callback_picks_free_username() {
    let oauth = spawn_provider(
        json!({ "email": "new@example.com", "preferred_username": "taken" }),
        false,
    )
    .await;
    let app = spawn_app_with(Some(oauth)).await;
    app.register("taken", "first@example.com").await;

    let response = callback(&app, "s2", "s2").await;

    assert_eq!(response.status().as_u16(), 303);
    let username: String = sqlx::query_scalar("SELECT username FROM users WHERE email = ?")
        .bind("new@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(username, "taken2");
}

#[tokio::test]
async fn callback_rejects_state_mismatch() {
    let oauth = spawn_provider(json!({ "email": "a@example.com" }), false).await;
    let app = spawn_app_with(Some(oauth)).await;

    let response = callback(&app, "forged", "expected").await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid OAuth state");
    assert_eq!(count(&app, "SELECT COUNT(*) FROM users").await, 0);
}

#[tokio::test]
async fn provider_failure_creates_no_session() {
    let oauth = spawn_provider(json!({ "email": "a@example.com" }), true).await;
    let app = spawn_app_with(Some(oauth)).await;

    let response = callback(&app, "s3", "s3").await;

    assert_eq!(response.status().as_u16(), 502);
    assert!(session_token(&response).is_none());
    assert_eq!(count(&app, "SELECT COUNT(*) FROM sessions").await, 0);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM users").await, 0);
}

#[tokio::test]
async fn profile_without_email_is_rejected() {
    let oauth = spawn_provider(json!({ "preferred_username": "ghost" }), false).await;
    let app = spawn_app_with(Some(oauth)).await;

    let response = callback(&app, "s4", "s4").await;

    assert_eq!(response.status().as_u16(), 502);
    assert_eq!(count(&app, "SELECT COUNT(*) FROM sessions").await, 0);
}

#[tokio::test]
async fn provider_error_param_is_reported() {
    let oauth = spawn_provider(json!({}), false).await;
    let app = spawn_app_with(Some(oauth)).await;

    let response = client()
        .get(app.url("/auth/oauth/callback?error=access_denied"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
}

#[tokio::test]
async fn oauth_routes_are_missing_without_configuration() {
    let app = spawn_app().await;

    for path in ["/auth/oauth/start", "/auth/oauth/callback?code=a&state=b"] {
        let response = client().get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }
}
