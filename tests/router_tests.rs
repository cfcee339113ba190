// tests/router_tests.rs

mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{test_config, test_pool};
use picquiz::{routes::create_router, state::AppState};
use tower::ServiceExt;

async fn router() -> axum::Router {
    create_router(AppState::new(test_pool().await, test_config(None)))
}

#[tokio::test]
async fn index_serves_empty_leaderboard() {
    let app = router().await;

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"[]");
}

#[tokio::test]
async fn account_page_redirects_to_login() {
    let app = router().await;

    let response = app
        .oneshot(Request::get("/account").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth/login");
}

#[tokio::test]
async fn non_numeric_image_path_is_rejected() {
    let app = router().await;

    let response = app
        .oneshot(
            Request::get("/api/questions/abc/1/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_paths_are_not_found_without_session() {
    for path in ["/random_path_that_does_not_exist", "/api/nope", "/account/nope/deeper"] {
        let response = router()
            .await
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
    }
}
