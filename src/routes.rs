// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    config::MAX_IMAGE_BYTES,
    handlers::{account, auth, catalog, oauth, score},
    state::AppState,
    utils::session::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public routes: leaderboard, images, auth forms and OAuth.
/// * Session-protected routes: game data, score submission, account pages.
/// * Applies global middleware (Trace).
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/oauth/start", get(oauth::start))
        .route("/oauth/callback", get(oauth::callback));

    let public_api = Router::new()
        .route("/leaderboard", get(score::leaderboard))
        .route(
            "/questions/{user_id}/{question_id}/{image_num}",
            get(catalog::question_image),
        )
        .route("/images/{user_id}/{image_num}", get(catalog::legacy_image));

    let protected_api = Router::new()
        .route("/game-data", get(catalog::game_data))
        .route("/game/submit", post(score::submit))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Two images plus form overhead
    let upload_limit = 2 * MAX_IMAGE_BYTES + 64 * 1024;

    let account_routes = Router::new()
        .route("/account", get(account::overview))
        .route("/questions", get(account::overview))
        .route("/account/questions", post(account::create_question))
        .route("/account/upload-images", post(account::create_question))
        .route("/account/questions/{qid}", post(account::update_question))
        .route("/account/questions/{qid}/edit", get(account::edit_question))
        .route("/account/questions/{qid}/delete", post(account::delete_question))
        .route_layer(DefaultBodyLimit::max(upload_limit))
        // Only matched routes; unknown paths must still reach the 404 fallback
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(score::leaderboard))
        .nest("/auth", auth_routes)
        .nest("/api", public_api.merge(protected_api))
        .merge(account_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
