// src/handlers/score.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    config::LEADERBOARD_SIZE,
    error::AppError,
    models::{
        score::{SubmitScoreRequest, SubmitScoreResponse},
        user::LeaderboardEntry,
    },
    utils::session::SessionUser,
};

/// Records a finished quiz session for `user_id` and returns the new high score.
///
/// * Appends an immutable row to `scores`.
/// * Raises `high_score` if the submitted score beats it.
///
/// Both writes happen in one transaction.
pub async fn record_score(
    pool: &SqlitePool,
    user_id: i64,
    req: &SubmitScoreRequest,
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let high_score = sqlx::query_scalar::<_, i64>(
        "UPDATE users SET high_score = MAX(high_score, ?) WHERE id = ? RETURNING high_score",
    )
    .bind(req.score)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO scores (user_id, points, correct, total, time_spent_seconds, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(req.score)
    .bind(req.correct)
    .bind(req.total)
    .bind(req.time_spent_seconds)
    .bind(chrono::Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert score record: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    Ok(high_score)
}

/// `POST /api/game/submit`
pub async fn submit(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<SessionUser>,
    Json(req): Json<SubmitScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    let high_score = record_score(&pool, user.id, &req).await?;

    tracing::info!(
        "User {} scored {} ({}/{} in {}s), high score {}",
        user.id,
        req.score,
        req.correct,
        req.total,
        req.time_spent_seconds,
        high_score
    );

    Ok(Json(SubmitScoreResponse {
        ok: true,
        high_score,
    }))
}

/// Retrieves the top accounts by high score.
pub async fn leaderboard(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT username, high_score
        FROM users
        WHERE high_score > 0
        ORDER BY high_score DESC, id ASC
        LIMIT ?
        "#,
    )
    .bind(LEADERBOARD_SIZE)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(entries))
}
