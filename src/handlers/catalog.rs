// src/handlers/catalog.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;

use crate::{
    config::IMAGE_CACHE_MAX_AGE_SECS,
    error::AppError,
    models::question::{CatalogEntry, GameData, ImageSlot, StoredImage},
    utils::session::SessionUser,
};

#[derive(sqlx::FromRow)]
struct ImageRow {
    data: Option<Vec<u8>>,
    content_type: Option<String>,
}

impl ImageRow {
    fn into_image(self) -> Option<StoredImage> {
        match (self.data, self.content_type) {
            (Some(data), content_type) if !data.is_empty() => Some(StoredImage {
                data,
                content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
            }),
            _ => None,
        }
    }
}

/// Every playable question authored by someone other than `requester_id`.
///
/// Questions without an answer are skipped; they cannot be scored.
pub async fn list_questions(
    pool: &SqlitePool,
    requester_id: i64,
) -> Result<Vec<CatalogEntry>, AppError> {
    let questions = sqlx::query_as::<_, CatalogEntry>(
        r#"
        SELECT
            q.user_id,
            u.username,
            q.id AS question_id,
            q.answer
        FROM questions q
        JOIN users u ON q.user_id = u.id
        WHERE q.user_id != ? AND q.answer != ''
        ORDER BY q.user_id, q.id
        "#,
    )
    .bind(requester_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::from(e)
    })?;

    Ok(questions)
}

/// Looks up one image of one question.
///
/// The three failure cases carry distinct messages: unknown owner, unknown
/// question (or one owned by someone else), and a missing image.
pub async fn find_question_image(
    pool: &SqlitePool,
    user_id: i64,
    question_id: i64,
    slot: Option<ImageSlot>,
) -> Result<StoredImage, AppError> {
    let owner = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    if owner.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE id = ? AND user_id = ?")
        .bind(question_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    let slot = slot.ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;
    let sql = match slot {
        ImageSlot::First => "SELECT image1 AS data, image1_type AS content_type FROM questions WHERE id = ?",
        ImageSlot::Second => "SELECT image2 AS data, image2_type AS content_type FROM questions WHERE id = ?",
    };

    sqlx::query_as::<_, ImageRow>(sql)
        .bind(question_id)
        .fetch_optional(pool)
        .await?
        .and_then(ImageRow::into_image)
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))
}

/// Builds the cacheable image response.
fn image_response(image: StoredImage) -> Response {
    let etag = image.etag();
    (
        [
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", IMAGE_CACHE_MAX_AGE_SECS),
            ),
            (header::CONTENT_TYPE, image.content_type),
            (header::CONTENT_LENGTH, image.data.len().to_string()),
            (header::ETAG, etag),
        ],
        image.data,
    )
        .into_response()
}

/// `GET /api/game-data`
///
/// Flattened list of all questions the current user can play.
pub async fn game_data(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<SessionUser>,
) -> Result<impl IntoResponse, AppError> {
    let questions = list_questions(&pool, user.id).await?;
    Ok(Json(GameData { questions }))
}

/// `GET /api/questions/{user_id}/{question_id}/{image_num}`
pub async fn question_image(
    State(pool): State<SqlitePool>,
    Path((user_id, question_id, image_num)): Path<(i64, i64, String)>,
) -> Result<Response, Response> {
    let slot = ImageSlot::from_path(&image_num);
    let image = find_question_image(&pool, user_id, question_id, slot)
        .await
        .map_err(AppError::into_plain_response)?;

    Ok(image_response(image))
}

/// `GET /api/images/{user_id}/{image_num}`
///
/// Serves the image columns of accounts that have not been migrated to
/// questions yet.
pub async fn legacy_image(
    State(pool): State<SqlitePool>,
    Path((user_id, image_num)): Path<(i64, String)>,
) -> Result<Response, Response> {
    let sql = match ImageSlot::from_path(&image_num) {
        Some(ImageSlot::First) => "SELECT legacy_image1 AS data, legacy_image1_type AS content_type FROM users WHERE id = ?",
        _ => "SELECT legacy_image2 AS data, legacy_image2_type AS content_type FROM users WHERE id = ?",
    };

    let row = sqlx::query_as::<_, ImageRow>(sql)
        .bind(user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| AppError::from(e).into_plain_response())?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()).into_plain_response())?;

    let image = row
        .into_image()
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()).into_plain_response())?;

    Ok(image_response(image))
}
