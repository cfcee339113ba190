// src/handlers/account.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_typed_multipart::TypedMultipart;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        question::{QuestionForm, QuestionSummary, StoredImage},
        score::ScoreRecord,
        user::{AccountResponse, User},
    },
    utils::session::{LOGIN_PATH, SessionUser},
};

const ACCOUNT_PATH: &str = "/account";

/// Number of past results shown on the account page.
const RECENT_SCORES: i64 = 20;

#[derive(sqlx::FromRow)]
struct LegacyFields {
    legacy_image1: Option<Vec<u8>>,
    legacy_image1_type: Option<String>,
    legacy_image2: Option<Vec<u8>>,
    legacy_image2_type: Option<String>,
    legacy_answer: Option<String>,
}

fn non_empty(data: Option<Vec<u8>>) -> Option<Vec<u8>> {
    data.filter(|d| !d.is_empty())
}

/// Folds the legacy single-question columns of an account into a question.
///
/// Runs only when the account has legacy image data and no questions yet.
/// The legacy columns are cleared in the same transaction. Returns whether a
/// question was created.
pub async fn migrate_legacy_question(pool: &SqlitePool, user_id: i64) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let legacy = sqlx::query_as::<_, LegacyFields>(
        r#"
        SELECT legacy_image1, legacy_image1_type, legacy_image2, legacy_image2_type, legacy_answer
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(legacy) = legacy else {
        return Ok(false);
    };

    let image1 = non_empty(legacy.legacy_image1);
    let image2 = non_empty(legacy.legacy_image2);
    if image1.is_none() && image2.is_none() {
        return Ok(false);
    }

    let question_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if question_count > 0 {
        return Ok(false);
    }

    let image1_type = image1.as_ref().and(legacy.legacy_image1_type);
    let image2_type = image2.as_ref().and(legacy.legacy_image2_type);

    sqlx::query(
        r#"
        INSERT INTO questions (user_id, image1, image1_type, image2, image2_type, answer, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(image1)
    .bind(image1_type)
    .bind(image2)
    .bind(image2_type)
    .bind(legacy.legacy_answer.unwrap_or_default())
    .bind(chrono::Utc::now())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE users SET
            legacy_image1 = NULL,
            legacy_image1_type = NULL,
            legacy_image2 = NULL,
            legacy_image2_type = NULL,
            legacy_answer = NULL
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Migrated legacy images of user {} into a question", user_id);
    Ok(true)
}

/// All questions owned by `user_id`, oldest first, without image bytes.
pub async fn list_own_questions(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<QuestionSummary>, AppError> {
    let questions = sqlx::query_as::<_, QuestionSummary>(
        r#"
        SELECT
            id,
            user_id,
            answer,
            image1 IS NOT NULL AS has_image1,
            image2 IS NOT NULL AS has_image2,
            created_at
        FROM questions
        WHERE user_id = ?
        ORDER BY id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// `GET /account` and `GET /questions`
///
/// The owner's overview: profile, high score, recent results and questions.
/// Legacy data is migrated before anything is read.
pub async fn overview(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<SessionUser>,
) -> Result<Response, AppError> {
    migrate_legacy_question(&pool, session.id).await?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, high_score, created_at FROM users WHERE id = ?",
    )
    .bind(session.id)
    .fetch_optional(&pool)
    .await?;

    let Some(user) = user else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let questions = list_own_questions(&pool, user.id).await?;

    let scores = sqlx::query_as::<_, ScoreRecord>(
        r#"
        SELECT id, user_id, points, correct, total, time_spent_seconds, created_at
        FROM scores
        WHERE user_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(user.id)
    .bind(RECENT_SCORES)
    .fetch_all(&pool)
    .await?;

    Ok(Json(AccountResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        high_score: user.high_score,
        created_at: user.created_at,
        questions,
        scores,
    })
    .into_response())
}

/// `GET /account/questions/{qid}/edit`
pub async fn edit_question(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<SessionUser>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = list_own_questions(&pool, session.id)
        .await?
        .into_iter()
        .find(|q| q.id == question_id)
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// `POST /account/questions` (also the legacy `/account/upload-images`)
///
/// Both images and a non-blank answer are required.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<SessionUser>,
    TypedMultipart(form): TypedMultipart<QuestionForm>,
) -> Result<impl IntoResponse, AppError> {
    let answer = form
        .answer
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("An answer is required".to_string()))?
        .to_string();

    let (Some(image1), Some(image2)) = (
        StoredImage::from_upload(form.image1),
        StoredImage::from_upload(form.image2),
    ) else {
        return Err(AppError::BadRequest("Both images are required".to_string()));
    };

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO questions (user_id, image1, image1_type, image2, image2_type, answer, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(session.id)
    .bind(image1.data)
    .bind(image1.content_type)
    .bind(image2.data)
    .bind(image2.content_type)
    .bind(&answer)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!("User {} created question {}", session.id, id);

    Ok(Redirect::to(ACCOUNT_PATH))
}

/// `POST /account/questions/{qid}`
///
/// Partial update: only uploaded images replace the stored ones, and the
/// answer changes only when a non-blank one is sent.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<SessionUser>,
    Path(question_id): Path<i64>,
    TypedMultipart(form): TypedMultipart<QuestionForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    // Check ownership
    sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE id = ? AND user_id = ?")
        .bind(question_id)
        .bind(session.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if let Some(image) = StoredImage::from_upload(form.image1) {
        sqlx::query("UPDATE questions SET image1 = ?, image1_type = ? WHERE id = ?")
            .bind(image.data)
            .bind(image.content_type)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(image) = StoredImage::from_upload(form.image2) {
        sqlx::query("UPDATE questions SET image2 = ?, image2_type = ? WHERE id = ?")
            .bind(image.data)
            .bind(image.content_type)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    // A blank answer keeps the stored one
    if let Some(answer) = form.answer.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        sqlx::query("UPDATE questions SET answer = ? WHERE id = ?")
            .bind(answer)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Redirect::to(ACCOUNT_PATH))
}

/// `POST /account/questions/{qid}/delete`
///
/// Deleting a question that does not exist is not an error.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<SessionUser>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ? AND user_id = ?")
        .bind(question_id)
        .bind(session.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() > 0 {
        tracing::info!("User {} deleted question {}", session.id, question_id);
    }

    Ok(Redirect::to(ACCOUNT_PATH))
}
