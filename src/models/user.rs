// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{question::QuestionSummary, score::ScoreRecord};

/// A row of `users`, without the legacy image columns.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Shown on the leaderboard and next to authored questions.
    pub username: String,

    /// Login identifier, stored lowercased.
    pub email: String,

    /// Argon2 hash. Never serialized.
    #[serde(skip)]
    pub password: String,

    /// Best score ever submitted. Never decreases.
    pub high_score: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Account overview returned to the owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub high_score: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions: Vec<QuestionSummary>,
    pub scores: Vec<ScoreRecord>,
}

/// One row of the public leaderboard.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub high_score: i64,
}

/// Fields of the registration form.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(email(message = "Email address is not valid."))]
    pub email: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// Fields of the login form. Only checked for sane lengths; any mismatch
/// is reported as invalid credentials.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
