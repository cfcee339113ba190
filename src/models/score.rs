// src/models/score.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::deserializers::deserialize_lenient_i64;

/// Represents the 'scores' table in the database.
/// One finished quiz session; never modified after insertion.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: i64,
    pub user_id: i64,
    pub points: i64,
    pub correct: i64,
    pub total: i64,
    pub time_spent_seconds: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting a finished quiz session.
/// Every field is coerced leniently; anything unusable counts as zero.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub score: i64,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub correct: i64,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub total: i64,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub time_spent_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreResponse {
    pub ok: bool,
    pub high_score: i64,
}
