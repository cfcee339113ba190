// src/game/backend.rs

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::question::{CatalogEntry, ImageSlot, StoredImage};

/// What the quiz client reports to the score service at the end of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub score: i64,
    pub correct: i64,
    pub total: i64,
    pub time_spent_seconds: i64,
}

/// Errors seen by the quiz client when talking to the server.
#[derive(Debug)]
pub enum ClientError {
    /// Connection, TLS, or body decoding failure.
    Transport(reqwest::Error),

    /// The server sent us to the login page.
    NotAuthenticated,

    /// Any other non-success status, with the response body.
    Status { status: u16, message: String },

    InvalidUrl(url::ParseError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "request failed: {}", e),
            ClientError::NotAuthenticated => write!(f, "not logged in"),
            ClientError::Status { status, message } => {
                write!(f, "server answered {}: {}", status, message)
            }
            ClientError::InvalidUrl(e) => write!(f, "invalid server URL: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err)
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err)
    }
}

/// The three server calls a quiz session makes.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Question catalog for the logged-in user (`GET /api/game-data`).
    async fn game_data(&self) -> Result<Vec<CatalogEntry>, ClientError>;

    /// One image of one question.
    async fn question_image(
        &self,
        user_id: i64,
        question_id: i64,
        slot: ImageSlot,
    ) -> Result<StoredImage, ClientError>;

    /// Submits a finished session and returns the account's high score.
    async fn submit_score(&self, report: &ScoreReport) -> Result<i64, ClientError>;
}
