// src/models/question.rs

use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Metadata of a row in the 'questions' table, without the image bytes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub id: i64,

    /// Owning account.
    pub user_id: i64,

    /// The word or phrase players have to guess.
    pub answer: String,

    pub has_image1: bool,
    pub has_image2: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One playable question as listed for the quiz client.
///
/// The answer travels with the entry; the client checks guesses locally.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub user_id: i64,
    pub username: String,
    pub question_id: i64,
    pub answer: String,
}

/// Response body of `GET /api/game-data`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GameData {
    pub questions: Vec<CatalogEntry>,
}

/// Which of the two images of a question is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    First,
    Second,
}

impl ImageSlot {
    /// Parses the `1`/`2` path segment used by the image routes.
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "1" => Some(ImageSlot::First),
            "2" => Some(ImageSlot::Second),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            ImageSlot::First => 1,
            ImageSlot::Second => 2,
        }
    }
}

/// Raw image bytes plus the content type they were uploaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl StoredImage {
    /// Builds an image from an uploaded multipart field. Empty parts, which
    /// browsers send for untouched file inputs, count as no image.
    pub fn from_upload(field: Option<FieldData<Bytes>>) -> Option<Self> {
        let field = field?;
        if field.contents.is_empty() {
            return None;
        }
        Some(Self {
            content_type: field
                .metadata
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            data: field.contents.to_vec(),
        })
    }

    /// Cache fingerprint: length plus the hex of the first few bytes.
    /// Not a content hash; two images sharing a header and size collide.
    pub fn etag(&self) -> String {
        let prefix: String = self
            .data
            .iter()
            .take(8)
            .map(|b| format!("{:02x}", b))
            .collect();
        format!("\"{:x}-{}\"", self.data.len(), prefix)
    }
}

/// Multipart form for creating or updating a question.
/// Fields are optional here; the handlers decide what is required.
#[derive(Debug, TryFromMultipart)]
pub struct QuestionForm {
    #[form_data(limit = "5MiB")]
    pub image1: Option<FieldData<Bytes>>,
    #[form_data(limit = "5MiB")]
    pub image2: Option<FieldData<Bytes>>,
    pub answer: Option<String>,
}
