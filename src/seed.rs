// src/seed.rs

use sqlx::SqlitePool;

use crate::{error::AppError, utils::hash::hash_password};

/// Password shared by all seeded test accounts.
pub const TEST_PASSWORD: &str = "TestPassword123!";

const TEST_USERS: u32 = 3;
const QUESTIONS_PER_USER: usize = 10;

const TEST_ANSWERS: [&str; 20] = [
    "cat", "dog", "tree", "house", "car", "flower", "mountain", "river", "book", "computer",
    "phone", "chair", "table", "window", "door", "bicycle", "airplane", "ship", "train", "guitar",
];

/// A 1x1 PNG used as the image of every seeded question.
const PIXEL_PNG: [u8; 69] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
    0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
    0xCF, 0xC0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0xB4, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Creates `testuser1..3` with ten questions each.
///
/// Does nothing if any `testuserN` account already exists. Returns the number
/// of accounts created.
pub async fn seed_test_data(pool: &SqlitePool) -> Result<u32, AppError> {
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE username GLOB 'testuser[0-9]*' AND username NOT GLOB 'testuser*[^0-9]*'",
    )
    .fetch_one(pool)
    .await?;

    if existing > 0 {
        tracing::info!("Test data already exists, skipping seed");
        return Ok(0);
    }

    let hashed_password = hash_password(TEST_PASSWORD)?;
    let mut tx = pool.begin().await?;

    for user_num in 1..=TEST_USERS {
        let user_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, email, password, created_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(format!("testuser{}", user_num))
        .bind(format!("testuser{}@test.com", user_num))
        .bind(&hashed_password)
        .bind(chrono::Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for answer in TEST_ANSWERS.iter().cycle().take(QUESTIONS_PER_USER) {
            sqlx::query(
                r#"
                INSERT INTO questions (user_id, image1, image1_type, image2, image2_type, answer, created_at)
                VALUES (?, ?, 'image/png', ?, 'image/png', ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(&PIXEL_PNG[..])
            .bind(&PIXEL_PNG[..])
            .bind(*answer)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        tracing::info!("Seeded testuser{} with {} questions", user_num, QUESTIONS_PER_USER);
    }

    tx.commit().await?;
    Ok(TEST_USERS)
}
