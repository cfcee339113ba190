// src/game/http.rs

use async_trait::async_trait;
use reqwest::{Response, header, redirect};
use url::Url;

use crate::{
    game::backend::{ClientError, QuizBackend, ScoreReport},
    models::{
        question::{CatalogEntry, GameData, ImageSlot, StoredImage},
        score::SubmitScoreResponse,
    },
};

/// `QuizBackend` talking to a running server over HTTP.
///
/// Keeps the session cookie set at login in its cookie store. Redirects are
/// not followed: a redirect from a protected endpoint means the session is
/// gone.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// Logs in with email and password. The server answers a successful login
    /// with a redirect and the session cookie.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/auth/login")?)
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if status.is_redirection() {
            return Ok(());
        }

        Err(ClientError::Status {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.client.get(self.url("/auth/logout")?).send().await?;
        Ok(())
    }
}

/// Maps redirects and error statuses to `ClientError`.
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();

    if status.is_redirection() {
        return Err(ClientError::NotAuthenticated);
    }

    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    Ok(response)
}

#[async_trait]
impl QuizBackend for HttpBackend {
    async fn game_data(&self) -> Result<Vec<CatalogEntry>, ClientError> {
        let response = self.client.get(self.url("/api/game-data")?).send().await?;
        let data: GameData = ensure_success(response).await?.json().await?;
        Ok(data.questions)
    }

    async fn question_image(
        &self,
        user_id: i64,
        question_id: i64,
        slot: ImageSlot,
    ) -> Result<StoredImage, ClientError> {
        let path = format!("/api/questions/{}/{}/{}", user_id, question_id, slot.number());
        let response = ensure_success(self.client.get(self.url(&path)?).send().await?).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = response.bytes().await?.to_vec();

        Ok(StoredImage { data, content_type })
    }

    async fn submit_score(&self, report: &ScoreReport) -> Result<i64, ClientError> {
        let response = self
            .client
            .post(self.url("/api/game/submit")?)
            .json(report)
            .send()
            .await?;

        let body: SubmitScoreResponse = ensure_success(response).await?.json().await?;
        Ok(body.high_score)
    }
}
