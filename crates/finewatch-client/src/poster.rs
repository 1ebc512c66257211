use std::time::Duration;

use finewatch_core::error::AppError;
use finewatch_core::traits::Poster;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.x.com";
const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(60);
const IMAGE_MEDIA_CATEGORY: &str = "tweet_image";

/// Posting client for the X API v2.
///
/// Authenticates with an OAuth 2.0 user-context access token sent as a
/// bearer token.
#[derive(Clone)]
pub struct XPoster {
    client: Client,
    base_url: String,
    access_token: String,
    timeout_secs: u64,
}

impl XPoster {
    pub fn new(access_token: &str) -> Result<Self, AppError> {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(access_token: &str, base_url: &str) -> Result<Self, AppError> {
        Self::build(access_token, base_url, DEFAULT_POST_TIMEOUT)
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        Self::build(&self.access_token, &self.base_url, timeout)
    }

    fn build(access_token: &str, base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        if access_token.trim().is_empty() {
            return Err(AppError::ConfigError(
                "X access token must not be empty".into(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }

    async fn create_post(&self, request: &CreatePostRequest<'_>) -> Result<String, AppError> {
        let url = format!("{}/2/tweets", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response).await?;
        let created: DataEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse post response: {e}")))?;

        tracing::debug!(id = %created.data.id, "Post created");
        Ok(created.data.id)
    }

    async fn upload_image(&self, png: &[u8]) -> Result<String, AppError> {
        let url = format!("{}/2/media/upload", self.base_url);
        let part = Part::bytes(png.to_vec())
            .file_name("summary.png")
            .mime_str("image/png")
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        let form = Form::new()
            .text("media_category", IMAGE_MEDIA_CATEGORY)
            .text("media_type", "image/png")
            .part("media", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = check_status(response).await?;
        let uploaded: DataEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse upload response: {e}")))?;

        tracing::debug!(media_id = %uploaded.data.id, bytes = png.len(), "Image uploaded");
        Ok(uploaded.data.id)
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

/// Map a non-2xx response to [`AppError::PostError`].
async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status_code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiProblem>(&body)
        .ok()
        .and_then(ApiProblem::into_message)
        .unwrap_or_else(|| format!("HTTP {status_code}: {body}"));

    Err(AppError::PostError {
        message,
        status_code,
    })
}

// ---- X API types ----

#[derive(Serialize)]
struct CreatePostRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaAttachment>,
}

#[derive(Serialize)]
struct MediaAttachment {
    media_ids: Vec<String>,
}

#[derive(Deserialize)]
struct DataEnvelope {
    data: IdOnly,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

/// Error body; X returns either `detail` or a list of `errors`.
#[derive(Deserialize)]
struct ApiProblem {
    detail: Option<String>,
    #[serde(default)]
    errors: Vec<ApiProblemItem>,
}

#[derive(Deserialize)]
struct ApiProblemItem {
    message: String,
}

impl ApiProblem {
    fn into_message(self) -> Option<String> {
        self.detail
            .or_else(|| self.errors.into_iter().next().map(|e| e.message))
    }
}

impl Poster for XPoster {
    async fn post_text(&self, text: &str) -> Result<String, AppError> {
        self.create_post(&CreatePostRequest { text, media: None })
            .await
    }

    async fn post_text_with_image(&self, text: &str, png: &[u8]) -> Result<String, AppError> {
        let media_id = self.upload_image(png).await?;
        self.create_post(&CreatePostRequest {
            text,
            media: Some(MediaAttachment {
                media_ids: vec![media_id],
            }),
        })
        .await
    }
}
