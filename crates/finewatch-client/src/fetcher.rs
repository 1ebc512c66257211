use std::time::Duration;

use finewatch_core::error::AppError;
use finewatch_core::traits::Fetcher;
use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, StatusCode, header};
use url::Url;

const USER_AGENT: &str = "finewatch/0.1 (+https://github.com/finewatch/finewatch)";
const MAX_REDIRECTS: usize = 10;

/// HTTP fetcher using reqwest.
///
/// Temporary redirects are followed. A permanent redirect (301) is never
/// followed; it is reported as an error carrying the new location.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(Policy::custom(redirect_policy))
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

fn redirect_policy(attempt: Attempt<'_>) -> reqwest::redirect::Action {
    if attempt.status() == StatusCode::MOVED_PERMANENTLY {
        attempt.stop()
    } else if attempt.previous().len() >= MAX_REDIRECTS {
        attempt.error("too many redirects")
    } else {
        attempt.follow()
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let parsed = Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::HttpError(format!(
                "URL scheme '{}' is not allowed (only http/https)",
                parsed.scheme()
            )));
        }

        tracing::debug!(url, "Fetching page");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::MOVED_PERMANENTLY {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok());
            let message = permanent_redirect_message(&parsed, location);
            tracing::warn!(url, %message, "Page moved permanently");
            return Err(AppError::HttpError(message));
        }
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

/// Describe a 301, resolving a relative `Location` against the request URL.
fn permanent_redirect_message(from: &Url, location: Option<&str>) -> String {
    match location {
        Some(location) => {
            let target = from
                .join(location)
                .map(String::from)
                .unwrap_or_else(|_| location.to_string());
            format!("HTTP 301 for {from}: moved permanently to {target}")
        }
        None => format!("HTTP 301 for {from}: moved permanently (no location given)"),
    }
}
