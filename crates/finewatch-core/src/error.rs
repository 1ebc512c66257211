use thiserror::Error;

/// Application-wide error types for finewatch.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (non-2xx status or permanent redirect).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// More than one candidate for a field that must be unique on a page.
    #[error("Ambiguous {field} on {url}: found {count} candidates")]
    ExtractionAmbiguity {
        url: String,
        field: &'static str,
        count: usize,
    },

    /// A required field is missing from a page.
    #[error("Extraction failed for {url}: {message}")]
    ExtractionError { url: String, message: String },

    /// The posting API rejected a request.
    #[error("Post error (HTTP {status_code}): {message}")]
    PostError { message: String, status_code: u16 },

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Returns true if this error came from the fetch layer.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::Timeout(_) | AppError::NetworkError(_)
        )
    }

    /// Returns true if this error aborts the extraction phase of a run.
    ///
    /// Every error raised while walking the listing is fatal; this only
    /// distinguishes page-content problems from storage problems in logs.
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            AppError::ExtractionAmbiguity { .. } | AppError::ExtractionError { .. }
        )
    }
}
