use std::future::Future;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::EnforcementRecord;

/// Fetches raw HTML content from a URL.
///
/// Implementations must fail on non-2xx responses and on permanent (301)
/// redirects.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Persists enforcement records keyed by URL.
pub trait RecordStore: Send + Sync + Clone {
    type Tx: RecordTransaction;

    /// Open a transaction. All writes go through a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, AppError>> + Send;

    /// Records not yet marked sent, oldest date first.
    fn find_unsent(&self) -> impl Future<Output = Result<Vec<EnforcementRecord>, AppError>> + Send;

    fn find_one(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<EnforcementRecord>, AppError>> + Send;
}

/// A unit of work against a [`RecordStore`].
///
/// Dropping a transaction without committing discards its writes.
pub trait RecordTransaction: Send {
    fn find_one(
        &mut self,
        url: &str,
    ) -> impl Future<Output = Result<Option<EnforcementRecord>, AppError>> + Send;

    /// Insert or overwrite the record with the same URL.
    fn upsert(
        &mut self,
        record: &EnforcementRecord,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), AppError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Publishes posts to a social-media account. Returns the created post id.
pub trait Poster: Send + Sync + Clone {
    fn post_text(&self, text: &str) -> impl Future<Output = Result<String, AppError>> + Send;

    fn post_text_with_image(
        &self,
        text: &str,
        png: &[u8],
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Inputs for the summary image.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest<'a> {
    pub organisation: Option<&'a str>,
    pub penalty_amount: Option<&'a str>,
    pub abbreviated_description: Option<&'a str>,
    pub date: NaiveDate,
}

/// Renders a summary image for a post.
///
/// Returns `None` when no image could be produced, which must always be the
/// case when `abbreviated_description` is absent.
pub trait ImageRenderer: Send + Sync + Clone {
    fn render(&self, request: &RenderRequest<'_>) -> Option<Vec<u8>>;
}

/// A renderer that never produces an image, so every post is text-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl ImageRenderer for NullRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Option<Vec<u8>> {
        tracing::debug!(
            organisation = ?request.organisation,
            "No image renderer configured, posting text only"
        );
        None
    }
}
