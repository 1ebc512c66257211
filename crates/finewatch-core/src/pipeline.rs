use chrono::NaiveDate;

use crate::error::AppError;
use crate::listing::{ListingWalker, PenaltyPages};
use crate::models::EnforcementRecord;
use crate::publish::{PublishReport, Publisher};
use crate::traits::{Fetcher, ImageRenderer, Poster, RecordStore, RecordTransaction};

/// Result of a full run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Records extracted and upserted by the listing pass.
    pub scraped: usize,
    pub report: PublishReport,
}

impl RunOutcome {
    /// True when no publish attempt failed.
    pub fn is_clean(&self) -> bool {
        self.report.failures.is_empty()
    }
}

/// Walk the listing and upsert every record it yields in one transaction.
///
/// Existing delivery status is carried over on each upsert. The first
/// failure, whether a page or a write, aborts the pass; records upserted
/// before it are still committed. Returns the records as stored.
pub async fn run_listing_pass<F, S>(
    walker: &ListingWalker<F>,
    store: &S,
) -> Result<Vec<EnforcementRecord>, AppError>
where
    F: Fetcher,
    S: RecordStore,
{
    let mut pages = walker.walk().await?;
    tracing::debug!(pages = pages.remaining(), "Listing pass started");
    let mut tx = store.begin().await?;
    let mut stored = Vec::new();

    if let Err(error) = upsert_pages(&mut pages, &mut tx, &mut stored).await {
        tracing::error!(
            %error,
            extraction = error.is_extraction_error(),
            fetch = error.is_fetch_error(),
            upserted = stored.len(),
            "Listing pass aborted"
        );
        if let Err(commit_error) = tx.commit().await {
            tracing::error!(%commit_error, "Failed to commit partial listing pass");
        }
        return Err(error);
    }

    tx.commit().await?;
    tracing::info!(count = stored.len(), "Listing pass committed");
    Ok(stored)
}

async fn upsert_pages<F, T>(
    pages: &mut PenaltyPages<'_, F>,
    tx: &mut T,
    stored: &mut Vec<EnforcementRecord>,
) -> Result<(), AppError>
where
    F: Fetcher,
    T: RecordTransaction,
{
    while let Some(result) = pages.next().await {
        let mut record = result?;
        let existing = tx.find_one(&record.url).await?;
        record.preserve_delivery(existing.as_ref());
        tx.upsert(&record).await?;
        tracing::info!(
            url = %record.url,
            new = existing.is_none(),
            tweet_sent = record.tweet_sent,
            "Upserted record"
        );
        stored.push(record);
    }
    Ok(())
}

/// Orchestrates a run: walk listing → upsert → commit, then select → publish.
///
/// Generic over all external dependencies via traits, so runs can be tested
/// without real HTTP, storage or posting.
pub struct Pipeline<F, S, P, R>
where
    F: Fetcher,
    S: RecordStore,
    P: Poster,
    R: ImageRenderer,
{
    walker: ListingWalker<F>,
    publisher: Publisher<S, P, R>,
}

impl<F, S, P, R> Pipeline<F, S, P, R>
where
    F: Fetcher,
    S: RecordStore,
    P: Poster,
    R: ImageRenderer,
{
    pub fn new(walker: ListingWalker<F>, publisher: Publisher<S, P, R>) -> Self {
        Self { walker, publisher }
    }

    pub fn publisher(&self) -> &Publisher<S, P, R> {
        &self.publisher
    }

    /// Run the listing pass against the publisher's store.
    pub async fn scrape(&self) -> Result<usize, AppError> {
        let stored = run_listing_pass(&self.walker, self.publisher.store()).await?;
        Ok(stored.len())
    }

    /// Publish unsent, recent records. Only selection errors are returned.
    pub async fn publish(&self, today: NaiveDate) -> Result<PublishReport, AppError> {
        let records = self.publisher.select(today).await?;
        Ok(self.publisher.publish_all(records, today).await)
    }

    /// Scrape, then publish.
    pub async fn run(&self, today: NaiveDate) -> Result<RunOutcome, AppError> {
        let scraped = self.scrape().await?;
        let report = self.publish(today).await?;
        tracing::info!(
            scraped,
            attempted = report.attempted,
            published = report.published.len(),
            failed = report.failed_count(),
            "Run complete"
        );
        Ok(RunOutcome { scraped, report })
    }
}
