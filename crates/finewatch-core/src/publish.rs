use std::time::Duration;

use chrono::{NaiveDate, TimeDelta};

use crate::error::AppError;
use crate::models::EnforcementRecord;
use crate::summarize::{Abbreviations, AliasRule};
use crate::traits::{ImageRenderer, Poster, RecordStore, RecordTransaction, RenderRequest};

/// Unsent records older than this many days are never published.
pub const RECENCY_WINDOW_DAYS: i64 = 14;

/// Maximum length of a post, in characters.
pub const POST_CHAR_LIMIT: usize = 280;

/// Characters reserved for the appended link and its separating space.
pub const LINK_ALLOWANCE: usize = 24;

pub const ELLIPSIS: char = '…';

/// Prefixed to text starting with the handle, so the post is not a reply.
pub const MENTION_GUARD: char = '.';

pub const DEFAULT_HANDLE: &str = "@ICOnews";

/// Pause before every post, to stay inside the posting API's rate limit.
pub const DEFAULT_POST_DELAY: Duration = Duration::from_secs(5);

/// Publisher settings.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Organisation names collapsed to the account handle in post text.
    pub mention: AliasRule,
    pub post_delay: Duration,
    pub recency_window_days: i64,
}

impl PublisherConfig {
    pub fn new(abbreviations: &Abbreviations, handle: &str) -> Self {
        Self {
            mention: abbreviations.organisation.with_alias(handle),
            post_delay: DEFAULT_POST_DELAY,
            recency_window_days: RECENCY_WINDOW_DAYS,
        }
    }

    pub fn with_post_delay(mut self, delay: Duration) -> Self {
        self.post_delay = delay;
        self
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self::new(&Abbreviations::default(), DEFAULT_HANDLE)
    }
}

/// A record that could not be published this run.
#[derive(Debug)]
pub struct PublishFailure {
    pub url: String,
    pub error: AppError,
}

/// Outcome of one publish pass.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub attempted: usize,
    /// URLs of records posted and marked sent.
    pub published: Vec<String>,
    pub failures: Vec<PublishFailure>,
}

impl PublishReport {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

/// Keep the records dated within `window_days` of `today`.
///
/// Input order is preserved. Undated records are never selected.
pub fn select_recent(
    records: Vec<EnforcementRecord>,
    today: NaiveDate,
    window_days: i64,
) -> Vec<EnforcementRecord> {
    let cutoff = today - TimeDelta::days(window_days);
    records
        .into_iter()
        .filter(|record| {
            let recent = record.date.is_some_and(|date| date >= cutoff);
            if !recent {
                tracing::debug!(url = %record.url, date = ?record.date, "Skipping stale record");
            }
            recent
        })
        .collect()
}

/// Compose the post text for a description and its page URL.
///
/// The text is shortened with a trailing ellipsis when needed so that the
/// URL always fits in full.
pub fn compose_post(description: &str, url: &str, mention: &AliasRule) -> String {
    let mut text = mention.apply(description);
    if !mention.alias().is_empty() && text.starts_with(mention.alias()) {
        text.insert(0, MENTION_GUARD);
    }

    let budget = POST_CHAR_LIMIT - LINK_ALLOWANCE;
    if text.chars().count() > budget {
        let kept: String = text.chars().take(budget - 1).collect();
        text = kept.trim_end().to_string();
        text.push(ELLIPSIS);
    }

    format!("{text} {url}")
}

/// Posts selected records, one transaction per record.
pub struct Publisher<S, P, R>
where
    S: RecordStore,
    P: Poster,
    R: ImageRenderer,
{
    store: S,
    poster: P,
    renderer: R,
    config: PublisherConfig,
}

impl<S, P, R> Publisher<S, P, R>
where
    S: RecordStore,
    P: Poster,
    R: ImageRenderer,
{
    pub fn new(store: S, poster: P, renderer: R, config: PublisherConfig) -> Self {
        Self {
            store,
            poster,
            renderer,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unsent records within the recency window, oldest first.
    pub async fn select(&self, today: NaiveDate) -> Result<Vec<EnforcementRecord>, AppError> {
        let unsent = self.store.find_unsent().await?;
        let total = unsent.len();
        let selected = select_recent(unsent, today, self.config.recency_window_days);
        tracing::info!(
            unsent = total,
            selected = selected.len(),
            "Selected records to publish"
        );
        Ok(selected)
    }

    /// Publish each record in order. Failures are recorded, never raised.
    pub async fn publish_all(
        &self,
        records: Vec<EnforcementRecord>,
        today: NaiveDate,
    ) -> PublishReport {
        let mut report = PublishReport {
            attempted: records.len(),
            ..PublishReport::default()
        };

        for record in records {
            match self.publish_one(&record, today).await {
                Ok(post_id) => {
                    tracing::info!(url = %record.url, %post_id, "Published");
                    report.published.push(record.url);
                }
                Err(error) => {
                    tracing::error!(url = %record.url, %error, "Failed to publish");
                    report.failures.push(PublishFailure {
                        url: record.url,
                        error,
                    });
                }
            }
        }

        report
    }

    /// Post one record and mark it sent; rolled back on any failure.
    pub async fn publish_one(
        &self,
        record: &EnforcementRecord,
        today: NaiveDate,
    ) -> Result<String, AppError> {
        let mut tx = self.store.begin().await?;

        match self.deliver(&mut tx, record, today).await {
            Ok(post_id) => {
                tx.commit().await?;
                Ok(post_id)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::warn!(url = %record.url, %rollback_error, "Rollback failed");
                }
                Err(error)
            }
        }
    }

    async fn deliver(
        &self,
        tx: &mut S::Tx,
        record: &EnforcementRecord,
        today: NaiveDate,
    ) -> Result<String, AppError> {
        let text = compose_post(&record.description, &record.url, &self.config.mention);

        let image = self.renderer.render(&RenderRequest {
            organisation: record.title.as_deref(),
            penalty_amount: record.penalty_amount.as_deref(),
            abbreviated_description: Some(record.abbreviated_description.as_str())
                .filter(|d| !d.is_empty()),
            date: today,
        });

        if !self.config.post_delay.is_zero() {
            tokio::time::sleep(self.config.post_delay).await;
        }

        let post_id = match image {
            Some(png) => self.poster.post_text_with_image(&text, &png).await?,
            None => self.poster.post_text(&text).await?,
        };

        let mut sent = record.clone();
        sent.tweet_sent = true;
        tx.upsert(&sent).await?;

        Ok(post_id)
    }
}
