//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::error::AppError;
use crate::models::EnforcementRecord;
use crate::traits::{Fetcher, ImageRenderer, Poster, RecordStore, RecordTransaction, RenderRequest};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving canned pages by URL.
///
/// Unknown URLs fail with an HTTP 404 error. Configured errors are returned
/// once, after which the URL is unknown.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    errors: Arc<Mutex<HashMap<String, AppError>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_error(self, url: &str, error: AppError) -> Self {
        self.errors.lock().unwrap().insert(url.to_string(), error);
        self
    }

    /// Every URL fetched so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(error) = self.errors.lock().unwrap().remove(url) {
            return Err(error);
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {url}")))
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory store; transactions stage writes until commit.
#[derive(Clone, Default)]
pub struct MockStore {
    records: Arc<Mutex<BTreeMap<String, EnforcementRecord>>>,
    upsert_error: Arc<Mutex<Option<AppError>>>,
    upsert_errors_for: Arc<Mutex<HashMap<String, AppError>>>,
    commits: Arc<Mutex<usize>>,
    rollbacks: Arc<Mutex<usize>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<EnforcementRecord>) -> Self {
        let store = Self::default();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.url.clone(), record);
            }
        }
        store
    }

    /// The next upsert fails with `error`.
    pub fn with_upsert_error(self, error: AppError) -> Self {
        *self.upsert_error.lock().unwrap() = Some(error);
        self
    }

    /// The first upsert of `url` fails with `error`.
    pub fn with_upsert_error_for(self, url: &str, error: AppError) -> Self {
        self.upsert_errors_for
            .lock()
            .unwrap()
            .insert(url.to_string(), error);
        self
    }

    /// Committed state of a record.
    pub fn get(&self, url: &str) -> Option<EnforcementRecord> {
        self.records.lock().unwrap().get(url).cloned()
    }

    pub fn commit_count(&self) -> usize {
        *self.commits.lock().unwrap()
    }

    pub fn rollback_count(&self) -> usize {
        *self.rollbacks.lock().unwrap()
    }
}

impl RecordStore for MockStore {
    type Tx = MockTransaction;

    async fn begin(&self) -> Result<MockTransaction, AppError> {
        Ok(MockTransaction {
            store: self.clone(),
            staged: BTreeMap::new(),
        })
    }

    async fn find_unsent(&self) -> Result<Vec<EnforcementRecord>, AppError> {
        let mut unsent: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| !r.tweet_sent)
            .cloned()
            .collect();
        unsent.sort_by_key(|r| r.date);
        Ok(unsent)
    }

    async fn find_one(&self, url: &str) -> Result<Option<EnforcementRecord>, AppError> {
        Ok(self.get(url))
    }
}

/// Transaction over a [`MockStore`]; dropped without commit, it discards.
pub struct MockTransaction {
    store: MockStore,
    staged: BTreeMap<String, EnforcementRecord>,
}

impl RecordTransaction for MockTransaction {
    async fn find_one(&mut self, url: &str) -> Result<Option<EnforcementRecord>, AppError> {
        Ok(self
            .staged
            .get(url)
            .cloned()
            .or_else(|| self.store.get(url)))
    }

    async fn upsert(&mut self, record: &EnforcementRecord) -> Result<(), AppError> {
        if let Some(e) = self.store.upsert_error.lock().unwrap().take() {
            return Err(e);
        }
        if let Some(e) = self.store.upsert_errors_for.lock().unwrap().remove(&record.url) {
            return Err(e);
        }
        self.staged.insert(record.url.clone(), record.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), AppError> {
        self.store.records.lock().unwrap().extend(self.staged);
        *self.store.commits.lock().unwrap() += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        *self.store.rollbacks.lock().unwrap() += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPoster
// ---------------------------------------------------------------------------

/// A post recorded by [`MockPoster`].
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub text: String,
    pub with_image: bool,
}

/// Mock poster that records posts and fails for configured text.
#[derive(Clone, Default)]
pub struct MockPoster {
    posts: Arc<Mutex<Vec<RecordedPost>>>,
    fail_when_contains: Arc<Mutex<Vec<String>>>,
}

impl MockPoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any post whose text contains `needle` (e.g. a record URL).
    pub fn failing_for(self, needle: &str) -> Self {
        self.fail_when_contains
            .lock()
            .unwrap()
            .push(needle.to_string());
        self
    }

    /// Successful posts, in order.
    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }

    fn record(&self, text: &str, with_image: bool) -> Result<String, AppError> {
        let rejected = self
            .fail_when_contains
            .lock()
            .unwrap()
            .iter()
            .any(|needle| text.contains(needle.as_str()));
        if rejected {
            return Err(AppError::PostError {
                message: "Service Unavailable".into(),
                status_code: 503,
            });
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push(RecordedPost {
            text: text.to_string(),
            with_image,
        });
        Ok(format!("post-{}", posts.len()))
    }
}

impl Poster for MockPoster {
    async fn post_text(&self, text: &str) -> Result<String, AppError> {
        self.record(text, false)
    }

    async fn post_text_with_image(&self, text: &str, _png: &[u8]) -> Result<String, AppError> {
        self.record(text, true)
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Owned copy of a [`RenderRequest`].
#[derive(Debug, Clone)]
pub struct RecordedRender {
    pub organisation: Option<String>,
    pub penalty_amount: Option<String>,
    pub abbreviated_description: Option<String>,
    pub date: NaiveDate,
}

/// Mock renderer returning a fixed image (or none) and recording requests.
#[derive(Clone)]
pub struct MockRenderer {
    image: Option<Vec<u8>>,
    requests: Arc<Mutex<Vec<RecordedRender>>>,
}

impl MockRenderer {
    pub fn producing(image: Vec<u8>) -> Self {
        Self {
            image: Some(image),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            image: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRender> {
        self.requests.lock().unwrap().clone()
    }
}

impl ImageRenderer for MockRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Option<Vec<u8>> {
        self.requests.lock().unwrap().push(RecordedRender {
            organisation: request.organisation.map(str::to_string),
            penalty_amount: request.penalty_amount.map(str::to_string),
            abbreviated_description: request.abbreviated_description.map(str::to_string),
            date: request.date,
        });
        request.abbreviated_description?;
        self.image.clone()
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create an unsent record dated `date` (ISO format).
pub fn make_test_record(url: &str, date: &str) -> EnforcementRecord {
    EnforcementRecord {
        url: url.to_string(),
        pdf_id: None,
        pdf_url: None,
        action_type: None,
        date: Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
        title: Some("Test Organisation".to_string()),
        description: "Test Organisation has been fined for a test.".to_string(),
        abbreviated_description: "Fined for a test.".to_string(),
        penalty_amount: None,
        tweet_sent: false,
    }
}

/// A detail page laid out like the regulator's enforcement pages.
pub fn detail_page(title: &str, date: &str, pdf_hrefs: &[&str], description: &str) -> String {
    let links: String = pdf_hrefs
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">Download the notice</a></li>"#))
        .collect();
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <header><a href="/action-weve-taken/enforcement/">Enforcement</a></header>
        <h1>{title}</h1>
        <dl class="meta">
            <dt>Date</dt><dd>{date}</dd>
            <dt>Type</dt><dd>Monetary penalties</dd>
        </dl>
        <div class="article-content">
            <p>{description}</p>
            <p>Further details are set out in the notice.</p>
        </div>
        <div class="resultlist"><ul>{links}</ul></div>
        </body></html>"#
    )
}

/// A listing page linking to each of `hrefs`.
pub fn listing_page(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">Entry</a></li>"#))
        .collect();
    format!(r#"<html><body><ul class="results">{items}</ul></body></html>"#)
}
