use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::AppError;
use crate::extract::RecordBuilder;
use crate::models::EnforcementRecord;
use crate::site::{ENFORCEMENT_PATH, Site};
use crate::traits::Fetcher;

static LISTING_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!(r#"a[href*="{ENFORCEMENT_PATH}"]"#)).expect("valid listing selector")
});

/// Walks the enforcement listing and builds one record per detail page.
pub struct ListingWalker<F: Fetcher> {
    fetcher: F,
    builder: RecordBuilder,
}

impl<F: Fetcher> ListingWalker<F> {
    pub fn new(fetcher: F, builder: RecordBuilder) -> Self {
        Self { fetcher, builder }
    }

    /// Fetch the listing page and return the pages it links to.
    ///
    /// Nothing beyond the listing is fetched until [`PenaltyPages::next`] is
    /// called. Every call starts over from a fresh listing fetch.
    pub async fn walk(&self) -> Result<PenaltyPages<'_, F>, AppError> {
        let list_url = &self.builder.site().list_url;
        tracing::info!(url = %list_url, "Fetching enforcement listing");
        let html = self.fetcher.fetch(list_url).await?;

        let pages = parse_listing(&html, self.builder.site());
        tracing::info!(count = pages.len(), "Found enforcement pages");
        for page in &pages {
            tracing::debug!(url = %page, "Listed");
        }

        Ok(PenaltyPages {
            walker: self,
            pending: pages.into(),
            failed: false,
        })
    }
}

/// Detail-page URLs linked from the listing, absolute, in document order.
///
/// Links back to the listing itself are dropped and repeats are collapsed.
pub fn parse_listing(html: &str, site: &Site) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&LISTING_LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| site.expand_href(href))
        .filter(|url| *url != site.list_url)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Forward-only sequence of records, one fetch per element.
///
/// The first error is returned once; after it the sequence is exhausted.
pub struct PenaltyPages<'a, F: Fetcher> {
    walker: &'a ListingWalker<F>,
    pending: VecDeque<String>,
    failed: bool,
}

impl<F: Fetcher> PenaltyPages<'_, F> {
    /// Number of listed pages not yet fetched.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Fetch and build the next record, or `None` when the walk is over.
    pub async fn next(&mut self) -> Option<Result<EnforcementRecord, AppError>> {
        if self.failed {
            return None;
        }
        let url = self.pending.pop_front()?;

        let result = self.fetch_record(&url).await;
        if result.is_err() {
            self.failed = true;
            self.pending.clear();
        }
        Some(result)
    }

    async fn fetch_record(&self, url: &str) -> Result<EnforcementRecord, AppError> {
        tracing::info!(%url, "Fetching enforcement page");
        let html = self.walker.fetcher.fetch(url).await?;
        self.walker.builder.build(url, &html)
    }
}
