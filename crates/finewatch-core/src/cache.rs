//! Response caching for page fetches.
//!
//! Wraps any [`Fetcher`] so that a URL fetched successfully is served from
//! memory until its entry expires. Failures are never cached.

use std::time::Duration;

use moka::future::Cache;

use crate::error::AppError;
use crate::traits::Fetcher;

/// How long a fetched page stays fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const DEFAULT_CAPACITY: u64 = 1_000;

/// A [`Fetcher`] wrapper that caches successful bodies by URL.
#[derive(Clone)]
pub struct CachingFetcher<F> {
    inner: F,
    cache: Cache<String, String>,
}

impl<F: Fetcher> CachingFetcher<F> {
    /// Wrap `inner` with a one-hour cache.
    pub fn new(inner: F) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(inner: F, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }
}

impl<F: Fetcher> Fetcher for CachingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if let Some(body) = self.cache.get(url).await {
            tracing::debug!(%url, "Serving page from cache");
            return Ok(body);
        }

        let body = self.inner.fetch(url).await?;
        self.cache.insert(url.to_string(), body.clone()).await;
        Ok(body)
    }
}
