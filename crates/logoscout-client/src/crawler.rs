use std::time::Duration;

use chrono::Utc;
use logoscout_core::error::AppError;
use logoscout_core::models::{FetchedPage, NewCacheEntry};
use logoscout_core::traits::{Fetcher, PageCache, PageFetcher};
use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header::USER_AGENT;

/// Fixed User-Agent pool, rotated per request to reduce trivial bot-blocking.
const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/44.0.2403.155 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.3; WOW64; rv:39.0) Gecko/20100101 Firefox/39.0",
    "Opera/9.80 (iPhone; Opera Mini/10.2.0/37.6334; U; nl) Presto/2.12.423 Version/12.16",
    "Mozilla/5.0 (Android 4.2.2;) AppleWebKit/1.1 Version/4.0 Mobile Safari/1.1",
    "Mozilla/5.0 (X11; Linux x86_64; rv:28.0) Gecko/20100101 Firefox/28.0 Iceweasel/28.0",
];

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Single-shot page retrieval over reqwest.
///
/// GETs `https://{domain}/` with a randomized User-Agent, following
/// redirects. A non-2xx response is not an error: the body and status are
/// returned for the caller to cache and process.
#[derive(Clone)]
pub struct SiteFetcher {
    client: Client,
    timeout_secs: u64,
}

impl SiteFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl PageFetcher for SiteFetcher {
    async fn get(&self, domain: &str) -> Result<FetchedPage, AppError> {
        let url = format!("https://{domain}/");
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, random_user_agent())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        Ok(FetchedPage { body, status })
    }
}

// A plain fetcher is also a valid Extract stage on its own, for runs that
// should never touch a cache.
impl Fetcher for SiteFetcher {
    async fn fetch(&self, domain: &str) -> Result<String, AppError> {
        let page = PageFetcher::get(self, domain).await?;
        Ok(page.body)
    }
}

/// The Extract stage: cache-first page retrieval.
///
/// Consults the page cache within the configured freshness window before
/// going to the network; successful network fetches are appended to the cache
/// best-effort. Cache failures in either direction are logged and swallowed —
/// caching is an optimization, never a correctness requirement.
#[derive(Clone)]
pub struct CachedCrawler<F, C>
where
    F: PageFetcher,
    C: PageCache,
{
    fetcher: F,
    cache: C,
    max_age: Duration,
}

impl<F, C> CachedCrawler<F, C>
where
    F: PageFetcher,
    C: PageCache,
{
    pub fn new(fetcher: F, cache: C, max_age: Duration) -> Self {
        Self {
            fetcher,
            cache,
            max_age,
        }
    }
}

impl<F, C> Fetcher for CachedCrawler<F, C>
where
    F: PageFetcher,
    C: PageCache,
{
    async fn fetch(&self, domain: &str) -> Result<String, AppError> {
        match self.cache.lookup(domain, self.max_age).await {
            Ok(Some(body)) => {
                tracing::debug!(%domain, "Serving page from cache");
                return Ok(body);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(%domain, error = %e, "Failed to load from cache");
            }
        }

        let page = self.fetcher.get(domain).await?;

        let entry = NewCacheEntry {
            domain: domain.to_string(),
            body: page.body.clone(),
            status: page.status,
            retrieved_at: Utc::now(),
        };
        if let Err(e) = self.cache.store(&entry).await {
            tracing::debug!(%domain, error = %e, "Failed to cache page");
        }

        Ok(page.body)
    }
}
