//! Test utilities: mock implementations of the capability traits.
//!
//! Handwritten mocks for dependency injection in unit tests. All mocks use
//! `Arc<Mutex<_>>` for interior mutability, allowing test assertions on
//! recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::error::AppError;
use crate::models::{Candidate, FetchedPage, NewCacheEntry};
use crate::traits::{Fetcher, PageCache, PageFetcher, Sink, Transformer};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock Extract stage returning a fixed body, with per-domain failures.
#[derive(Clone)]
pub struct MockFetcher {
    body: String,
    fail_domains: Arc<Mutex<Vec<String>>>,
    /// Domains fetched, in call order.
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn ok(body: &str) -> Self {
        Self {
            body: body.to_string(),
            fail_domains: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return a network error for this domain instead of the body.
    pub fn failing_for(self, domain: &str) -> Self {
        self.fail_domains.lock().unwrap().push(domain.to_string());
        self
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, domain: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(domain.to_string());
        if self.fail_domains.lock().unwrap().iter().any(|d| d == domain) {
            return Err(AppError::NetworkError(format!(
                "connection refused: {domain}"
            )));
        }
        Ok(self.body.clone())
    }
}

// ---------------------------------------------------------------------------
// MockTransformer
// ---------------------------------------------------------------------------

/// Mock Transform stage returning a fixed candidate list, with per-domain
/// failures.
#[derive(Clone)]
pub struct MockTransformer {
    candidates: Vec<Candidate>,
    fail_domains: Arc<Mutex<Vec<String>>>,
    /// Domains transformed, in call order.
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockTransformer {
    pub fn returning(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            fail_domains: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A transformer that always finds nothing.
    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing_for(self, domain: &str) -> Self {
        self.fail_domains.lock().unwrap().push(domain.to_string());
        self
    }
}

impl Transformer for MockTransformer {
    fn transform(&self, domain: &str, _body: &str) -> Result<Vec<Candidate>, AppError> {
        self.calls.lock().unwrap().push(domain.to_string());
        if self.fail_domains.lock().unwrap().iter().any(|d| d == domain) {
            return Err(AppError::TransformError(format!(
                "document processing failed for {domain}"
            )));
        }
        Ok(self.candidates.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Mock Load stage recording every insert.
#[derive(Clone, Default)]
pub struct RecordingSink {
    /// (domain, candidates) pairs, in insertion order.
    pub inserts: Arc<Mutex<Vec<(String, Vec<Candidate>)>>>,
    fail_domains: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(self, domain: &str) -> Self {
        self.fail_domains.lock().unwrap().push(domain.to_string());
        self
    }
}

impl Sink for RecordingSink {
    fn insert(&self, domain: &str, candidates: &[Candidate]) -> Result<(), AppError> {
        if self.fail_domains.lock().unwrap().iter().any(|d| d == domain) {
            return Err(AppError::SinkError(format!("write failed for {domain}")));
        }
        self.inserts
            .lock()
            .unwrap()
            .push((domain.to_string(), candidates.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

/// Mock raw page retrieval with a fixed response and a call counter.
#[derive(Clone)]
pub struct MockPageFetcher {
    body: String,
    status: u16,
    error: Arc<Mutex<Option<AppError>>>,
    /// Number of network calls made.
    pub calls: Arc<Mutex<usize>>,
}

impl MockPageFetcher {
    pub fn ok(body: &str, status: u16) -> Self {
        Self {
            body: body.to_string(),
            status,
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            body: String::new(),
            status: 0,
            error: Arc::new(Mutex::new(Some(error))),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl PageFetcher for MockPageFetcher {
    async fn get(&self, _domain: &str) -> Result<FetchedPage, AppError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(FetchedPage {
            body: self.body.clone(),
            status: self.status,
        })
    }
}

// ---------------------------------------------------------------------------
// MockPageCache
// ---------------------------------------------------------------------------

/// In-memory page cache with the same append-only/most-recent semantics as
/// the SQLite repository, plus injectable lookup/store errors.
#[derive(Clone, Default)]
pub struct MockPageCache {
    entries: Arc<Mutex<Vec<NewCacheEntry>>>,
    lookup_error: Arc<Mutex<Option<AppError>>>,
    store_error: Arc<Mutex<Option<AppError>>>,
}

impl MockPageCache {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cache pre-filled with a fresh entry for `domain`.
    pub fn with_entry(domain: &str, body: &str) -> Self {
        let cache = Self::default();
        cache.entries.lock().unwrap().push(NewCacheEntry {
            domain: domain.to_string(),
            body: body.to_string(),
            status: 200,
            retrieved_at: Utc::now(),
        });
        cache
    }

    /// Next lookup returns this error.
    pub fn with_lookup_error(self, error: AppError) -> Self {
        *self.lookup_error.lock().unwrap() = Some(error);
        self
    }

    /// Next store returns this error.
    pub fn with_store_error(self, error: AppError) -> Self {
        *self.store_error.lock().unwrap() = Some(error);
        self
    }

    /// Every entry ever stored, in insertion order.
    pub fn stored(&self) -> Vec<NewCacheEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl PageCache for MockPageCache {
    async fn lookup(&self, domain: &str, max_age: Duration) -> Result<Option<String>, AppError> {
        if let Some(e) = self.lookup_error.lock().unwrap().take() {
            return Err(e);
        }
        let cutoff =
            Utc::now() - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.domain == domain && e.retrieved_at >= cutoff)
            .max_by_key(|e| e.retrieved_at)
            .map(|e| e.body.clone()))
    }

    async fn store(&self, entry: &NewCacheEntry) -> Result<(), AppError> {
        if let Some(e) = self.store_error.lock().unwrap().take() {
            return Err(e);
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}
