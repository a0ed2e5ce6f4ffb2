use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{Candidate, FetchedPage, NewCacheEntry};

/// Extract stage: produce the HTML body for a domain.
///
/// An `Err` is the "nothing extracted" outcome — the orchestrator marks the
/// task failed and moves on. Implementations decide whether a cache sits in
/// front of the network.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, domain: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Transform stage: run the extraction strategies over a page body.
///
/// An empty vector is a valid "no candidates" outcome and is distinct from
/// `Err`, which fails the task.
pub trait Transformer: Send + Sync + Clone {
    fn transform(&self, domain: &str, body: &str) -> Result<Vec<Candidate>, AppError>;
}

/// Load stage: accept a task's final candidate sequence.
pub trait Sink: Send + Sync + Clone {
    fn insert(&self, domain: &str, candidates: &[Candidate]) -> Result<(), AppError>;
}

/// Raw single-shot page retrieval, no caching. Exactly one network request
/// per call.
pub trait PageFetcher: Send + Sync + Clone {
    fn get(&self, domain: &str) -> impl Future<Output = Result<FetchedPage, AppError>> + Send;
}

/// TTL-keyed store of fetched page bodies, shared by every worker.
///
/// `store` is append-only; `lookup` serves the most recent entry younger than
/// `max_age`. Callers treat errors from either as an absent cache, never as a
/// task failure.
pub trait PageCache: Send + Sync + Clone {
    fn lookup(
        &self,
        domain: &str,
        max_age: Duration,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    fn store(&self, entry: &NewCacheEntry) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A no-op Sink for runs that need no output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn insert(&self, _domain: &str, _candidates: &[Candidate]) -> Result<(), AppError> {
        Ok(())
    }
}
