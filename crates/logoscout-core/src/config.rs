use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration for one pipeline run.
///
/// Constructed once (from CLI flags / environment) and passed down; never
/// mutated while the run is in flight.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pipeline identifier used in logs.
    pub name: String,
    /// SQLite file backing the page cache.
    pub cache_db: PathBuf,
    /// Log file destination (stdout is reserved for CSV output).
    pub log_file: PathBuf,
    /// Freshness window: maximum age of a cached page body still served
    /// without a network fetch.
    pub max_cache_age: Duration,
    /// Bounded worker-pool size.
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "logo-extractor".to_string(),
            cache_db: PathBuf::from("./websites.sqlite"),
            log_file: PathBuf::from("./debug.log"),
            max_cache_age: Duration::from_secs(60 * 60 * 24 * 7),
            workers: 4,
        }
    }
}

impl PipelineConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cache_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_db = path.into();
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    pub fn with_max_cache_age(mut self, max_age: Duration) -> Self {
        self.max_cache_age = max_age;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}
