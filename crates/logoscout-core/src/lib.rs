pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod task;
pub mod testutil;
pub mod traits;

pub use config::PipelineConfig;
pub use error::AppError;
pub use metrics::{MetricsTracker, TaskMetrics};
pub use models::{Candidate, FetchedPage, LogoSource, NewCacheEntry};
pub use pipeline::{Pipeline, PipelineEvent, PipelineReporter, TracingReporter};
pub use task::{PipelineStatus, RunSummary, TaskStatus};
pub use traits::{Fetcher, NullSink, PageCache, PageFetcher, Sink, Transformer};
