pub mod crawler;
pub mod selectors;
pub mod sink;

pub use crawler::{CachedCrawler, SiteFetcher};
pub use selectors::LogoTransformer;
pub use sink::CsvSink;
