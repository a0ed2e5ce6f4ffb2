use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use logoscout_core::error::AppError;
use logoscout_core::models::Candidate;
use logoscout_core::traits::Sink;

/// The Load stage: accumulates results in memory and streams one CSV row per
/// domain that found at least one candidate.
///
/// One mutex guards both the accumulation map and the writer, so concurrent
/// workers can never interleave partial rows. The header row is written at
/// construction.
pub struct CsvSink<W: Write + Send> {
    inner: Arc<Mutex<CsvSinkInner<W>>>,
}

impl<W: Write + Send> Clone for CsvSink<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CsvSinkInner<W: Write> {
    writer: csv::Writer<W>,
    results: HashMap<String, Vec<Candidate>>,
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new(writer: W) -> Result<Self, AppError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(["domain", "logo", "source"])
            .map_err(|e| AppError::SinkError(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| AppError::SinkError(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Mutex::new(CsvSinkInner {
                writer,
                results: HashMap::new(),
            })),
        })
    }

    /// Snapshot of every accumulated result, keyed by domain.
    pub fn results(&self) -> HashMap<String, Vec<Candidate>> {
        self.inner.lock().unwrap().results.clone()
    }
}

impl CsvSink<std::io::Stdout> {
    pub fn stdout() -> Result<Self, AppError> {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Sink for CsvSink<W> {
    fn insert(&self, domain: &str, candidates: &[Candidate]) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .results
            .insert(domain.to_string(), candidates.to_vec());

        // First candidate wins; an empty sequence emits nothing at all.
        let Some(first) = candidates.first() else {
            tracing::debug!(%domain, "No logos found, skipping output row");
            return Ok(());
        };
        inner
            .writer
            .write_record([domain, first.url.as_str(), first.source.as_str()])
            .map_err(|e| AppError::SinkError(e.to_string()))?;
        inner
            .writer
            .flush()
            .map_err(|e| AppError::SinkError(e.to_string()))
    }
}
