use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::metrics::MetricsTracker;
use crate::task::{PipelineStatus, RunSummary, TaskStatus};
use crate::traits::{Fetcher, Sink, Transformer};

/// Events emitted by the pipeline for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    Started {
        pipeline: &'a str,
        total: usize,
    },
    TaskStarted {
        domain: &'a str,
    },
    TaskCompleted {
        domain: &'a str,
        candidates: usize,
    },
    TaskFailed {
        domain: &'a str,
        stage: TaskStatus,
        error: &'a str,
    },
    /// A worker died outside any stage boundary (dispatch-layer fault).
    DispatchError {
        domain: &'a str,
        error: &'a str,
    },
    Interrupted {
        dispatched: usize,
        skipped: usize,
    },
    Finished {
        summary: &'a RunSummary,
    },
}

/// Trait for receiving pipeline events (decoupled logging).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::Started { pipeline, total } => {
                tracing::info!(%pipeline, %total, "Pipeline runner started");
            }
            PipelineEvent::TaskStarted { domain } => {
                tracing::debug!(%domain, "Running task");
            }
            PipelineEvent::TaskCompleted { domain, candidates } => {
                tracing::debug!(%domain, %candidates, "Completed task");
            }
            PipelineEvent::TaskFailed {
                domain,
                stage,
                error,
            } => {
                tracing::warn!(%domain, %stage, %error, "Task failed");
            }
            PipelineEvent::DispatchError { domain, error } => {
                tracing::error!(%domain, %error, "Worker fault");
            }
            PipelineEvent::Interrupted {
                dispatched,
                skipped,
            } => {
                tracing::info!(%dispatched, %skipped, "Interrupted, no longer accepting tasks");
            }
            PipelineEvent::Finished { summary } => {
                tracing::info!(
                    total = summary.total,
                    dispatched = summary.dispatched,
                    completed = summary.completed,
                    failed = summary.failed,
                    "Pipeline run complete"
                );
            }
        }
    }
}

/// Drives a bounded pool of workers over the task queue: for each domain,
/// Extract → Transform → Load, with per-task status/metrics tracking.
///
/// Failures never escape a task's boundary: a stage error marks that task
/// failed and the run continues. Depends only on the three stage traits, so
/// any fetcher/transformer/sink combination can be orchestrated.
pub struct Pipeline<F, T, S>
where
    F: Fetcher,
    T: Transformer,
    S: Sink,
{
    config: PipelineConfig,
    fetcher: F,
    transformer: T,
    sink: S,
    metrics: Arc<MetricsTracker>,
    status: PipelineStatus,
}

impl<F, T, S> Pipeline<F, T, S>
where
    F: Fetcher + 'static,
    T: Transformer + 'static,
    S: Sink + 'static,
{
    pub fn new(config: PipelineConfig, fetcher: F, transformer: T, sink: S) -> Result<Self, AppError> {
        if config.workers == 0 {
            return Err(AppError::ConfigError(
                "worker count must be at least 1".into(),
            ));
        }
        Ok(Self {
            config,
            fetcher,
            transformer,
            sink,
            metrics: Arc::new(MetricsTracker::new()),
            status: PipelineStatus::Idle,
        })
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// The per-task ledger, retained after the run for reporting.
    pub fn metrics(&self) -> Arc<MetricsTracker> {
        Arc::clone(&self.metrics)
    }

    /// Process every domain and block until all admitted tasks have reached
    /// a terminal state. Cancelling `cancel` stops admission of new tasks;
    /// in-flight tasks run to completion.
    pub async fn run<R>(
        &mut self,
        domains: Vec<String>,
        cancel: CancellationToken,
        reporter: Arc<R>,
    ) -> RunSummary
    where
        R: PipelineReporter + 'static,
    {
        self.status = PipelineStatus::Running;
        let total = domains.len();
        reporter.report(PipelineEvent::Started {
            pipeline: &self.config.name,
            total,
        });

        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut handles = Vec::with_capacity(total);

        for domain in domains {
            // Admission control: take a pool slot, unless interrupted first.
            // Biased so a pending interrupt always wins over a free slot.
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    match permit {
                        Ok(p) => p,
                        Err(_) => break,
                    }
                }
            };

            let fetcher = self.fetcher.clone();
            let transformer = self.transformer.clone();
            let sink = self.sink.clone();
            let metrics = Arc::clone(&self.metrics);
            let reporter = Arc::clone(&reporter);
            let task_domain = domain.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                process_task(
                    &task_domain,
                    &fetcher,
                    &transformer,
                    &sink,
                    &metrics,
                    reporter.as_ref(),
                )
                .await;
            });
            handles.push((domain, handle));
        }

        let dispatched = handles.len();
        if dispatched < total {
            reporter.report(PipelineEvent::Interrupted {
                dispatched,
                skipped: total - dispatched,
            });
        }

        for (domain, handle) in handles {
            if let Err(join_err) = handle.await {
                // The worker itself died (panic/abort), not a stage error.
                let msg = join_err.to_string();
                reporter.report(PipelineEvent::DispatchError {
                    domain: &domain,
                    error: &msg,
                });
                self.metrics.failed(&domain);
            }
        }

        let failed = self
            .metrics
            .snapshot()
            .values()
            .filter(|m| m.is_failed())
            .count();
        let summary = RunSummary {
            total,
            dispatched,
            completed: dispatched.saturating_sub(failed),
            failed,
        };

        self.status = PipelineStatus::Complete;
        reporter.report(PipelineEvent::Finished { summary: &summary });
        summary
    }
}

/// One task's fixed stage sequence. Every stage error is absorbed here and
/// converted to a Failed status; nothing propagates to sibling tasks.
async fn process_task<F, T, S, R>(
    domain: &str,
    fetcher: &F,
    transformer: &T,
    sink: &S,
    metrics: &MetricsTracker,
    reporter: &R,
) where
    F: Fetcher,
    T: Transformer,
    S: Sink,
    R: PipelineReporter + ?Sized,
{
    reporter.report(PipelineEvent::TaskStarted { domain });

    metrics.start(domain, TaskStatus::Extracting);
    let body = match fetcher.fetch(domain).await {
        Ok(body) => body,
        Err(e) => {
            fail_task(domain, TaskStatus::Extracting, &e, metrics, reporter);
            return;
        }
    };
    tracing::debug!(%domain, kb = body.len() / 1024, "Extracted page body");

    metrics.set_status(domain, TaskStatus::Transforming);
    let candidates = match transformer.transform(domain, &body) {
        Ok(candidates) => candidates,
        Err(e) => {
            fail_task(domain, TaskStatus::Transforming, &e, metrics, reporter);
            return;
        }
    };

    metrics.set_status(domain, TaskStatus::Loading);
    if let Err(e) = sink.insert(domain, &candidates) {
        fail_task(domain, TaskStatus::Loading, &e, metrics, reporter);
        return;
    }
    metrics.end(domain);

    reporter.report(PipelineEvent::TaskCompleted {
        domain,
        candidates: candidates.len(),
    });
}

fn fail_task<R>(
    domain: &str,
    stage: TaskStatus,
    error: &AppError,
    metrics: &MetricsTracker,
    reporter: &R,
) where
    R: PipelineReporter + ?Sized,
{
    metrics.failed(domain);
    let msg = error.to_string();
    reporter.report(PipelineEvent::TaskFailed {
        domain,
        stage,
        error: &msg,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, LogoSource};
    use crate::testutil::{MockFetcher, MockTransformer, RecordingSink};

    fn domains(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn one_candidate() -> Vec<Candidate> {
        vec![Candidate::new(
            LogoSource::OgImage,
            "http://example.com/logo.png",
        )]
    }

    #[tokio::test]
    async fn happy_path_completes_all_tasks() {
        let sink = RecordingSink::new();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            MockFetcher::ok("<html></html>"),
            MockTransformer::returning(one_candidate()),
            sink.clone(),
        )
        .unwrap();

        assert_eq!(pipeline.status(), PipelineStatus::Idle);
        let summary = pipeline
            .run(
                domains(&["a.com", "b.com", "c.com"]),
                CancellationToken::new(),
                Arc::new(TracingReporter),
            )
            .await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.dispatched, 3);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(pipeline.status(), PipelineStatus::Complete);
        assert_eq!(sink.inserts.lock().unwrap().len(), 3);
        assert_eq!(pipeline.metrics().len(), 3);
    }

    #[tokio::test]
    async fn transform_failure_is_isolated() {
        let sink = RecordingSink::new();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            MockFetcher::ok("<html></html>"),
            MockTransformer::returning(one_candidate()).failing_for("c.com"),
            sink.clone(),
        )
        .unwrap();

        let summary = pipeline
            .run(
                domains(&["a.com", "b.com", "c.com", "d.com", "e.com"]),
                CancellationToken::new(),
                Arc::new(TracingReporter),
            )
            .await;

        assert_eq!(summary.dispatched, 5);
        assert_eq!(summary.completed, 4);
        assert_eq!(summary.failed, 1);

        let metrics = pipeline.metrics();
        let failed = metrics.get("c.com").unwrap();
        assert!(failed.is_failed());
        assert!(failed.transforming_secs <= 0.0);
        assert!(failed.extracting_secs >= 0.0);

        // No output row for the failed task.
        let inserts = sink.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 4);
        assert!(inserts.iter().all(|(d, _)| d != "c.com"));
    }

    #[tokio::test]
    async fn extract_failure_skips_transform() {
        let transformer = MockTransformer::returning(one_candidate());
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            MockFetcher::ok("<html></html>").failing_for("down.com"),
            transformer.clone(),
            RecordingSink::new(),
        )
        .unwrap();

        let summary = pipeline
            .run(
                domains(&["down.com"]),
                CancellationToken::new(),
                Arc::new(TracingReporter),
            )
            .await;

        assert_eq!(summary.failed, 1);
        assert!(transformer.calls.lock().unwrap().is_empty());
        let metrics = pipeline.metrics().get("down.com").unwrap();
        assert!(metrics.is_failed());
        assert!(metrics.extracting_secs <= 0.0);
    }

    #[tokio::test]
    async fn empty_candidates_is_not_a_failure() {
        let sink = RecordingSink::new();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            MockFetcher::ok("<html></html>"),
            MockTransformer::empty(),
            sink.clone(),
        )
        .unwrap();

        let summary = pipeline
            .run(
                domains(&["a.com"]),
                CancellationToken::new(),
                Arc::new(TracingReporter),
            )
            .await;

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 0);
        let inserts = sink.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 1);
        assert!(inserts[0].1.is_empty());
    }

    #[tokio::test]
    async fn sink_failure_marks_task_failed_at_loading() {
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            MockFetcher::ok("<html></html>"),
            MockTransformer::returning(one_candidate()),
            RecordingSink::new().failing_for("a.com"),
        )
        .unwrap();

        let summary = pipeline
            .run(
                domains(&["a.com"]),
                CancellationToken::new(),
                Arc::new(TracingReporter),
            )
            .await;

        assert_eq!(summary.failed, 1);
        let metrics = pipeline.metrics().get("a.com").unwrap();
        assert!(metrics.is_failed());
        assert!(metrics.loading_secs <= 0.0);
    }

    #[tokio::test]
    async fn concurrent_run_tracks_every_task_once() {
        let sink = RecordingSink::new();
        let names: Vec<String> = (0..20).map(|i| format!("site{i}.example")).collect();
        let mut pipeline = Pipeline::new(
            PipelineConfig::default().with_workers(4),
            MockFetcher::ok("<html></html>"),
            MockTransformer::returning(one_candidate()),
            sink.clone(),
        )
        .unwrap();

        let summary = pipeline
            .run(
                names.clone(),
                CancellationToken::new(),
                Arc::new(TracingReporter),
            )
            .await;

        assert_eq!(summary.completed, 20);
        assert_eq!(pipeline.metrics().len(), 20);
        assert_eq!(sink.inserts.lock().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn cancelled_token_stops_admission() {
        let sink = RecordingSink::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            MockFetcher::ok("<html></html>"),
            MockTransformer::returning(one_candidate()),
            sink.clone(),
        )
        .unwrap();

        let summary = pipeline
            .run(
                domains(&["a.com", "b.com"]),
                cancel,
                Arc::new(TracingReporter),
            )
            .await;

        assert_eq!(summary.total, 2);
        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.completed, 0);
        assert!(pipeline.metrics().is_empty());
        assert!(sink.inserts.lock().unwrap().is_empty());
        assert_eq!(pipeline.status(), PipelineStatus::Complete);
    }

    #[tokio::test]
    async fn null_sink_discards_output() {
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            MockFetcher::ok("<html></html>"),
            MockTransformer::returning(one_candidate()),
            crate::traits::NullSink,
        )
        .unwrap();

        let summary = pipeline
            .run(
                domains(&["a.com"]),
                CancellationToken::new(),
                Arc::new(TracingReporter),
            )
            .await;

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let result = Pipeline::new(
            PipelineConfig::default().with_workers(0),
            MockFetcher::ok(""),
            MockTransformer::empty(),
            RecordingSink::new(),
        );
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
