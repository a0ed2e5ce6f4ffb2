use std::fs::File;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use logoscout_client::{CachedCrawler, CsvSink, LogoTransformer, SiteFetcher};
use logoscout_core::config::PipelineConfig;
use logoscout_core::metrics::MetricsTracker;
use logoscout_core::pipeline::{Pipeline, TracingReporter};
use logoscout_db::Database;

#[derive(Parser)]
#[command(
    name = "logoscout",
    version,
    about = "Extract canonical logo URLs for a list of domains read from stdin"
)]
struct Cli {
    /// Pipeline identifier used in logs
    #[arg(long, env = "LOGOSCOUT_NAME", default_value = "logo-extractor")]
    name: String,

    /// SQLite file backing the page cache
    #[arg(long, env = "LOGOSCOUT_CACHE_DB", default_value = "./websites.sqlite")]
    cache_db: PathBuf,

    /// Log file destination (stdout is reserved for CSV output)
    #[arg(long, env = "LOGOSCOUT_LOG", default_value = "./debug.log")]
    log_file: PathBuf,

    /// Cache freshness window in seconds
    #[arg(long, env = "LOGOSCOUT_MAX_CACHE_AGE", default_value_t = 604_800)]
    max_cache_age: u64,

    /// Worker pool size
    #[arg(long, env = "LOGOSCOUT_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Stop the selector chain at the first match per domain
    #[arg(long, env = "LOGOSCOUT_EAGER", default_value_t = false)]
    eager: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = PipelineConfig::default()
        .with_name(cli.name)
        .with_cache_db(cli.cache_db)
        .with_log_file(cli.log_file)
        .with_max_cache_age(Duration::from_secs(cli.max_cache_age))
        .with_workers(cli.workers);

    // Logs go to a file so stdout stays clean CSV.
    let log_file = File::options()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .init();

    let domains = read_domains(std::io::stdin().lock())?;
    if domains.is_empty() {
        tracing::info!("No domains on stdin, nothing to do");
        return Ok(());
    }

    let db = Database::connect(&config.cache_db).await?;
    db.init_schema().await?;

    let crawler = CachedCrawler::new(SiteFetcher::new()?, db.page_cache(), config.max_cache_age);
    let transformer = LogoTransformer::with_eager(cli.eager)?;
    let sink = CsvSink::stdout()?;

    // Interrupt stops admission of new tasks; in-flight tasks finish.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received interrupt, shutting down");
            interrupt.cancel();
        }
    });

    let mut pipeline = Pipeline::new(config, crawler, transformer, sink)?;
    pipeline
        .run(domains, cancel.clone(), Arc::new(TracingReporter))
        .await;
    report(&pipeline.metrics());

    db.close().await;
    if cancel.is_cancelled() {
        tracing::info!("Run interrupted, cache closed. Exiting");
    }

    Ok(())
}

/// One domain per line until end-of-input; whitespace trimmed, blanks
/// skipped.
fn read_domains(reader: impl BufRead) -> Result<Vec<String>> {
    let mut domains = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read stdin")?;
        let domain = line.trim();
        if !domain.is_empty() {
            domains.push(domain.to_string());
        }
    }
    Ok(domains)
}

/// Per-task stage timings for the run, negative seconds marking the stage a
/// task failed in.
fn report(metrics: &MetricsTracker) {
    for (domain, task) in metrics.snapshot() {
        tracing::debug!(
            %domain,
            status = ?task.status,
            extracting = task.extracting_secs,
            transforming = task.transforming_secs,
            loading = task.loading_secs,
            "Task metrics"
        );
    }
}
