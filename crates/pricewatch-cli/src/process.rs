//! `process`: load records, run the batch, record the run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pricewatch_core::{AppConfig, PriceResult, Stats};
use pricewatch_db::{MemoryResultStore, PgResultStore, ResultStore};
use pricewatch_pipeline::{format_price, BatchProcessor};
use pricewatch_scraper::PageFetcher;
use tokio_util::sync::CancellationToken;

use crate::fail_run_best_effort;

pub(crate) fn build_fetcher(config: &AppConfig) -> anyhow::Result<PageFetcher> {
    let fetcher = PageFetcher::new(
        Duration::from_secs(config.fetch_timeout_secs),
        &config.user_agent,
    )?
    .with_retries(config.max_retries, config.retry_backoff_base_ms);
    Ok(fetcher)
}

/// Processes the records file and upserts results into Postgres, tracking the
/// batch in `batch_runs`.
///
/// # Errors
///
/// Returns an error if the records file is invalid, the run cannot be
/// created, the batch is cancelled, or the result store fails. The run is
/// marked `failed` on a best-effort basis in the last two cases.
pub(crate) async fn run_process(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    records_path: &Path,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let records = pricewatch_core::load_records(records_path)?;
    if records.is_empty() {
        println!("no records in {}; skipping run creation", records_path.display());
        return Ok(());
    }

    let fetcher = build_fetcher(config)?;
    let store = Arc::new(PgResultStore::new(pool.clone()));
    let processor = BatchProcessor::new(fetcher, store, config.max_concurrency);

    let run = pricewatch_db::create_batch_run(pool).await?;
    if let Err(e) = pricewatch_db::start_batch_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(run_id = run.id, public_id = %run.public_id, records = records.len(), "batch run started");

    let results = match processor.process_batch_with_cancel(&records, cancel).await {
        Ok(results) => results,
        Err(e) => {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }
    };

    let stats = Stats::from_results(&results);
    let processed = i32::try_from(stats.total_records).unwrap_or(i32::MAX);
    let with_price = i32::try_from(stats.records_with_price).unwrap_or(i32::MAX);
    if let Err(err) = pricewatch_db::complete_batch_run(pool, run.id, processed, with_price).await {
        fail_run_best_effort(pool, run.id, format!("{err:#}")).await;
        return Err(err.into());
    }

    print_results(&results, json)?;
    Ok(())
}

/// Like [`run_process`] but against an in-memory store; nothing is written
/// to the database.
///
/// # Errors
///
/// Returns an error if the records file is invalid or the batch is cancelled.
pub(crate) async fn run_process_dry(
    config: &AppConfig,
    records_path: &Path,
    json: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let records = pricewatch_core::load_records(records_path)?;
    let store = Arc::new(MemoryResultStore::new());
    let processor = BatchProcessor::new(build_fetcher(config)?, Arc::clone(&store), config.max_concurrency);

    processor.process_batch_with_cancel(&records, cancel).await?;

    let results = store.all().await?;
    if !json {
        println!("dry-run: {} record(s) processed, nothing stored", results.len());
    }
    print_results(&results, json)
}

fn print_results(results: &[PriceResult], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    for result in results {
        println!("{}", crate::report::result_line(result));
    }

    let stats = Stats::from_results(results);
    println!(
        "processed {} record(s): {} with price, average {}",
        stats.total_records,
        stats.records_with_price,
        stats
            .average_price
            .map_or_else(|| "n/a".to_owned(), format_price)
    );
    Ok(())
}
