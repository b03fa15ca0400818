//! Read-only reporting commands: `stats`, `recent`, `runs`.

use std::sync::Arc;

use pricewatch_core::PriceResult;
use pricewatch_db::PgResultStore;
use pricewatch_pipeline::{format_price, StatisticsEngine};

pub(crate) async fn run_stats(pool: &sqlx::PgPool, json: bool) -> anyhow::Result<()> {
    let engine = StatisticsEngine::new(Arc::new(PgResultStore::new(pool.clone())));
    let stats = engine.compute().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Records processed:  {}", stats.total_records);
    println!("Records with price: {}", stats.records_with_price);
    println!(
        "Average price:      {}",
        stats
            .average_price
            .map_or_else(|| "n/a".to_owned(), format_price)
    );
    Ok(())
}

pub(crate) async fn run_recent(pool: &sqlx::PgPool, limit: usize, json: bool) -> anyhow::Result<()> {
    let engine = StatisticsEngine::new(Arc::new(PgResultStore::new(pool.clone())));
    let results = engine.recent_prices(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("no results stored yet");
        return Ok(());
    }
    for result in &results {
        println!("{}", result_line(result));
    }
    Ok(())
}

pub(crate) async fn run_runs(pool: &sqlx::PgPool, limit: usize) -> anyhow::Result<()> {
    let runs = pricewatch_db::list_batch_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no batch runs recorded");
        return Ok(());
    }

    for run in &runs {
        let mut line = format!(
            "{}  {:<9}  {} processed, {} with price  created {}",
            run.public_id,
            run.status,
            run.records_processed,
            run.records_with_price,
            run.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        if let Some(error) = &run.error_message {
            line.push_str("  error: ");
            line.push_str(error);
        }
        println!("{line}");
    }
    Ok(())
}

/// One-line human summary of a result.
pub(crate) fn result_line(result: &PriceResult) -> String {
    let detail = match (result.price, result.http_status, &result.error_message) {
        (Some(price), _, _) => format_price(price),
        (None, _, Some(error)) => error.clone(),
        (None, Some(code), None) => format!("HTTP {code}"),
        (None, None, None) => "-".to_owned(),
    };
    format!(
        "{:<14}  {:<40}  {}  {}",
        result.status.as_str(),
        truncate(&result.title, 40),
        detail,
        result.url
    )
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
