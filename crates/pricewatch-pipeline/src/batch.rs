//! Concurrent fetch-and-extract over a batch of records.
//!
//! Each record is handled independently: a fetch failure or a page without a
//! price becomes that record's result and never touches the others. Only a
//! result store failure (or cancellation) aborts the batch.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use pricewatch_core::{PriceResult, Record, ResultStatus};
use pricewatch_db::ResultStore;
use pricewatch_scraper::{extract_page_metadata, locate_price, parse_html, FetchOutcome, PageFetcher};
use tokio_util::sync::CancellationToken;

use crate::BatchError;

/// Upper bound on in-flight fetches per batch.
pub const MAX_CONCURRENCY: usize = 50;

pub struct BatchProcessor<S> {
    fetcher: PageFetcher,
    store: Arc<S>,
    max_concurrency: usize,
}

impl<S: ResultStore> BatchProcessor<S> {
    /// `max_concurrency` is clamped to `1..=MAX_CONCURRENCY`.
    #[must_use]
    pub fn new(fetcher: PageFetcher, store: Arc<S>, max_concurrency: usize) -> Self {
        Self {
            fetcher,
            store,
            max_concurrency: max_concurrency.clamp(1, MAX_CONCURRENCY),
        }
    }

    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Processes every record and upserts its result.
    ///
    /// Returns one result per record, in completion order.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::DuplicateIdentity`] before any fetch if two
    /// records share an identity, or [`BatchError::Store`] if an upsert fails.
    pub async fn process_batch(&self, records: &[Record]) -> Result<Vec<PriceResult>, BatchError> {
        self.process_batch_with_cancel(records, &CancellationToken::new())
            .await
    }

    /// Like [`process_batch`](Self::process_batch), stopping early when
    /// `cancel` fires. Results already upserted stay stored; nothing further
    /// is written after cancellation is observed.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Cancelled`] if `cancel` fires before the batch
    /// finishes, plus the errors of [`process_batch`](Self::process_batch).
    pub async fn process_batch_with_cancel(
        &self,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> Result<Vec<PriceResult>, BatchError> {
        ensure_unique_identities(records)?;

        tracing::info!(
            records = records.len(),
            max_concurrency = self.max_concurrency,
            "processing batch"
        );

        let results: Vec<PriceResult> = stream::iter(records)
            .map(|record| self.process_and_store(record, cancel))
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await?;

        let with_price = results.iter().filter(|r| r.has_price()).count();
        tracing::info!(
            processed = results.len(),
            with_price,
            "batch complete"
        );

        Ok(results)
    }

    async fn process_and_store(
        &self,
        record: &Record,
        cancel: &CancellationToken,
    ) -> Result<PriceResult, BatchError> {
        if cancel.is_cancelled() {
            return Err(BatchError::Cancelled);
        }

        let outcome = self.fetcher.fetch_with_cancel(&record.url, cancel).await;
        if cancel.is_cancelled() {
            return Err(BatchError::Cancelled);
        }

        let result = build_result(record, outcome, Utc::now());
        log_result(&result);
        self.store.upsert(&result).await?;
        Ok(result)
    }
}

fn ensure_unique_identities(records: &[Record]) -> Result<(), BatchError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.identity.as_str()) {
            return Err(BatchError::DuplicateIdentity {
                identity: record.identity.clone(),
            });
        }
    }
    Ok(())
}

/// Turns a fetch outcome into the record's result.
///
/// On success the page title replaces the record's title unless the page has
/// none.
fn build_result(record: &Record, outcome: FetchOutcome, checked_at: DateTime<Utc>) -> PriceResult {
    let mut result = PriceResult {
        identity: record.identity.clone(),
        url: record.url.clone(),
        title: record.title.clone(),
        description: String::new(),
        keywords: String::new(),
        status: ResultStatus::NoPriceFound,
        price: None,
        raw_price: None,
        http_status: None,
        error_message: None,
        checked_at,
    };

    match outcome {
        FetchOutcome::Success { body, status_code } => {
            // Html is not Send; keep it inside this synchronous block.
            let (metadata, located) = {
                let document = parse_html(&body);
                (
                    extract_page_metadata(&document),
                    locate_price(&document, &record.selector),
                )
            };

            if !metadata.title.is_empty() {
                result.title = metadata.title;
            }
            result.description = metadata.description;
            result.keywords = metadata.keywords;
            result.http_status = Some(status_code);

            if let Some((tier, price)) = located {
                tracing::debug!(identity = %record.identity, ?tier, raw = %price.raw, "price located");
                result.price = price.normalized;
                result.raw_price = Some(price.raw);
            }
            if result.price.is_some() {
                result.status = ResultStatus::Success;
            }
        }
        FetchOutcome::HttpError { status_code } => {
            result.status = ResultStatus::HttpError;
            result.http_status = Some(status_code);
        }
        FetchOutcome::NetworkError { cause } => {
            result.status = ResultStatus::NetworkError;
            result.error_message = Some(cause);
        }
    }

    result
}

fn log_result(result: &PriceResult) {
    match result.status {
        ResultStatus::Success | ResultStatus::NoPriceFound => tracing::info!(
            identity = %result.identity,
            url = %result.url,
            status = %result.status,
            price = ?result.price,
            "record processed"
        ),
        ResultStatus::HttpError | ResultStatus::NetworkError => tracing::warn!(
            identity = %result.identity,
            url = %result.url,
            status = %result.status,
            http_status = ?result.http_status,
            error = result.error_message.as_deref().unwrap_or(""),
            "record fetch failed"
        ),
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
