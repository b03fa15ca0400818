//! Aggregate statistics over stored results.

use std::sync::Arc;

use pricewatch_core::{PriceResult, Stats};
use pricewatch_db::{DbError, ResultStore};

/// Read-only view over a [`ResultStore`].
pub struct StatisticsEngine<S> {
    store: Arc<S>,
}

impl<S: ResultStore> StatisticsEngine<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Computes [`Stats`] over every stored result. The aggregation runs
    /// inside the store, so no result rows are loaded.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    pub async fn compute(&self) -> Result<Stats, DbError> {
        self.store.stats().await
    }

    /// The `limit` most recently checked results, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot be read.
    pub async fn recent_prices(&self, limit: usize) -> Result<Vec<PriceResult>, DbError> {
        self.store.recent(limit).await
    }
}

/// Formats a price with two decimals and comma-grouped thousands:
/// `1234.5` → `"1,234.50"`.
#[must_use]
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let Some((whole, fraction)) = fixed.split_once('.') else {
        return fixed;
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && fixed != "0.00";
    format!("{}{grouped}.{fraction}", if negative { "-" } else { "" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pricewatch_core::ResultStatus;
    use pricewatch_db::MemoryResultStore;

    fn result(identity: &str, status: ResultStatus, price: Option<f64>) -> PriceResult {
        PriceResult {
            identity: identity.to_owned(),
            url: format!("https://shop.test/{identity}"),
            title: identity.to_owned(),
            description: String::new(),
            keywords: String::new(),
            status,
            price,
            raw_price: None,
            http_status: None,
            error_message: None,
            checked_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn empty_store_stats() {
        let engine = StatisticsEngine::new(Arc::new(MemoryResultStore::new()));
        let stats = engine.compute().await.unwrap();
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.records_with_price, 0);
        assert_eq!(stats.average_price, None);
    }

    #[test]
    fn formats_with_grouping_and_two_decimals() {
        assert_eq!(format_price(2500.0), "2,500.00");
        assert_eq!(format_price(1_234_567.891), "1,234,567.89");
        assert_eq!(format_price(999.999), "1,000.00");
        assert_eq!(format_price(0.5), "0.50");
        assert_eq!(format_price(-1234.5), "-1,234.50");
        assert_eq!(format_price(-0.001), "0.00");
    }

    #[tokio::test]
    async fn engine_reads_through_store() {
        let store = Arc::new(MemoryResultStore::new());
        store
            .upsert(&result("a", ResultStatus::Success, Some(10.0)))
            .await
            .unwrap();
        store
            .upsert(&result("b", ResultStatus::Success, Some(30.0)))
            .await
            .unwrap();
        store
            .upsert(&result("c", ResultStatus::HttpError, None))
            .await
            .unwrap();

        let engine = StatisticsEngine::new(Arc::clone(&store));
        let stats = engine.compute().await.unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.records_with_price, 2);
        assert_eq!(stats.average_price, Some(20.0));

        assert_eq!(engine.recent_prices(1).await.unwrap().len(), 1);
    }
}
