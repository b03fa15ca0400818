use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of processing one record.
///
/// `Success` and `NoPriceFound` both mean the page was fetched; they differ
/// only in whether a normalized price came out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    HttpError,
    NetworkError,
    NoPriceFound,
}

impl ResultStatus {
    /// Stable string form used for persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Success => "success",
            ResultStatus::HttpError => "http_error",
            ResultStatus::NetworkError => "network_error",
            ResultStatus::NoPriceFound => "no_price_found",
        }
    }

    /// Returns `true` when the page itself was fetched, whether or not a
    /// price was found on it.
    #[must_use]
    pub fn is_fetch_success(self) -> bool {
        matches!(self, ResultStatus::Success | ResultStatus::NoPriceFound)
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ResultStatus::Success),
            "http_error" => Ok(ResultStatus::HttpError),
            "network_error" => Ok(ResultStatus::NetworkError),
            "no_price_found" => Ok(ResultStatus::NoPriceFound),
            other => Err(format!("unknown result status \"{other}\"")),
        }
    }
}

/// Price text located on a page. `raw` is kept even when it does not
/// normalize, so a bad match can be diagnosed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPrice {
    pub raw: String,
    pub normalized: Option<f64>,
}

/// Processed result for one record; the unit the result store upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub identity: String,
    pub url: String,
    pub title: String,
    /// `<meta name="description">` content, empty when absent or not fetched.
    pub description: String,
    /// `<meta name="keywords">` content, empty when absent or not fetched.
    pub keywords: String,
    pub status: ResultStatus,
    pub price: Option<f64>,
    pub raw_price: Option<String>,
    pub http_status: Option<u16>,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl PriceResult {
    /// Returns `true` if the fetch succeeded and a finite price was extracted.
    #[must_use]
    pub fn has_price(&self) -> bool {
        self.status.is_fetch_success() && self.price.is_some_and(f64::is_finite)
    }
}

/// Aggregate statistics over every stored result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_records: usize,
    pub records_with_price: usize,
    /// `None` when no stored result has a price.
    pub average_price: Option<f64>,
}

impl Stats {
    /// Counts every result and averages the price over those that were
    /// fetched and carry a finite price.
    #[must_use]
    pub fn from_results(results: &[PriceResult]) -> Self {
        let prices: Vec<f64> = results
            .iter()
            .filter(|r| r.has_price())
            .filter_map(|r| r.price)
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let average_price = if prices.is_empty() {
            None
        } else {
            Some(prices.iter().sum::<f64>() / prices.len() as f64)
        };

        Self {
            total_records: results.len(),
            records_with_price: prices.len(),
            average_price,
        }
    }
}
