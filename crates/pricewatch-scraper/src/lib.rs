pub mod error;
pub mod extract;
pub mod fetch;
pub mod metadata;
pub mod normalize;
mod retry;

pub use error::{NormalizeError, ScraperError};
pub use extract::{extract_price, locate_price, PriceTier};
pub use fetch::{FetchOutcome, PageFetcher};
pub use metadata::{extract_page_metadata, PageMetadata};
pub use normalize::normalize_price;

/// Parses an HTML document. html5ever recovers from malformed markup, so this
/// never fails; broken fragments simply yield fewer elements.
#[must_use]
pub fn parse_html(body: &str) -> scraper::Html {
    scraper::Html::parse_document(body)
}
