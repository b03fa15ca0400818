use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Why a piece of price text could not be turned into a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("no numeric content in price text \"{raw}\"")]
    Empty { raw: String },

    #[error("price text \"{raw}\" normalized to \"{normalized}\", which is not a finite number")]
    NotNumeric { raw: String, normalized: String },
}
