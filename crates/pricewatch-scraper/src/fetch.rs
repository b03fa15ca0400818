//! Single-page HTTP fetch with typed outcomes.

use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;
use crate::retry::retry_fetch;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of fetching one page. Failures are values, not errors: a record
/// whose page cannot be fetched still produces a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { body: String, status_code: u16 },
    HttpError { status_code: u16 },
    NetworkError { cause: String },
}

impl FetchOutcome {
    /// Transport failures, 429 and 5xx may succeed on a later attempt.
    pub(crate) fn is_retriable(&self) -> bool {
        match self {
            FetchOutcome::Success { .. } => false,
            FetchOutcome::HttpError { status_code } => *status_code == 429 || *status_code >= 500,
            FetchOutcome::NetworkError { .. } => true,
        }
    }
}

impl std::fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOutcome::Success { status_code, .. } => write!(f, "HTTP {status_code} ok"),
            FetchOutcome::HttpError { status_code } => write!(f, "HTTP {status_code}"),
            FetchOutcome::NetworkError { cause } => write!(f, "network error: {cause}"),
        }
    }
}

/// Fetches product pages with a browser-like header set and a hard timeout.
///
/// By default every URL gets exactly one attempt. [`PageFetcher::with_retries`]
/// enables exponential backoff for network errors, 429 and 5xx.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PageFetcher {
    /// Creates a `PageFetcher` whose requests (including the body download)
    /// are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Allows up to `max_retries` further attempts on transient failures,
    /// waiting roughly `backoff_base_ms * 2^(n-1)` before the n-th retry.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        self.fetch_with_cancel(url, &CancellationToken::new()).await
    }

    /// Fetches `url`, giving up early with a `NetworkError` if `cancel` fires.
    pub async fn fetch_with_cancel(&self, url: &str, cancel: &CancellationToken) -> FetchOutcome {
        retry_fetch(self.max_retries, self.backoff_base_ms, cancel, || {
            self.fetch_once(url, cancel)
        })
        .await
    }

    async fn fetch_once(&self, url: &str, cancel: &CancellationToken) -> FetchOutcome {
        tokio::select! {
            biased;
            () = cancel.cancelled() => FetchOutcome::NetworkError {
                cause: "request cancelled".to_owned(),
            },
            outcome = self.request(url) => outcome,
        }
    }

    async fn request(&self, url: &str) -> FetchOutcome {
        let response = match self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(
                reqwest::header::ACCEPT_LANGUAGE,
                "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7",
            )
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return FetchOutcome::NetworkError {
                    cause: describe_transport_error(&e),
                }
            }
        };

        let status_code = response.status().as_u16();
        if status_code >= 400 {
            return FetchOutcome::HttpError { status_code };
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Success { body, status_code },
            Err(e) => FetchOutcome::NetworkError {
                cause: describe_transport_error(&e),
            },
        }
    }
}

/// Flattens a reqwest error and its source chain into one line, prefixed
/// with the failure kind.
fn describe_transport_error(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() || err.is_decode() {
        "body"
    } else {
        "request"
    };

    let mut cause = format!("{kind}: {err}");
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        cause.push_str(": ");
        cause.push_str(&inner.to_string());
        source = inner.source();
    }
    cause
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_outcomes() {
        assert!(FetchOutcome::NetworkError {
            cause: "timeout".to_owned()
        }
        .is_retriable());
        assert!(FetchOutcome::HttpError { status_code: 429 }.is_retriable());
        assert!(FetchOutcome::HttpError { status_code: 503 }.is_retriable());
        assert!(!FetchOutcome::HttpError { status_code: 404 }.is_retriable());
        assert!(!FetchOutcome::Success {
            body: String::new(),
            status_code: 200
        }
        .is_retriable());
    }

    #[test]
    fn display_is_short() {
        assert_eq!(
            FetchOutcome::HttpError { status_code: 404 }.to_string(),
            "HTTP 404"
        );
        assert_eq!(
            FetchOutcome::NetworkError {
                cause: "connect: refused".to_owned()
            }
            .to_string(),
            "network error: connect: refused"
        );
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let fetcher = PageFetcher::new(Duration::from_secs(5), "pricewatch-test/0.1").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Port 9 (discard) on a TEST-NET address would hang; cancellation must win first.
        let outcome = fetcher
            .fetch_with_cancel("http://192.0.2.1:9/", &cancel)
            .await;
        assert_eq!(
            outcome,
            FetchOutcome::NetworkError {
                cause: "request cancelled".to_owned()
            }
        );
    }
}
