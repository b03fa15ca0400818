//! Input records and their stable identities.
//!
//! A record's identity is what the result store upserts on, so it must come
//! out the same every time the same logical record is processed. Callers may
//! supply an explicit `key`; otherwise the identity is derived from the URL
//! and selector.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ConfigError;

/// Hex characters of the SHA-256 digest kept in a derived identity.
const IDENTITY_HASH_LEN: usize = 32;

/// One row to fetch: a product title, the page URL, and the selector that
/// points at the price on that page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub identity: String,
    pub title: String,
    pub url: String,
    pub selector: String,
}

impl Record {
    /// Builds a record whose identity is derived from `url` and `selector`.
    #[must_use]
    pub fn new(title: &str, url: &str, selector: &str) -> Self {
        Self {
            identity: derive_identity(url, selector),
            title: title.trim().to_owned(),
            url: url.trim().to_owned(),
            selector: selector.trim().to_owned(),
        }
    }

    /// Builds a record with a caller-supplied identity.
    #[must_use]
    pub fn with_identity(identity: &str, title: &str, url: &str, selector: &str) -> Self {
        Self {
            identity: identity.trim().to_owned(),
            ..Self::new(title, url, selector)
        }
    }
}

/// Raw record as it appears in a records file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEntry {
    pub title: String,
    pub url: String,
    pub selector: String,
    /// Explicit identity. When absent one is derived from `url` + `selector`.
    #[serde(default)]
    pub key: Option<String>,
}

impl From<RecordEntry> for Record {
    fn from(entry: RecordEntry) -> Self {
        match entry.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Record::with_identity(key, &entry.title, &entry.url, &entry.selector),
            None => Record::new(&entry.title, &entry.url, &entry.selector),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordsFile {
    pub records: Vec<RecordEntry>,
}

/// Derives a stable identity from a record's URL and selector.
///
/// Surrounding whitespace is ignored so that `" https://a.test "` and
/// `"https://a.test"` map to the same stored row.
#[must_use]
pub fn derive_identity(url: &str, selector: &str) -> String {
    let input = format!("{}\n{}", url.trim(), selector.trim());
    let digest = format!("{:x}", Sha256::digest(input.as_bytes()));
    format!("rec_{}", &digest[..IDENTITY_HASH_LEN])
}

/// Load and validate records from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_records(path: &Path) -> Result<Vec<Record>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RecordsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_records(&content)
}

/// Parse and validate records from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::RecordsFileParse`] on malformed YAML and
/// [`ConfigError::Validation`] on empty fields, non-absolute URLs, or
/// duplicate identities.
pub fn parse_records(content: &str) -> Result<Vec<Record>, ConfigError> {
    let file: RecordsFile = serde_yaml::from_str(content).map_err(ConfigError::RecordsFileParse)?;
    let records: Vec<Record> = file.records.into_iter().map(Record::from).collect();
    validate_records(&records)?;
    Ok(records)
}

fn validate_records(records: &[Record]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for (idx, record) in records.iter().enumerate() {
        let row = idx + 1;
        if record.title.is_empty() {
            return Err(ConfigError::Validation(format!(
                "record {row}: title must be non-empty"
            )));
        }
        if record.selector.is_empty() {
            return Err(ConfigError::Validation(format!(
                "record {row} ('{}'): selector must be non-empty",
                record.title
            )));
        }
        if !is_absolute_http_url(&record.url) {
            return Err(ConfigError::Validation(format!(
                "record {row} ('{}'): url \"{}\" is not an absolute http(s) URL",
                record.title, record.url
            )));
        }
        if !seen.insert(record.identity.clone()) {
            return Err(ConfigError::Validation(format!(
                "record {row} ('{}'): duplicate identity {}; set an explicit `key` to keep both",
                record.title, record.identity
            )));
        }
    }

    Ok(())
}

fn is_absolute_http_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .and_then(|rest| rest.split(['/', '?', '#']).next())
        .is_some_and(|host| !host.is_empty() && !host.contains(char::is_whitespace))
}
