pub mod app_config;
pub mod config;
pub mod records;
pub mod results;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, DEFAULT_USER_AGENT};
pub use records::{derive_identity, load_records, parse_records, Record, RecordEntry, RecordsFile};
pub use results::{ExtractedPrice, PriceResult, ResultStatus, Stats};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read records file {path}: {source}")]
    RecordsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse records file: {0}")]
    RecordsFileParse(#[source] serde_yaml::Error),

    #[error("records validation failed: {0}")]
    Validation(String),
}
