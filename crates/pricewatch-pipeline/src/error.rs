use pricewatch_db::DbError;
use thiserror::Error;

/// Batch-level failures. Per-record problems (HTTP errors, timeouts, pages
/// without a price) are never errors here; they end up in the record's
/// result.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("identity \"{identity}\" appears more than once in the batch")]
    DuplicateIdentity { identity: String },

    #[error("batch cancelled")]
    Cancelled,

    #[error("result store error: {0}")]
    Store(#[from] DbError),
}
