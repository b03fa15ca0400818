pub mod batch;
pub mod error;
pub mod stats;

pub use batch::{BatchProcessor, MAX_CONCURRENCY};
pub use error::BatchError;
pub use stats::{format_price, StatisticsEngine};
