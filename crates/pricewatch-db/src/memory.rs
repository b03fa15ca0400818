//! In-process [`ResultStore`], used by tests and by `process --dry-run`.

use std::collections::BTreeMap;

use pricewatch_core::{PriceResult, Stats};
use tokio::sync::RwLock;

use crate::{DbError, ResultStore};

/// Results held in a map keyed by identity. Writers are serialized by the
/// lock, which gives the same last-write-wins upsert as the Postgres store.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: RwLock<BTreeMap<String, PriceResult>>,
}

impl MemoryResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }

    pub async fn get(&self, identity: &str) -> Option<PriceResult> {
        self.results.read().await.get(identity).cloned()
    }
}

impl ResultStore for MemoryResultStore {
    async fn upsert(&self, result: &PriceResult) -> Result<(), DbError> {
        self.results
            .write()
            .await
            .insert(result.identity.clone(), result.clone());
        Ok(())
    }

    async fn all(&self) -> Result<Vec<PriceResult>, DbError> {
        Ok(self.results.read().await.values().cloned().collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PriceResult>, DbError> {
        let mut results: Vec<PriceResult> = self.results.read().await.values().cloned().collect();
        results.sort_by(|a, b| {
            b.checked_at
                .cmp(&a.checked_at)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        results.truncate(limit);
        Ok(results)
    }

    async fn stats(&self) -> Result<Stats, DbError> {
        let results: Vec<PriceResult> = self.results.read().await.values().cloned().collect();
        Ok(Stats::from_results(&results))
    }
}
