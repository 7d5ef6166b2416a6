//! Company metadata persistence
//!
//! The store holds one row per ticker. Writes replace on ticker conflict,
//! reads match a company name against `official_name` or `common_name`.

use crate::models::CompanyRecord;
use crate::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod sqlite;
pub use sqlite::SqliteCompanyStore;

/// Trait for company metadata persistence
#[async_trait::async_trait]
pub trait CompanyStore: Send + Sync {
    /// Case-insensitive substring match on either name column.
    /// Exact matches win over substring matches, then the oldest row.
    async fn find_by_name(&self, name: &str) -> Result<Option<CompanyRecord>>;

    /// Insert, replacing any existing row with the same ticker
    async fn upsert(&self, record: &CompanyRecord) -> Result<()>;

    async fn all(&self) -> Result<Vec<CompanyRecord>>;
}

/// Rank of a record for a lowercase needle: 0 exact, 1 substring, None no match
pub(crate) fn match_rank(record: &CompanyRecord, needle: &str) -> Option<u8> {
    let official = record.official_name.to_lowercase();
    let common = record.common_name.to_lowercase();

    if official == needle || common == needle {
        Some(0)
    } else if official.contains(needle) || common.contains(needle) {
        Some(1)
    } else {
        None
    }
}

/// In-memory store for development and tests
pub struct InMemoryCompanyStore {
    // (surrogate id, record), ids grow monotonically like SQLite rowids
    rows: Arc<RwLock<Vec<(i64, CompanyRecord)>>>,
}

impl InMemoryCompanyStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_records(records: Vec<CompanyRecord>) -> Self {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| (i as i64 + 1, r))
            .collect();

        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }
}

impl Default for InMemoryCompanyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CompanyStore for InMemoryCompanyStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<CompanyRecord>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let rows = self.rows.read().await;

        Ok(rows
            .iter()
            .filter_map(|(id, record)| match_rank(record, &needle).map(|rank| (rank, *id, record)))
            .min_by_key(|(rank, id, _)| (*rank, *id))
            .map(|(_, _, record)| record.clone()))
    }

    async fn upsert(&self, record: &CompanyRecord) -> Result<()> {
        let mut rows = self.rows.write().await;

        let next_id = rows.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        rows.retain(|(_, r)| r.ticker != record.ticker);
        rows.push((next_id, record.clone()));

        Ok(())
    }

    async fn all(&self) -> Result<Vec<CompanyRecord>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().map(|(_, r)| r.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seed_records;

    #[tokio::test]
    async fn test_in_memory_matching() {
        let store = InMemoryCompanyStore::with_records(seed_records());

        let hit = store.find_by_name("big fruit").await.unwrap().unwrap();
        assert_eq!(hit.ticker, "AAPL");

        let hit = store.find_by_name("  MICROSOFT ").await.unwrap().unwrap();
        assert_eq!(hit.ticker, "MSFT");

        assert!(store.find_by_name("Nonexistent Co").await.unwrap().is_none());
        assert!(store.find_by_name("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exact_match_beats_substring() {
        let store = InMemoryCompanyStore::with_records(vec![
            CompanyRecord::new("META", "Meta Platforms", "Metaverse Co"),
            CompanyRecord::new("MT", "Meta", "Steel"),
        ]);

        let hit = store.find_by_name("meta").await.unwrap().unwrap();
        assert_eq!(hit.ticker, "MT");
    }

    #[tokio::test]
    async fn test_in_memory_replace_on_conflict() {
        let store = InMemoryCompanyStore::with_records(seed_records());

        store
            .upsert(&CompanyRecord::new("AAPL", "Apple Inc.", "iPhone maker"))
            .await
            .unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all.iter().filter(|r| r.ticker == "AAPL").count(), 1);
        assert!(store.find_by_name("Big Fruit Corp").await.unwrap().is_none());
        assert_eq!(
            store.find_by_name("iphone maker").await.unwrap().unwrap().official_name,
            "Apple Inc."
        );
    }
}
