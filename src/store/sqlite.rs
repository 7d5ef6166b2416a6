//! SQLite-backed company store
//!
//! One connection per operation, opened and closed around each call.
//! Every write is a single statement, so a crash never leaves a partial row.

use crate::error::AssistantError;
use crate::models::{seed_records, CompanyRecord};
use crate::store::{match_rank, CompanyStore};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub struct SqliteCompanyStore {
    path: PathBuf,
    options: SqliteConnectOptions,
}

impl SqliteCompanyStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        Self { path, options }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        SqliteConnection::connect_with(&self.options)
            .await
            .map_err(|e| {
                AssistantError::Store(format!(
                    "Failed to open {}: {}",
                    self.path.display(),
                    e
                ))
            })
    }

    /// Create the `company_metadata` table if it does not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.connect().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS company_metadata (
                id INTEGER PRIMARY KEY,
                official_name TEXT,
                common_name TEXT,
                ticker TEXT UNIQUE
            )
            "#,
        )
        .execute(&mut conn)
        .await
        .map_err(|e| {
            AssistantError::Store(format!("Failed to create company_metadata: {}", e))
        })?;

        conn.close().await?;
        debug!(path = %self.path.display(), "company_metadata table ensured");
        Ok(())
    }

    /// Insert the starter companies, skipping tickers already present.
    /// Returns how many rows were inserted.
    pub async fn seed_defaults(&self) -> Result<u64> {
        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;
        let mut inserted = 0;

        for record in seed_records() {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO company_metadata (official_name, common_name, ticker) VALUES (?, ?, ?)",
            )
            .bind(&record.official_name)
            .bind(&record.common_name)
            .bind(&record.ticker)
            .execute(&mut *tx)
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to seed {}: {}", record.ticker, e)))?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        conn.close().await?;

        info!(inserted, "Seeded starter companies");
        Ok(inserted)
    }

    /// Schema plus seed, as run by the setup binary and at startup
    pub async fn setup(&self) -> Result<u64> {
        self.ensure_schema().await?;
        self.seed_defaults().await
    }
}

fn record_from_row(row: &SqliteRow) -> Result<CompanyRecord> {
    Ok(CompanyRecord {
        ticker: row.try_get::<Option<String>, _>("ticker")?.unwrap_or_default(),
        official_name: row
            .try_get::<Option<String>, _>("official_name")?
            .unwrap_or_default(),
        common_name: row
            .try_get::<Option<String>, _>("common_name")?
            .unwrap_or_default(),
    })
}

#[async_trait::async_trait]
impl CompanyStore for SqliteCompanyStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<CompanyRecord>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        // Folded in Rust: SQLite lower() and LIKE only fold ASCII
        let record = self
            .all()
            .await?
            .into_iter()
            .enumerate()
            .filter_map(|(pos, record)| match_rank(&record, &needle).map(|rank| (rank, pos, record)))
            .min_by_key(|(rank, pos, _)| (*rank, *pos))
            .map(|(_, _, record)| record);

        debug!(query = %needle, hit = record.is_some(), "Company lookup");
        Ok(record)
    }

    async fn upsert(&self, record: &CompanyRecord) -> Result<()> {
        let mut conn = self.connect().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO company_metadata (official_name, common_name, ticker) VALUES (?, ?, ?)",
        )
        .bind(&record.official_name)
        .bind(&record.common_name)
        .bind(&record.ticker)
        .execute(&mut conn)
        .await
        .map_err(|e| {
            AssistantError::Store(format!("Failed to write ticker {}: {}", record.ticker, e))
        })?;

        conn.close().await?;
        info!(ticker = %record.ticker, "Company metadata added/replaced");
        Ok(())
    }

    async fn all(&self) -> Result<Vec<CompanyRecord>> {
        let mut conn = self.connect().await?;

        let rows = sqlx::query(
            "SELECT id, official_name, common_name, ticker FROM company_metadata ORDER BY id",
        )
        .fetch_all(&mut conn)
        .await
        .map_err(|e| AssistantError::Store(format!("Failed to list companies: {}", e)))?;

        let records = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;
        conn.close().await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCompanyStore;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::task::JoinSet;

    async fn seeded_store() -> (TempDir, SqliteCompanyStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteCompanyStore::new(dir.path().join("financial_data.db"));
        store.setup().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let (_dir, store) = seeded_store().await;

        assert_eq!(store.all().await.unwrap().len(), 5);
        let inserted = tokio_test::assert_ok!(store.setup().await);
        assert_eq!(inserted, 0);
        assert_eq!(store.all().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_lookup_by_either_name() {
        let (_dir, store) = seeded_store().await;

        let by_common = store.find_by_name("Big Fruit Corp").await.unwrap().unwrap();
        assert_eq!(by_common.ticker, "AAPL");

        let by_official = store.find_by_name("microsoft").await.unwrap().unwrap();
        assert_eq!(by_official.ticker, "MSFT");

        let by_substring = store.find_by_name("electric car").await.unwrap().unwrap();
        assert_eq!(by_substring.ticker, "TSLA");

        assert!(store.find_by_name("Nonexistent Co").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_like_wildcards_are_literal() {
        let (_dir, store) = seeded_store().await;

        assert!(store.find_by_name("%").await.unwrap().is_none());
        assert!(store.find_by_name("_").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_ticker() {
        let (_dir, store) = seeded_store().await;

        store
            .upsert(&CompanyRecord::new("GOOGL", "Alphabet Inc.", "Google"))
            .await
            .unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 5);

        let googl: Vec<_> = all.iter().filter(|r| r.ticker == "GOOGL").collect();
        assert_eq!(googl.len(), 1);
        assert_eq!(googl[0].official_name, "Alphabet Inc.");
        assert_eq!(googl[0].common_name, "Google");
        assert!(store.find_by_name("Search Giant").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_new_ticker() {
        let (_dir, store) = seeded_store().await;

        store
            .upsert(&CompanyRecord::new("NVDA", "NVIDIA Corporation", "Nvidia"))
            .await
            .unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 6);
        assert!(all.contains(&CompanyRecord::new("NVDA", "NVIDIA Corporation", "Nvidia")));
    }

    #[tokio::test]
    async fn test_missing_table_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteCompanyStore::new(dir.path().join("empty.db"));

        let err = store.find_by_name("Apple").await.unwrap_err();
        assert!(matches!(err, AssistantError::Store(_)));
    }

    #[tokio::test]
    async fn test_non_ascii_names_fold_like_in_memory() {
        let (_dir, store) = seeded_store().await;
        let record = CompanyRecord::new("ELE.MC", "ENDESA ÉNERGÍA", "ÉNERGÍA ENDESA");
        store.upsert(&record).await.unwrap();

        let memory = InMemoryCompanyStore::with_records(store.all().await.unwrap());

        for name in ["ÉNERGÍA ENDESA", "énergía endesa", "Endesa Énergía", "ÉNERGÍA"] {
            assert_eq!(store.find_by_name(name).await.unwrap(), Some(record.clone()), "{}", name);
            assert_eq!(memory.find_by_name(name).await.unwrap(), Some(record.clone()), "{}", name);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_same_ticker() {
        let (_dir, store) = seeded_store().await;
        let store = Arc::new(store);
        let mut tasks = JoinSet::new();

        for i in 0..8 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .upsert(&CompanyRecord::new("NVDA", "NVIDIA Corporation", format!("Nvidia {}", i)))
                    .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            tokio_test::assert_ok!(joined.unwrap());
        }

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all.iter().filter(|r| r.ticker == "NVDA").count(), 1);
    }
}
