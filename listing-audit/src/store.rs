//! Persistence collaborator
//!
//! Upserts a record's payload keyed by listing id. Only the columns present
//! in the payload are written; omitted (not applicable) columns keep whatever
//! an earlier run stored. A `null` note clears an earlier rationale.

use crate::aggregator::{PersistencePayload, POLICY_NOTE_COLUMN};
use crate::types::CheckName;
use async_trait::async_trait;
use listing_common::Result;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

/// Persistence collaborator
#[async_trait]
pub trait ListingStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert or update the listing's check columns
    async fn upsert(&self, listing_id: &str, payload: &PersistencePayload) -> Result<()>;
}

// ============================================================================
// SQLite
// ============================================================================

/// Initialize database connection pool
///
/// Creates the parent directory and the `listing_checks` table if needed.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;
    Ok(pool)
}

async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS listing_checks (
            listing_id TEXT PRIMARY KEY,
            is_more_than_3_categories INTEGER,
            is_not_relevant_categories INTEGER,
            is_more_than_5_service_areas INTEGER,
            is_missing_hours_web_description INTEGER,
            is_suspicious_reviews INTEGER,
            is_policy_violations INTEGER,
            policy_violations_note TEXT,
            is_fake_address INTEGER,
            checked_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    debug!("Database tables initialized (listing_checks)");
    Ok(())
}

/// Stored row of one listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCheckRow {
    pub listing_id: String,
    /// `None` is a NULL column (inconclusive or never written)
    pub checks: BTreeMap<CheckName, Option<bool>>,
    pub policy_violations_note: Option<String>,
    pub checked_at: String,
}

/// SQLite-backed store
pub struct SqliteListingStore {
    pool: SqlitePool,
}

impl SqliteListingStore {
    /// Open (and create if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            pool: init_database_pool(db_path).await?,
        })
    }

    /// Wrap an existing pool, creating the table if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        init_tables(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read back one listing's row
    pub async fn fetch(&self, listing_id: &str) -> Result<Option<ListingCheckRow>> {
        let row = sqlx::query("SELECT * FROM listing_checks WHERE listing_id = ?")
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut checks = BTreeMap::new();
        for name in CheckName::ALL {
            let value: Option<bool> = row.try_get(name.column())?;
            checks.insert(name, value);
        }

        Ok(Some(ListingCheckRow {
            listing_id: row.try_get("listing_id")?,
            checks,
            policy_violations_note: row.try_get(POLICY_NOTE_COLUMN)?,
            checked_at: row.try_get("checked_at")?,
        }))
    }
}

/// Upsert statement over the given columns
///
/// Column names only ever come from the fixed `CheckName` set and the note
/// column, never from input.
fn upsert_sql(columns: &[&'static str]) -> String {
    let mut all = Vec::with_capacity(columns.len() + 2);
    all.push("listing_id");
    all.extend_from_slice(columns);
    all.push("checked_at");

    let placeholders = vec!["?"; all.len()].join(", ");
    let updates = all[1..]
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO listing_checks ({}) VALUES ({}) ON CONFLICT(listing_id) DO UPDATE SET {}",
        all.join(", "),
        placeholders,
        updates
    )
}

#[async_trait]
impl ListingStore for SqliteListingStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn upsert(&self, listing_id: &str, payload: &PersistencePayload) -> Result<()> {
        let checks: Vec<(CheckName, Option<bool>)> = payload.check_columns().collect();
        let writes_note = payload.contains(POLICY_NOTE_COLUMN);

        let mut columns: Vec<&'static str> = checks.iter().map(|(name, _)| name.column()).collect();
        if writes_note {
            columns.push(POLICY_NOTE_COLUMN);
        }
        let sql = upsert_sql(&columns);

        let mut query = sqlx::query(&sql).bind(listing_id);
        for (_, value) in &checks {
            query = query.bind(*value);
        }
        if writes_note {
            query = query.bind(payload.note());
        }
        query = query.bind(listing_common::time::now().to_rfc3339());

        query.execute(&self.pool).await?;

        debug!(
            listing_id = %listing_id,
            columns = columns.len(),
            "Listing checks upserted"
        );
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Store kept in process memory (dry runs, tests)
///
/// Applies the same merge rule as SQLite: a later payload overwrites only
/// the columns it carries.
#[derive(Default)]
pub struct MemoryListingStore {
    rows: RwLock<HashMap<String, PersistencePayload>>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, listing_id: &str) -> Option<PersistencePayload> {
        self.rows.read().await.get(listing_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, listing_id: &str, payload: &PersistencePayload) -> Result<()> {
        let mut rows = self.rows.write().await;
        rows.entry(listing_id.to_string())
            .or_default()
            .merge_from(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_lists_only_present_columns() {
        let sql = upsert_sql(&["is_fake_address"]);
        assert_eq!(
            sql,
            "INSERT INTO listing_checks (listing_id, is_fake_address, checked_at) VALUES (?, ?, ?) \
             ON CONFLICT(listing_id) DO UPDATE SET is_fake_address = excluded.is_fake_address, \
             checked_at = excluded.checked_at"
        );
    }

    #[test]
    fn test_upsert_sql_without_check_columns() {
        let sql = upsert_sql(&[]);
        assert!(sql.contains("(listing_id, checked_at)"));
        assert!(sql.ends_with("SET checked_at = excluded.checked_at"));
    }
}
