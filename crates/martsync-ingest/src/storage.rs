//! SQLite storage for annotation tables
//!
//! A fetch cycle replaces a table's contents wholesale: the delete and every
//! insert run in one transaction, so readers see either the old rows or the
//! complete new set.

use crate::config::DEFAULT_INSERT_BATCH_ROWS;
use crate::error::{Result, SyncError};
use martsync_common::types::{Row, TableSpec};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

/// SQLite's default cap on bound parameters per statement
const SQLITE_MAX_VARIABLES: usize = 32766;

/// Result of replacing one table's contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceStats {
    pub rows_deleted: u64,
    pub rows_inserted: u64,
    /// Rows skipped for an empty required column
    pub rows_dropped: u64,
}

/// Annotation tables in a SQLite database
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    pool: SqlitePool,
    insert_batch_rows: usize,
}

impl AnnotationStore {
    /// Open (creating if missing) the database at `database_url`
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| storage_error("<connect>", e))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| storage_error("<connect>", e))?;

        info!("Connected to annotation database {}", database_url);
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            insert_batch_rows: DEFAULT_INSERT_BATCH_ROWS,
        }
    }

    pub fn with_insert_batch_rows(mut self, rows: usize) -> Self {
        self.insert_batch_rows = rows.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Rows per INSERT, capped so one statement stays under SQLite's
    /// bound-parameter limit.
    fn rows_per_insert(&self, table: &TableSpec) -> usize {
        let max_rows = (SQLITE_MAX_VARIABLES / table.arity().max(1)).max(1);
        self.insert_batch_rows.min(max_rows)
    }

    /// Create the table if it does not exist yet; every column is TEXT.
    pub async fn ensure_table(&self, table: &TableSpec) -> Result<()> {
        let columns = table
            .columns()
            .iter()
            .map(|column| format!("\"{}\" TEXT", column))
            .collect::<Vec<_>>()
            .join(", ");

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            table.name(),
            columns
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error(table.name().as_str(), e))?;

        debug!("Ensured table {}", table.name());
        Ok(())
    }

    /// Replace the table's contents with the accepted subset of `rows`.
    ///
    /// Every row must have the table's arity. Rows with an empty required
    /// column are dropped. On any failure the transaction is rolled back and
    /// the table keeps its previous contents.
    pub async fn replace_rows(&self, table: &TableSpec, rows: Vec<Row>) -> Result<ReplaceStats> {
        if let Some(row) = rows.iter().find(|row| row.arity() != table.arity()) {
            return Err(martsync_common::Error::ArityMismatch {
                expected: table.arity(),
                actual: row.arity(),
                line: row.fields().join("\t"),
            }
            .into());
        }

        let total = rows.len();
        let accepted: Vec<Row> = rows.into_iter().filter(|row| table.accepts(row)).collect();
        let mut stats = ReplaceStats {
            rows_dropped: (total - accepted.len()) as u64,
            ..Default::default()
        };

        let name = table.name().as_str();
        let mut tx = self.pool.begin().await.map_err(|e| storage_error(name, e))?;

        stats.rows_deleted = sqlx::query(&format!("DELETE FROM \"{}\"", name))
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error(name, e))?
            .rows_affected();

        for batch in accepted.chunks(self.rows_per_insert(table)) {
            stats.rows_inserted += insert_batch(&mut tx, table, batch)
                .await
                .map_err(|e| storage_error(name, e))?;
        }

        tx.commit().await.map_err(|e| storage_error(name, e))?;

        info!(
            table = name,
            deleted = stats.rows_deleted,
            inserted = stats.rows_inserted,
            dropped = stats.rows_dropped,
            "Replaced table contents"
        );
        Ok(stats)
    }

    pub async fn count_rows(&self, table: &TableSpec) -> Result<u64> {
        let name = table.name().as_str();
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", name))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error(name, e))?;
        Ok(count as u64)
    }

    /// All stored rows in insertion order
    pub async fn load_rows(&self, table: &TableSpec) -> Result<Vec<Row>> {
        let name = table.name().as_str();
        let columns = table
            .columns()
            .iter()
            .map(|column| format!("COALESCE(\"{}\", '')", column))
            .collect::<Vec<_>>()
            .join(", ");

        let records = sqlx::query(&format!(
            "SELECT {} FROM \"{}\" ORDER BY rowid",
            columns, name
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error(name, e))?;

        records
            .iter()
            .map(|record| {
                (0..table.arity())
                    .map(|i| sqlx::Row::try_get::<String, _>(record, i))
                    .collect::<std::result::Result<Row, _>>()
                    .map_err(|e| storage_error(name, e))
            })
            .collect()
    }
}

async fn insert_batch(
    tx: &mut Transaction<'_, Sqlite>,
    table: &TableSpec,
    batch: &[Row],
) -> std::result::Result<u64, sqlx::Error> {
    let columns = table
        .columns()
        .iter()
        .map(|column| format!("\"{}\"", column))
        .collect::<Vec<_>>()
        .join(", ");

    let mut query_builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("INSERT INTO \"{}\" ({}) ", table.name(), columns));

    query_builder.push_values(batch, |mut b, row| {
        for field in row.fields() {
            b.push_bind(field.as_str());
        }
    });

    let result = query_builder.build().execute(&mut **tx).await?;
    Ok(result.rows_affected())
}

fn storage_error(table: &str, source: sqlx::Error) -> SyncError {
    SyncError::Storage {
        table: table.to_string(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn memory_store() -> AnnotationStore {
        // One connection: each in-memory connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        AnnotationStore::from_pool(pool)
    }

    fn pfam_table() -> TableSpec {
        TableSpec::new(
            "GRCh38_pfam",
            ["ensembl_transcript_id", "pfam", "pfam_start", "pfam_end"],
        )
        .unwrap()
        .require_column(1)
        .unwrap()
    }

    fn row(fields: [&str; 4]) -> Row {
        Row::from_iter(fields)
    }

    #[tokio::test]
    async fn test_replace_rows_inserts_in_order() {
        let store = memory_store().await.with_insert_batch_rows(2);
        let table = pfam_table();
        store.ensure_table(&table).await.unwrap();

        let rows = vec![
            row(["ENST1", "PF00001", "1", "10"]),
            row(["ENST2", "PF00002", "5", "50"]),
            row(["ENST3", "PF00003", "7", "70"]),
        ];
        let stats = store.replace_rows(&table, rows.clone()).await.unwrap();

        assert_eq!(stats.rows_inserted, 3);
        assert_eq!(stats.rows_dropped, 0);
        assert_eq!(store.load_rows(&table).await.unwrap(), rows);
    }

    #[tokio::test]
    async fn test_oversized_insert_batch_is_capped() {
        let store = memory_store().await.with_insert_batch_rows(10_000);
        let table = pfam_table();
        store.ensure_table(&table).await.unwrap();
        assert_eq!(store.rows_per_insert(&table), SQLITE_MAX_VARIABLES / 4);

        let rows: Vec<Row> = (0..9000)
            .map(|i| {
                Row::from_iter([
                    format!("ENST{:05}", i),
                    format!("PF{:05}", i),
                    "1".to_string(),
                    "10".to_string(),
                ])
            })
            .collect();
        let stats = store.replace_rows(&table, rows.clone()).await.unwrap();

        assert_eq!(stats.rows_inserted, 9000);
        assert_eq!(store.load_rows(&table).await.unwrap(), rows);
    }

    #[tokio::test]
    async fn test_replace_rows_drops_placeholder_rows() {
        let store = memory_store().await;
        let table = pfam_table();
        store.ensure_table(&table).await.unwrap();

        let rows = vec![
            row(["ENST1", "PF00001", "1", "10"]),
            row(["", "PF00002", "5", "50"]),
            row(["ENST3", "", "", ""]),
        ];
        let stats = store.replace_rows(&table, rows).await.unwrap();

        assert_eq!(stats.rows_inserted, 1);
        assert_eq!(stats.rows_dropped, 2);
        assert_eq!(store.count_rows(&table).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_rows_discards_previous_contents() {
        let store = memory_store().await;
        let table = pfam_table();
        store.ensure_table(&table).await.unwrap();

        store
            .replace_rows(&table, vec![row(["OLD", "PF1", "1", "2"]), row(["OLD2", "PF2", "1", "2"])])
            .await
            .unwrap();
        let stats = store
            .replace_rows(&table, vec![row(["NEW", "PF9", "3", "4"])])
            .await
            .unwrap();

        assert_eq!(stats.rows_deleted, 2);
        assert_eq!(
            store.load_rows(&table).await.unwrap(),
            vec![row(["NEW", "PF9", "3", "4"])]
        );
    }

    #[tokio::test]
    async fn test_empty_replacement_clears_table() {
        let store = memory_store().await;
        let table = pfam_table();
        store.ensure_table(&table).await.unwrap();
        store
            .replace_rows(&table, vec![row(["OLD", "PF1", "1", "2"])])
            .await
            .unwrap();

        let stats = store.replace_rows(&table, Vec::new()).await.unwrap();
        assert_eq!(stats.rows_deleted, 1);
        assert_eq!(store.count_rows(&table).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_arity_mismatch_leaves_table_untouched() {
        let store = memory_store().await;
        let table = pfam_table();
        store.ensure_table(&table).await.unwrap();
        store
            .replace_rows(&table, vec![row(["OLD", "PF1", "1", "2"])])
            .await
            .unwrap();

        let err = store
            .replace_rows(&table, vec![Row::from_iter(["ENST1", "PF1"])])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Common(martsync_common::Error::ArityMismatch { expected: 4, actual: 2, .. })
        ));
        assert_eq!(store.count_rows(&table).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_delete() {
        let store = memory_store().await.with_insert_batch_rows(1);
        let table = pfam_table();

        sqlx::query(
            r#"
            CREATE TABLE "GRCh38_pfam" (
                "ensembl_transcript_id" TEXT,
                "pfam" TEXT CHECK ("pfam" != 'BROKEN'),
                "pfam_start" TEXT,
                "pfam_end" TEXT
            )
            "#,
        )
        .execute(store.pool())
        .await
        .unwrap();
        store.ensure_table(&table).await.unwrap();

        let before = vec![row(["OLD", "PF1", "1", "2"])];
        store.replace_rows(&table, before.clone()).await.unwrap();

        let err = store
            .replace_rows(
                &table,
                vec![row(["ENST1", "PF00001", "1", "10"]), row(["ENST2", "BROKEN", "1", "2"])],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Storage { ref table, .. } if table == "GRCh38_pfam"));
        assert_eq!(store.load_rows(&table).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("annotations.db").display());

        let store = AnnotationStore::connect(&url).await.unwrap();
        store.ensure_table(&pfam_table()).await.unwrap();

        assert!(dir.path().join("annotations.db").exists());
    }
}
