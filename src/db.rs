use std::fs;
use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

/// Pool of SQLite connections
pub type DbPool = Pool<SqliteConnectionManager>;
/// Connection checked out of [`DbPool`]
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and migrations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the SQLite file at `path` and run migrations
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path);
        Self::with_manager(manager, None)
    }

    /// Private in-memory database, for tests
    pub fn in_memory() -> Result<Self> {
        // Every pooled in-memory connection would be its own database.
        Self::with_manager(SqliteConnectionManager::memory(), Some(1))
    }

    fn with_manager(manager: SqliteConnectionManager, max_size: Option<u32>) -> Result<Self> {
        let mut builder = Pool::builder();
        if let Some(size) = max_size {
            builder = builder.max_size(size);
        }
        let pool = builder.build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        debug!("Database ready");

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2025-09-14-000000_create_tables/up.sql"
        ))?;
        conn.execute_batch(include_str!(
            "../migrations/2025-09-14-000001_add_batch_control/up.sql"
        ))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Number of rows in `table`; the name must already be validated
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
