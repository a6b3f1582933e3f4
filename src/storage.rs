//! Persistence of record sets.
//!
//! Every write appends: CSV files gain rows (the header is only written when the
//! file is new) and SQLite tables gain rows. Re-running a batch therefore adds
//! rows instead of replacing them. Empty record sets are skipped with a warning.

use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use rusqlite::params_from_iter;
use tracing::{info, warn};

use crate::config::CloudConfig;
use crate::db::Database;
use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::models::TableRow;
use crate::validation::InputValidator;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes record sets to CSV files and SQLite tables under one output directory.
#[derive(Clone)]
pub struct Storage {
    output_dir: PathBuf,
    database: Database,
    cloud: CloudConfig,
}

impl Storage {
    /// Create storage rooted at `output_dir`, creating the directory if needed.
    pub fn new(output_dir: &Path, database: Database) -> Result<Self> {
        create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            database,
            cloud: CloudConfig::default(),
        })
    }

    /// Attach cloud settings for [`Storage::write_cloud`].
    #[must_use]
    pub fn with_cloud(mut self, cloud: CloudConfig) -> Self {
        self.cloud = cloud;
        self
    }

    /// Output directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Underlying database
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// Path of the CSV file for `name`
    #[must_use]
    pub fn csv_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.csv"))
    }

    /// Append rows to `<output_dir>/<name>.csv`.
    pub fn write_csv<R: TableRow>(&self, rows: &[R], name: &str) -> Result<usize> {
        if rows.is_empty() {
            warn!("No data to write for {name}. Skipping CSV export.");
            return Ok(0);
        }
        InputValidator::validate_table_name(name)?;

        let path = self.csv_path(name);
        let is_new = path.metadata().map_or(true, |meta| meta.len() == 0);

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if is_new {
            file.write_all(UTF8_BOM)?;
        }

        let mut writer = WriterBuilder::new().has_headers(is_new).from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!("Saved {} rows to CSV: {}", rows.len(), path.display());
        PipelineMetrics::record_rows_loaded(name, "csv", rows.len());
        Ok(rows.len())
    }

    /// Append rows to SQLite `table` in a single transaction.
    pub fn write_sqlite<R: TableRow>(&self, rows: &[R], table: &str) -> Result<usize> {
        if rows.is_empty() {
            warn!("No data to write for {table}. Skipping SQLite export.");
            return Ok(0);
        }
        InputValidator::validate_table_name(table)?;

        let columns = R::COLUMNS.join(", ");
        let placeholders = vec!["?"; R::COLUMNS.len()].join(", ");

        let mut conn = self.database.get_connection()?;
        conn.execute(
            &format!("CREATE TABLE IF NOT EXISTS {table} ({columns})"),
            [],
        )?;

        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare(&format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})"))?;
            for row in rows {
                stmt.execute(params_from_iter(row.sql_values()))?;
            }
        }
        tx.commit()?;

        info!("Appended {} rows into SQLite table: {table}", rows.len());
        PipelineMetrics::record_rows_loaded(table, "sqlite", rows.len());
        Ok(rows.len())
    }

    /// Cloud upload placeholder: logs what would be written, performs no I/O.
    pub fn write_cloud<R: TableRow>(&self, rows: &[R], target: &str) -> usize {
        if !self.cloud.enabled {
            return 0;
        }
        info!(
            "(DEMO) Would write {} rows to {}://{}/{target}",
            rows.len(),
            self.cloud.provider,
            self.cloud.bucket
        );
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttachmentRecord, MessageRecord};

    fn storage(dir: &Path) -> Storage {
        Storage::new(dir, Database::in_memory().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_set_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let rows: Vec<MessageRecord> = Vec::new();

        assert_eq!(storage.write_csv(&rows, "messages").unwrap(), 0);
        assert_eq!(storage.write_sqlite(&rows, "messages").unwrap(), 0);
        assert!(!storage.csv_path("messages").exists());
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());
        let rows = vec![AttachmentRecord::new("a", "x.txt")];
        assert!(storage.write_sqlite(&rows, "attachments; DROP TABLE messages").is_err());
    }

    #[test]
    fn test_cloud_stub_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path()).with_cloud(CloudConfig {
            enabled: true,
            provider: "gcs".to_string(),
            bucket: "bucket".to_string(),
        });
        let rows = vec![AttachmentRecord::new("a", "x.txt")];
        assert_eq!(storage.write_cloud(&rows, "attachments"), 0);
    }
}
