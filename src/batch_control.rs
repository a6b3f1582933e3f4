//! Batch audit trail
//!
//! Each load step is wrapped in a [`BatchControl`]. When the step ends, one
//! [`BatchAuditRecord`] is handed to an [`AuditStore`]. Failing to persist that
//! record is logged and otherwise ignored.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::Result;
use crate::models::TableRow;
use crate::schema::batch_control;
use crate::storage::Storage;

/// Lifecycle state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    /// Started, not yet ended
    Running,
    /// Ended with every row loaded
    Success,
    /// Ended with an error
    Failed,
}

impl BatchStatus {
    /// Upper-case name as stored in the audit table
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `batch_control` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAuditRecord {
    /// Load step name, e.g. `messages_load`
    pub batch_name: String,
    /// `None` when the batch ended without being started
    pub start_time: Option<DateTime<Utc>>,
    /// When `end` was called
    pub end_time: DateTime<Utc>,
    /// Seconds between start and end, from a monotonic clock
    pub duration_sec: f64,
    /// Rows handed to the load
    pub rows_expected: usize,
    /// Rows actually written
    pub rows_loaded: usize,
    /// Final state
    pub status: BatchStatus,
    /// When the record was built
    pub created_at: DateTime<Utc>,
}

fn count(value: usize) -> Value {
    Value::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

impl TableRow for BatchAuditRecord {
    const COLUMNS: &'static [&'static str] = &[
        batch_control::BATCH_NAME,
        batch_control::START_TIME,
        batch_control::END_TIME,
        batch_control::DURATION_SEC,
        batch_control::ROWS_EXPECTED,
        batch_control::ROWS_LOADED,
        batch_control::STATUS,
        batch_control::CREATED_AT,
    ];

    fn sql_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.batch_name.clone()),
            self.start_time
                .map_or(Value::Null, |t| Value::Text(t.to_rfc3339())),
            Value::Text(self.end_time.to_rfc3339()),
            Value::Real(self.duration_sec),
            count(self.rows_expected),
            count(self.rows_loaded),
            Value::Text(self.status.as_str().to_string()),
            Value::Text(self.created_at.to_rfc3339()),
        ]
    }
}

/// Destination for audit records
#[cfg_attr(test, mockall::automock)]
pub trait AuditStore {
    /// Persist one finished batch
    fn record(&self, record: &BatchAuditRecord) -> Result<()>;
}

/// Appends audit records to the `batch_control` table and `batch_control.csv`.
#[derive(Clone)]
pub struct DatabaseAuditStore {
    storage: Storage,
}

impl DatabaseAuditStore {
    /// Write audit rows through `storage`.
    #[must_use]
    pub const fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl AuditStore for DatabaseAuditStore {
    fn record(&self, record: &BatchAuditRecord) -> Result<()> {
        let rows = std::slice::from_ref(record);
        self.storage.write_sqlite(rows, batch_control::TABLE)?;
        self.storage.write_csv(rows, batch_control::TABLE)?;
        Ok(())
    }
}

/// Tracks one named load step from start to end.
pub struct BatchControl<'a, S: AuditStore + ?Sized> {
    batch_name: String,
    store: &'a S,
    status: Option<BatchStatus>,
    started: Option<(DateTime<Utc>, Instant)>,
    rows_expected: usize,
}

impl<'a, S: AuditStore + ?Sized> BatchControl<'a, S> {
    /// A batch that has not started yet.
    pub fn new(batch_name: impl Into<String>, store: &'a S) -> Self {
        Self {
            batch_name: batch_name.into(),
            store,
            status: None,
            started: None,
            rows_expected: 0,
        }
    }

    /// Name given at construction
    #[must_use]
    pub fn batch_name(&self) -> &str {
        &self.batch_name
    }

    /// Current status; `None` before `start`
    #[must_use]
    pub const fn status(&self) -> Option<BatchStatus> {
        self.status
    }

    /// Mark the batch RUNNING.
    pub fn start(&mut self, rows_expected: usize) {
        self.status = Some(BatchStatus::Running);
        self.started = Some((Utc::now(), Instant::now()));
        self.rows_expected = rows_expected;
        info!(
            batch = %self.batch_name,
            rows_expected,
            "Batch started"
        );
    }

    /// Close the batch and persist its audit record.
    pub fn end(&mut self, rows_loaded: usize, success: bool) -> BatchAuditRecord {
        let status = if success {
            BatchStatus::Success
        } else {
            BatchStatus::Failed
        };
        self.status = Some(status);

        let end_time = Utc::now();
        let (start_time, duration_sec) = self
            .started
            .map_or((None, 0.0), |(wall, clock)| {
                (Some(wall), clock.elapsed().as_secs_f64())
            });

        let record = BatchAuditRecord {
            batch_name: self.batch_name.clone(),
            start_time,
            end_time,
            duration_sec,
            rows_expected: self.rows_expected,
            rows_loaded,
            status,
            created_at: end_time,
        };

        info!(
            batch = %self.batch_name,
            status = %status,
            rows_loaded,
            duration_sec,
            "Batch ended"
        );

        if let Err(e) = self.store.record(&record) {
            error!(batch = %self.batch_name, "Failed to write batch audit record: {e}");
        }

        record
    }
}
