//! End-to-end run: dispatch, link, enrich, check, load.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::batch_control::{AuditStore, BatchControl, DatabaseAuditStore};
use crate::config::{AppConfig, CloudConfig};
use crate::db::Database;
use crate::dispatcher::{Dispatcher, DEFAULT_EXTENSION};
use crate::enrich::{enrich_attachments, enrich_messages, parse_timezone, BatchDate, DEFAULT_TIMEZONE};
use crate::error::Result;
use crate::linker::link;
use crate::logging::OperationTimer;
use crate::models::TableRow;
use crate::quality::QualityChecker;
use crate::schema::{attachments, messages};
use crate::storage::Storage;
use crate::validation::InputValidator;

/// Batch name of the message load step
pub const MESSAGES_BATCH: &str = "messages_load";
/// Batch name of the attachment load step
pub const ATTACHMENTS_BATCH: &str = "attachments_load";

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory scanned for archive files (not recursive)
    pub input_dir: PathBuf,
    /// Where CSV files and the SQLite database are written
    pub output_dir: PathBuf,
    /// Concurrent parsers
    pub workers: usize,
    /// File extension to pick up, without the dot
    pub extension: String,
    /// Reference zone of the batch date
    pub timezone: Tz,
    /// SQLite file name inside `output_dir`
    pub database_file: String,
    /// Append to `<table>.csv`
    pub write_csv: bool,
    /// Append to the SQLite tables
    pub write_sqlite: bool,
    /// Cloud target; only logged
    pub cloud: CloudConfig,
    /// Fixed partition date; today in `timezone` when unset
    pub batch_date: Option<BatchDate>,
}

impl PipelineOptions {
    /// Options with default settings for the given directories.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            workers: 4,
            extension: DEFAULT_EXTENSION.to_string(),
            timezone: parse_timezone(DEFAULT_TIMEZONE)?,
            database_file: "etl.db".to_string(),
            write_csv: true,
            write_sqlite: true,
            cloud: CloudConfig::default(),
            batch_date: None,
        })
    }

    /// Options taken from loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            input_dir: config.pipeline.input_dir.clone(),
            output_dir: config.pipeline.output_dir.clone(),
            workers: config.pipeline.workers,
            extension: config.pipeline.file_extension.clone(),
            timezone: parse_timezone(&config.pipeline.timezone)?,
            database_file: config.storage.database_file.clone(),
            write_csv: config.storage.write_csv,
            write_sqlite: config.storage.write_sqlite,
            cloud: config.storage.cloud.clone(),
            batch_date: None,
        })
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    /// Records were loaded
    Completed,
    /// Nothing was parsed, nothing was written
    NoMessages,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    /// How the run ended
    pub status: PipelineStatus,
    /// Files discovered, including failed ones
    pub files_processed: usize,
    /// Files that contributed nothing because of a parse or worker failure
    pub files_failed: usize,
    /// Messages after linking
    pub messages_total: usize,
    /// Messages flagged `with_attachment`
    pub messages_with_attachments: usize,
    /// Messages not flagged `with_attachment`
    pub messages_without_attachments: usize,
    /// Attachments after dedup
    pub attachments_total: usize,
    /// Rows flagged by the quality checker
    pub anomalies: usize,
    /// Partition date stamped on every row; `None` when nothing was loaded
    pub batch_dt: Option<String>,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl PipelineSummary {
    fn log(&self) {
        info!("========== PIPELINE SUMMARY ==========");
        info!("Total files processed: {}", self.files_processed);
        info!("Failed files: {}", self.files_failed);
        info!("Total messages: {}", self.messages_total);
        info!("Messages with attachments: {}", self.messages_with_attachments);
        info!("Messages without attachments: {}", self.messages_without_attachments);
        info!("Total attachments: {}", self.attachments_total);
        info!("Data quality anomalies: {}", self.anomalies);
        info!("Total time taken: {:.2} seconds", self.elapsed.as_secs_f64());
        info!("======================================");
    }
}

/// Run the whole pipeline once.
///
/// Only an unreadable input directory or a failed write is an error. Files that
/// fail to parse are logged and counted in the summary.
pub async fn run_pipeline(options: &PipelineOptions) -> Result<PipelineSummary> {
    let started = Instant::now();
    InputValidator::validate_input_dir(&options.input_dir)?;

    let run_id = Uuid::new_v4();
    let span = info_span!("pipeline_run", %run_id);
    info!(parent: &span, input = %options.input_dir.display(), workers = options.workers, "Pipeline started");

    let dispatcher = Dispatcher::new(options.workers)
        .with_extension(options.extension.clone())
        .with_span(span.clone());
    let outcome = dispatcher
        .dispatch(&options.input_dir)
        .instrument(span.clone())
        .await?;

    let _entered = span.enter();
    let files_processed = outcome.file_count;
    let files_failed = outcome.failures.len();

    if outcome.messages.is_empty() {
        warn!("No messages parsed. Exiting pipeline.");
        let summary = PipelineSummary {
            status: PipelineStatus::NoMessages,
            files_processed,
            files_failed,
            messages_total: 0,
            messages_with_attachments: 0,
            messages_without_attachments: 0,
            attachments_total: 0,
            anomalies: 0,
            batch_dt: None,
            elapsed: started.elapsed(),
        };
        summary.log();
        return Ok(summary);
    }

    let timer = OperationTimer::new("transform");
    let (mut message_rows, mut attachment_rows) = link(outcome.messages, outcome.attachments);

    let batch = options
        .batch_date
        .unwrap_or_else(|| BatchDate::today(options.timezone));
    enrich_messages(&mut message_rows, batch);
    enrich_attachments(&mut attachment_rows, batch);

    let report = QualityChecker::new().run(&message_rows, "Messages");
    if !report.is_clean() {
        warn!("Data quality anomalies detected: {} rows", report.issues.len());
    }
    timer.finish();

    let database = Database::new(&options.output_dir.join(&options.database_file))?;
    let storage = Storage::new(&options.output_dir, database)?.with_cloud(options.cloud.clone());
    let audit = DatabaseAuditStore::new(storage.clone());

    load(&storage, &audit, options, &message_rows, messages::TABLE, MESSAGES_BATCH)?;
    load(&storage, &audit, options, &attachment_rows, attachments::TABLE, ATTACHMENTS_BATCH)?;

    let messages_with_attachments = message_rows
        .iter()
        .filter(|m| m.with_attachment == Some(true))
        .count();

    let summary = PipelineSummary {
        status: PipelineStatus::Completed,
        files_processed,
        files_failed,
        messages_total: message_rows.len(),
        messages_with_attachments,
        messages_without_attachments: message_rows.len() - messages_with_attachments,
        attachments_total: attachment_rows.len(),
        anomalies: report.issues.len(),
        batch_dt: Some(batch.to_string()),
        elapsed: started.elapsed(),
    };
    summary.log();
    Ok(summary)
}

/// Write one record set to every enabled sink inside an audited batch.
fn load<R: TableRow>(
    storage: &Storage,
    audit: &dyn AuditStore,
    options: &PipelineOptions,
    rows: &[R],
    table: &str,
    batch_name: &str,
) -> Result<usize> {
    let mut batch = BatchControl::new(batch_name, audit);
    batch.start(rows.len());

    match write_sinks(storage, options, rows, table) {
        Ok(loaded) => {
            batch.end(loaded, true);
            Ok(loaded)
        }
        Err(e) => {
            error!("Failed to load {table}: {e}");
            batch.end(0, false);
            Err(e)
        }
    }
}

fn write_sinks<R: TableRow>(
    storage: &Storage,
    options: &PipelineOptions,
    rows: &[R],
    table: &str,
) -> Result<usize> {
    let mut loaded = 0;
    if options.write_sqlite {
        loaded = loaded.max(storage.write_sqlite(rows, table)?);
    }
    if options.write_csv {
        loaded = loaded.max(storage.write_csv(rows, table)?);
    }
    storage.write_cloud(rows, table);
    Ok(loaded)
}
