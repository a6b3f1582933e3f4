//! Metrics collection
//!
//! Counters and histograms go through the `metrics` facade. Nothing is exported
//! unless the binary installs a recorder, in which case these calls feed it.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::dispatcher::{DispatchOutcome, FailureKind};

/// Files handed to the worker pool
pub const FILES_DISPATCHED_TOTAL: &str = "mail_etl_files_dispatched_total";
/// Files that contributed nothing because of a failure
pub const FILES_FAILED_TOTAL: &str = "mail_etl_files_failed_total";
/// Message records extracted
pub const MESSAGES_EXTRACTED_TOTAL: &str = "mail_etl_messages_extracted_total";
/// Attachment records extracted
pub const ATTACHMENTS_EXTRACTED_TOTAL: &str = "mail_etl_attachments_extracted_total";
/// Wall-clock time of one dispatch
pub const DISPATCH_DURATION: &str = "mail_etl_dispatch_duration_seconds";
/// Rows written per table and sink
pub const ROWS_LOADED_TOTAL: &str = "mail_etl_rows_loaded_total";
/// Data quality anomalies found
pub const QUALITY_ISSUES_TOTAL: &str = "mail_etl_quality_issues_total";

/// Recording helpers for pipeline stages
#[derive(Debug, Clone, Copy)]
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record the result of one dispatch
    pub fn record_dispatch(outcome: &DispatchOutcome, elapsed: Duration) {
        counter!(FILES_DISPATCHED_TOTAL).increment(outcome.file_count as u64);
        counter!(MESSAGES_EXTRACTED_TOTAL).increment(outcome.messages.len() as u64);
        counter!(ATTACHMENTS_EXTRACTED_TOTAL).increment(outcome.attachments.len() as u64);

        for failure in &outcome.failures {
            let kind = match failure.kind {
                FailureKind::Parse => "parse",
                FailureKind::Worker => "worker",
            };
            counter!(FILES_FAILED_TOTAL, "kind" => kind).increment(1);
        }

        histogram!(DISPATCH_DURATION).record(elapsed.as_secs_f64());
    }

    /// Record rows written to a sink (`csv` or `sqlite`)
    pub fn record_rows_loaded(table: &str, sink: &'static str, rows: usize) {
        counter!(ROWS_LOADED_TOTAL, "table" => table.to_string(), "sink" => sink)
            .increment(rows as u64);
    }

    /// Record anomalies reported by the quality checker
    pub fn record_quality_issues(table: &str, issues: usize) {
        counter!(QUALITY_ISSUES_TOTAL, "table" => table.to_string()).increment(issues as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let outcome = DispatchOutcome::default();
        PipelineMetrics::record_dispatch(&outcome, Duration::from_millis(5));
        PipelineMetrics::record_rows_loaded("messages", "csv", 3);
        PipelineMetrics::record_quality_issues("messages", 0);
    }
}
