//! Mail Archive ETL - transcript extraction from `.eml` archives
//!
//! A Rust library for turning a directory of exported email files into two
//! linked tables: conversation messages and attachment metadata.
//!
//! # Features
//!
//! - MIME decoding (base64, quoted-printable, declared charsets, HTML bodies)
//! - Field extraction from the transcript body convention
//! - Bounded parallel parsing with per-file failure isolation
//! - Attachment-to-message linking and batch date stamping
//! - Advisory data quality checks
//! - Append-only CSV and SQLite loading with a batch audit trail

/// Batch audit records
pub mod batch_control;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// MIME part decoding
pub mod decoder;
/// Parallel file parsing
pub mod dispatcher;
/// Batch date stamping
pub mod enrich;
/// Error types
pub mod error;
/// Transcript field extraction
pub mod extractor;
/// Attachment-to-message linking
pub mod linker;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Per-file parsing
pub mod parser;
/// Pipeline orchestration
pub mod pipeline;
/// Data quality checks
pub mod quality;
/// Sample archive generation
pub mod sample;
/// Database schema definitions
pub mod schema;
/// CSV and SQLite persistence
pub mod storage;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{EtlError, Result};
pub use models::{AttachmentRecord, MessageRecord, ParseStatus, ParsedFile};
pub use parser::FileParser;
pub use pipeline::{run_pipeline, PipelineOptions, PipelineStatus, PipelineSummary};
