//! Data models for extracted records
//!
//! This module contains the two record kinds the pipeline produces (messages and
//! attachment metadata), the per-file parse result, and the `TableRow` trait that
//! lets storage and quality checks treat both kinds as plain tabular rows.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::schema::{attachments, messages};

/// One conversation message recovered from a source file.
///
/// A file yields at most one of these. `with_attachment` stays `None` until the
/// linker has seen every attachment of the run, and `batch_dt` until enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Stem of the source file name
    pub email_id: String,
    /// UUID following `Message ID:` in the body
    pub message_id: Option<String>,
    /// ISO-8601 timestamp from the speaker line, not calendar-validated
    pub timestamp: Option<String>,
    /// Display name from the speaker line
    pub speaker_name: Option<String>,
    /// Email address from the speaker line
    pub speaker_contact: Option<String>,
    /// Body text after `says:`, line breaks flattened
    pub message: Option<String>,
    /// Whether any attachment was linked to this message
    pub with_attachment: Option<bool>,
    /// Batch partition date (`YYYY-MM-DD`)
    pub batch_dt: Option<String>,
}

impl MessageRecord {
    /// Create an unlinked, unenriched message for `email_id`.
    #[must_use]
    pub fn new(email_id: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            message_id: None,
            timestamp: None,
            speaker_name: None,
            speaker_contact: None,
            message: None,
            with_attachment: None,
            batch_dt: None,
        }
    }
}

/// Metadata for one named attachment part of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Stem of the source file name; links to the file, not to a message
    pub email_id: String,
    /// Attachment filename; parts without one are never recorded
    pub attachment_name: String,
    /// Content-ID with angle brackets stripped
    pub content_id: Option<String>,
    /// MIME type of the part
    pub content_type: Option<String>,
    /// Parent message identifier, filled in by the linker
    pub message_id: Option<String>,
    /// Batch partition date (`YYYY-MM-DD`)
    pub batch_dt: Option<String>,
}

impl AttachmentRecord {
    /// Create an unlinked attachment record.
    #[must_use]
    pub fn new(email_id: impl Into<String>, attachment_name: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            attachment_name: attachment_name.into(),
            content_id: None,
            content_type: None,
            message_id: None,
            batch_dt: None,
        }
    }
}

/// How far parsing of one file got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStatus {
    /// A message was extracted
    Parsed,
    /// A body was found but it lacks the `message id:` marker
    NoMessageMarker,
    /// Neither a text/plain nor a text/html body part exists
    NoBody,
    /// The file could not be read or parsed; the reason is kept for reporting
    Failed(String),
}

/// Everything one source file contributed.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Stem of the source file name
    pub email_id: String,
    /// Zero or one message
    pub message: Option<MessageRecord>,
    /// Zero or more attachments, all sharing `email_id`
    pub attachments: Vec<AttachmentRecord>,
    /// Outcome of parsing
    pub status: ParseStatus,
}

impl ParsedFile {
    /// An empty contribution for a file that failed.
    #[must_use]
    pub fn failed(email_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            message: None,
            attachments: Vec::new(),
            status: ParseStatus::Failed(reason.into()),
        }
    }

    /// True when the file could not be parsed at all
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, ParseStatus::Failed(_))
    }
}

/// A record that can be written as one row of a table.
///
/// `COLUMNS` and `sql_values` are in the same order, which is also the serde field
/// order used for CSV headers.
pub trait TableRow: Serialize {
    /// Column names in storage order
    const COLUMNS: &'static [&'static str];

    /// Column values in `COLUMNS` order
    fn sql_values(&self) -> Vec<Value>;
}

fn text(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.clone()))
}

impl TableRow for MessageRecord {
    const COLUMNS: &'static [&'static str] = &[
        messages::EMAIL_ID,
        messages::MESSAGE_ID,
        messages::TIMESTAMP,
        messages::SPEAKER_NAME,
        messages::SPEAKER_CONTACT,
        messages::MESSAGE,
        messages::WITH_ATTACHMENT,
        messages::BATCH_DT,
    ];

    fn sql_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.email_id.clone()),
            text(self.message_id.as_ref()),
            text(self.timestamp.as_ref()),
            text(self.speaker_name.as_ref()),
            text(self.speaker_contact.as_ref()),
            text(self.message.as_ref()),
            self.with_attachment
                .map_or(Value::Null, |flag| Value::Integer(i64::from(flag))),
            text(self.batch_dt.as_ref()),
        ]
    }
}

impl TableRow for AttachmentRecord {
    const COLUMNS: &'static [&'static str] = &[
        attachments::EMAIL_ID,
        attachments::ATTACHMENT_NAME,
        attachments::CONTENT_ID,
        attachments::CONTENT_TYPE,
        attachments::MESSAGE_ID,
        attachments::BATCH_DT,
    ];

    fn sql_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.email_id.clone()),
            Value::Text(self.attachment_name.clone()),
            text(self.content_id.as_ref()),
            text(self.content_type.as_ref()),
            text(self.message_id.as_ref()),
            text(self.batch_dt.as_ref()),
        ]
    }
}
