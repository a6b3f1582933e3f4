//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite
//! and as CSV headers. The `CREATE TABLE` statements live in `migrations/`.

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Source file stem
    pub const EMAIL_ID: &str = "email_id";
    /// Conversation identifier extracted from the body
    pub const MESSAGE_ID: &str = "message_id";
    /// ISO-8601 timestamp from the speaker line
    pub const TIMESTAMP: &str = "timestamp";
    /// Speaker display name column
    pub const SPEAKER_NAME: &str = "speaker_name";
    /// Speaker email address column
    pub const SPEAKER_CONTACT: &str = "speaker_contact";
    /// Flattened message body column
    pub const MESSAGE: &str = "message";
    /// Flag set by the linker
    pub const WITH_ATTACHMENT: &str = "with_attachment";
    /// Batch partition date column
    pub const BATCH_DT: &str = "batch_dt";
}

/// Attachments table schema
pub mod attachments {
    /// Table name
    pub const TABLE: &str = "attachments";
    /// Source file stem, foreign key to `messages.email_id`
    pub const EMAIL_ID: &str = "email_id";
    /// Attachment filename column
    pub const ATTACHMENT_NAME: &str = "attachment_name";
    /// MIME Content-ID without angle brackets
    pub const CONTENT_ID: &str = "content_id";
    /// MIME type column
    pub const CONTENT_TYPE: &str = "content_type";
    /// Parent message identifier, backfilled by the linker
    pub const MESSAGE_ID: &str = "message_id";
    /// Batch partition date column
    pub const BATCH_DT: &str = "batch_dt";
}

/// Batch audit table schema
pub mod batch_control {
    /// Table name
    pub const TABLE: &str = "batch_control";
    /// Logical batch name (`messages_load`, ...)
    pub const BATCH_NAME: &str = "batch_name";
    /// Wall-clock start column
    pub const START_TIME: &str = "start_time";
    /// Wall-clock end column
    pub const END_TIME: &str = "end_time";
    /// Duration in seconds column
    pub const DURATION_SEC: &str = "duration_sec";
    /// Rows announced at start
    pub const ROWS_EXPECTED: &str = "rows_expected";
    /// Rows reported at end
    pub const ROWS_LOADED: &str = "rows_loaded";
    /// RUNNING / SUCCESS / FAILED
    pub const STATUS: &str = "status";
    /// Record creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}
