//! Batch stamping and text normalization

use std::fmt;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::error::{EtlError, Result};
use crate::models::{AttachmentRecord, MessageRecord};

/// Default reference time zone for batch dates
pub const DEFAULT_TIMEZONE: &str = "Asia/Hong_Kong";

/// Parse an IANA time zone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| EtlError::InvalidTimezone(name.to_string()))
}

/// The partition date shared by every record of one run.
///
/// Compute it once with [`BatchDate::today`] and hand the same value to every
/// enrichment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDate(NaiveDate);

impl BatchDate {
    /// Today's date in `tz`.
    #[must_use]
    pub fn today(tz: Tz) -> Self {
        Self(Utc::now().with_timezone(&tz).date_naive())
    }

    /// A fixed date, for reruns and tests.
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The underlying date
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for BatchDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Stamp `batch_dt` and trim the message body. Case is preserved.
pub fn enrich_messages(messages: &mut [MessageRecord], batch: BatchDate) {
    if messages.is_empty() {
        return;
    }
    let stamp = batch.to_string();
    for message in messages.iter_mut() {
        message.batch_dt = Some(stamp.clone());
        if let Some(body) = message.message.as_mut() {
            let trimmed = body.trim();
            if trimmed.len() != body.len() {
                *body = trimmed.to_string();
            }
        }
    }
    info!("Added BATCH_DT='{stamp}' to {} messages", messages.len());
}

/// Stamp `batch_dt` on every attachment.
pub fn enrich_attachments(attachments: &mut [AttachmentRecord], batch: BatchDate) {
    if attachments.is_empty() {
        return;
    }
    let stamp = batch.to_string();
    for attachment in attachments.iter_mut() {
        attachment.batch_dt = Some(stamp.clone());
    }
    info!("Added BATCH_DT='{stamp}' to {} attachments", attachments.len());
}
