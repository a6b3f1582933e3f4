//! Field extraction from decoded transcript text
//!
//! Bodies follow a fixed transcript convention:
//!
//! ```text
//! Message ID: 8d798677-9a33-47d1-876c-a0efe27a7222
//! 2025-09-14T05:19:14.864688Z Bob Demo - bob@example.com says:
//! Hello team, please find attached the report.
//! ```
//!
//! Each field has its own matcher. Matchers share nothing but the input text and a
//! miss only leaves that one field empty.

use std::sync::LazyLock;

use regex::Regex;

const MESSAGE_MARKER: &str = "message id:";

static MESSAGE_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)Message ID:\s*([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})",
    )
    .expect("message id pattern is valid")
});

static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z)\s+[A-Za-z ]+\s+-\s+[\w.-]+@[\w.-]+\s+says:",
    )
    .expect("timestamp pattern is valid")
});

static SPEAKER_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z\s+(.+?)\s+-\s+[\w.-]+@[\w.-]+\s+says:",
    )
    .expect("speaker name pattern is valid")
});

static SPEAKER_CONTACT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z\s+[A-Za-z ]+\s+-\s+([\w.-]+@[\w.-]+)\s+says:",
    )
    .expect("speaker contact pattern is valid")
});

static BODY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)says:\s*(.+)").expect("body pattern is valid"));

/// A field recovered from transcript text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Conversation UUID
    MessageId,
    /// ISO-8601 timestamp of the speaker line
    Timestamp,
    /// Speaker display name
    SpeakerName,
    /// Speaker email address
    SpeakerContact,
    /// Message body after `says:`
    Body,
}

/// Fields found in one body; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    /// Conversation UUID
    pub message_id: Option<String>,
    /// ISO-8601 timestamp
    pub timestamp: Option<String>,
    /// Speaker display name
    pub speaker_name: Option<String>,
    /// Speaker email address
    pub speaker_contact: Option<String>,
    /// Flattened message body
    pub message: Option<String>,
}

impl ExtractedFields {
    fn set(&mut self, field: Field, value: Option<String>) {
        match field {
            Field::MessageId => self.message_id = value,
            Field::Timestamp => self.timestamp = value,
            Field::SpeakerName => self.speaker_name = value,
            Field::SpeakerContact => self.speaker_contact = value,
            Field::Body => self.message = value,
        }
    }
}

/// One independent pattern for one field.
#[derive(Debug)]
struct Matcher {
    field: Field,
    regex: &'static LazyLock<Regex>,
    finish: fn(&str) -> String,
}

impl Matcher {
    fn find(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| (self.finish)(m.as_str()))
    }
}

fn keep(value: &str) -> String {
    value.to_string()
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// Trim, then join the remaining lines with single spaces.
fn flatten(value: &str) -> String {
    value.trim().lines().collect::<Vec<_>>().join(" ")
}

static MATCHERS: [Matcher; 5] = [
    Matcher { field: Field::MessageId, regex: &MESSAGE_ID_REGEX, finish: keep },
    Matcher { field: Field::Timestamp, regex: &TIMESTAMP_REGEX, finish: keep },
    Matcher { field: Field::SpeakerName, regex: &SPEAKER_NAME_REGEX, finish: trimmed },
    Matcher { field: Field::SpeakerContact, regex: &SPEAKER_CONTACT_REGEX, finish: trimmed },
    Matcher { field: Field::Body, regex: &BODY_REGEX, finish: flatten },
];

/// Pattern-based extractor for the "says:" transcript convention.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldExtractor;

impl FieldExtractor {
    /// Create an extractor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Case-insensitive check for the `message id:` marker.
    #[must_use]
    pub fn has_message_marker(&self, text: &str) -> bool {
        text.to_lowercase().contains(MESSAGE_MARKER)
    }

    /// Run every matcher over `text`.
    #[must_use]
    pub fn extract(&self, text: &str) -> ExtractedFields {
        let mut fields = ExtractedFields::default();
        for matcher in &MATCHERS {
            fields.set(matcher.field, matcher.find(text));
        }
        fields
    }

    /// Run the matcher for a single field.
    #[must_use]
    pub fn extract_field(&self, field: Field, text: &str) -> Option<String> {
        MATCHERS
            .iter()
            .find(|m| m.field == field)
            .and_then(|m| m.find(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TRANSCRIPT: &str = "Message ID: 8d798677-9a33-47d1-876c-a0efe27a7222\n\
        2025-09-14T05:19:14.864688Z Bob Demo - bob@example.com says:\n\
        Hello team,\nplease find attached the report.\n";

    #[test]
    fn test_extract_all_fields() {
        let fields = FieldExtractor::new().extract(TRANSCRIPT);
        assert_eq!(fields.message_id.as_deref(), Some("8d798677-9a33-47d1-876c-a0efe27a7222"));
        assert_eq!(fields.timestamp.as_deref(), Some("2025-09-14T05:19:14.864688Z"));
        assert_eq!(fields.speaker_name.as_deref(), Some("Bob Demo"));
        assert_eq!(fields.speaker_contact.as_deref(), Some("bob@example.com"));
        assert_eq!(
            fields.message.as_deref(),
            Some("Hello team, please find attached the report.")
        );
    }

    #[test]
    fn test_timestamp_without_fraction() {
        let text = "2025-01-02T03:04:05Z Alice Example - alice@example.com says: hi";
        let extractor = FieldExtractor::new();
        assert_eq!(
            extractor.extract_field(Field::Timestamp, text).as_deref(),
            Some("2025-01-02T03:04:05Z")
        );
        assert_eq!(extractor.extract_field(Field::Body, text).as_deref(), Some("hi"));
    }

    #[test]
    fn test_message_id_label_case_insensitive() {
        let text = "MESSAGE ID: 8D798677-9A33-47D1-876C-A0EFE27A7222";
        assert_eq!(
            FieldExtractor::new().extract(text).message_id.as_deref(),
            Some("8D798677-9A33-47D1-876C-A0EFE27A7222")
        );
    }

    #[test]
    fn test_message_id_must_be_uuid() {
        let text = "Message ID: not-a-uuid";
        assert!(FieldExtractor::new().extract(text).message_id.is_none());
    }

    #[test]
    fn test_uuid_followed_by_domain() {
        let text = "Message ID: 8d798677-9a33-47d1-876c-a0efe27a7222@example.com";
        assert_eq!(
            FieldExtractor::new().extract(text).message_id.as_deref(),
            Some("8d798677-9a33-47d1-876c-a0efe27a7222")
        );
    }

    #[test]
    fn test_missing_speaker_line_leaves_fields_empty() {
        let text = "Message ID: 8d798677-9a33-47d1-876c-a0efe27a7222\nno transcript here";
        let fields = FieldExtractor::new().extract(text);
        assert!(fields.message_id.is_some());
        assert!(fields.timestamp.is_none());
        assert!(fields.speaker_name.is_none());
        assert!(fields.speaker_contact.is_none());
        assert!(fields.message.is_none());
    }

    #[test]
    fn test_single_line_html_text() {
        let text = "Message ID: 8d798677-9a33-47d1-876c-a0efe27a7222 \
                    2025-09-14T05:19:14Z Carol Test - carol@example.com says: Let's schedule a call";
        let fields = FieldExtractor::new().extract(text);
        assert_eq!(fields.speaker_name.as_deref(), Some("Carol Test"));
        assert_eq!(fields.message.as_deref(), Some("Let's schedule a call"));
    }

    #[test]
    fn test_marker_check() {
        let extractor = FieldExtractor::new();
        assert!(extractor.has_message_marker("header\nmessage ID: x"));
        assert!(!extractor.has_message_marker("Message-ID: <x@example.com>"));
    }

    proptest! {
        #[test]
        fn extract_never_panics(text in "\\PC*") {
            let _ = FieldExtractor::new().extract(&text);
        }

        #[test]
        fn body_has_no_line_breaks(body in "[a-z \n]{1,60}") {
            let text = format!("2025-01-02T03:04:05Z Bob Demo - bob@example.com says:\n{body}");
            if let Some(message) = FieldExtractor::new().extract(&text).message {
                prop_assert!(!message.contains('\n'));
                prop_assert_eq!(message.trim(), message.as_str());
            }
        }
    }
}
