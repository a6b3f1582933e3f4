//! Per-file parsing of `.eml` archives
//!
//! One source file produces at most one [`MessageRecord`] and any number of
//! [`AttachmentRecord`]s, all tagged with the file stem as `email_id`. Every error
//! is contained at the file boundary: [`FileParser::parse_file`] logs it and hands
//! back an empty, failed [`ParsedFile`].

use std::fs;
use std::path::Path;

use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use tracing::{debug, error, warn};

use crate::decoder::{html_to_text, ContentDecoder, MimePart};
use crate::error::Result;
use crate::extractor::FieldExtractor;
use crate::models::{AttachmentRecord, MessageRecord, ParseStatus, ParsedFile};

/// Derive the dataset-wide `email_id` from a file path (its stem).
#[must_use]
pub fn email_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parser for single archive files. Each worker owns its own instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileParser {
    decoder: ContentDecoder,
    extractor: FieldExtractor,
}

impl FileParser {
    /// Create a parser
    #[must_use]
    pub const fn new() -> Self {
        Self {
            decoder: ContentDecoder::new(),
            extractor: FieldExtractor::new(),
        }
    }

    /// Parse one file, containing any failure.
    ///
    /// Unreadable or malformed files are logged as errors and come back as
    /// [`ParseStatus::Failed`] with no records.
    #[must_use]
    pub fn parse_file(&self, path: &Path) -> ParsedFile {
        match self.try_parse_file(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(file = %path.display(), "Error parsing {}: {e}", path.display());
                ParsedFile::failed(email_id_for(path), e.to_string())
            }
        }
    }

    /// Parse one file, propagating read and MIME errors.
    pub fn try_parse_file(&self, path: &Path) -> Result<ParsedFile> {
        let raw = fs::read(path)?;
        self.parse_bytes(&email_id_for(path), &raw)
    }

    /// Parse raw `.eml` bytes that belong to `email_id`.
    pub fn parse_bytes(&self, email_id: &str, raw: &[u8]) -> Result<ParsedFile> {
        let mail = mailparse::parse_mail(raw)?;

        let mut leaves = Vec::new();
        collect_leaves(&mail, &mut leaves);

        let (message, status) = match select_body(&leaves) {
            Some(body) => self.extract_message(email_id, body),
            None => {
                warn!(email_id, "No text/plain or text/html body found");
                (None, ParseStatus::NoBody)
            }
        };

        let attachments: Vec<AttachmentRecord> = leaves
            .iter()
            .filter_map(|part| attachment_record(email_id, part))
            .collect();

        debug!(
            email_id,
            has_message = message.is_some(),
            attachments = attachments.len(),
            "Parsed file"
        );

        Ok(ParsedFile {
            email_id: email_id.to_string(),
            message,
            attachments,
            status,
        })
    }

    fn extract_message(
        &self,
        email_id: &str,
        body: &ParsedMail<'_>,
    ) -> (Option<MessageRecord>, ParseStatus) {
        let decoded = self
            .decoder
            .decode(&MimePart::from_mail(body))
            .unwrap_or_default();

        let text = if body.ctype.mimetype.eq_ignore_ascii_case("text/html") {
            html_to_text(&decoded)
        } else {
            decoded.trim().to_string()
        };

        if !self.extractor.has_message_marker(&text) {
            warn!(email_id, "No Message ID found in body");
            return (None, ParseStatus::NoMessageMarker);
        }

        let fields = self.extractor.extract(&text);
        let message = MessageRecord {
            message_id: fields.message_id,
            timestamp: fields.timestamp,
            speaker_name: fields.speaker_name,
            speaker_contact: fields.speaker_contact,
            message: fields.message,
            ..MessageRecord::new(email_id)
        };

        (Some(message), ParseStatus::Parsed)
    }
}

/// Depth-first list of the non-multipart parts.
fn collect_leaves<'m, 'a>(mail: &'m ParsedMail<'a>, out: &mut Vec<&'m ParsedMail<'a>>) {
    if mail.subparts.is_empty() {
        out.push(mail);
    } else {
        for part in &mail.subparts {
            collect_leaves(part, out);
        }
    }
}

/// Prefer the first inline text/plain part, then the first inline text/html part.
fn select_body<'m, 'a>(leaves: &[&'m ParsedMail<'a>]) -> Option<&'m ParsedMail<'a>> {
    let inline = || leaves.iter().copied().filter(|part| !is_attachment(part));
    inline()
        .find(|part| part.ctype.mimetype.eq_ignore_ascii_case("text/plain"))
        .or_else(|| inline().find(|part| part.ctype.mimetype.eq_ignore_ascii_case("text/html")))
}

fn is_attachment(part: &ParsedMail<'_>) -> bool {
    part.get_content_disposition().disposition == DispositionType::Attachment
        || attachment_filename(part).is_some()
}

/// Filename from `Content-Disposition`, falling back to the `Content-Type` name.
fn attachment_filename(part: &ParsedMail<'_>) -> Option<String> {
    part.get_content_disposition()
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn attachment_record(email_id: &str, part: &ParsedMail<'_>) -> Option<AttachmentRecord> {
    let name = attachment_filename(part)?;
    let content_id = part
        .headers
        .get_first_value("Content-ID")
        .map(|cid| cid.trim().trim_matches(|c| c == '<' || c == '>').to_string())
        .filter(|cid| !cid.is_empty());

    Some(AttachmentRecord {
        content_id,
        content_type: Some(part.ctype.mimetype.clone()),
        ..AttachmentRecord::new(email_id, name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const MESSAGE_WITH_ATTACHMENT: &[u8] = b"From: Alice Example <alice@example.com>\r\n\
Subject: Test Email 1\r\n\
Message-ID: <8d798677-9a33-47d1-876c-a0efe27a7222@example.com>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=\"utf-8\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
TWVzc2FnZSBJRDogOGQ3OTg2NzctOWEzMy00N2QxLTg3NmMtYTBlZmUyN2E3MjIyCjIwMjUtMDkt\r\n\
MTRUMDU6MTk6MTQuODY0Njg4WiBBbGljZSBFeGFtcGxlIC0gYWxpY2VAZXhhbXBsZS5jb20gc2F5\r\n\
czoKSGVsbG8gdGVhbQo=\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=\"utf-8\"\r\n\
Content-ID: <cid-1@example.com>\r\n\
Content-Disposition: attachment; filename=\"report.txt\"\r\n\
\r\n\
This is a fake attachment.\r\n\
--XYZ--\r\n";

    #[test]
    fn test_email_id_is_file_stem() {
        assert_eq!(email_id_for(&PathBuf::from("/data/input/sample_1.eml")), "sample_1");
        assert_eq!(email_id_for(&PathBuf::from("archive.v2.eml")), "archive.v2");
    }

    #[test]
    fn test_parse_message_and_attachment() {
        let parsed = FileParser::new()
            .parse_bytes("sample_1", MESSAGE_WITH_ATTACHMENT)
            .unwrap();

        assert_eq!(parsed.status, ParseStatus::Parsed);
        let message = parsed.message.unwrap();
        assert_eq!(message.email_id, "sample_1");
        assert_eq!(
            message.message_id.as_deref(),
            Some("8d798677-9a33-47d1-876c-a0efe27a7222")
        );
        assert_eq!(message.speaker_name.as_deref(), Some("Alice Example"));
        assert_eq!(message.speaker_contact.as_deref(), Some("alice@example.com"));
        assert_eq!(message.message.as_deref(), Some("Hello team"));
        assert!(message.with_attachment.is_none());

        assert_eq!(parsed.attachments.len(), 1);
        let attachment = &parsed.attachments[0];
        assert_eq!(attachment.email_id, "sample_1");
        assert_eq!(attachment.attachment_name, "report.txt");
        assert_eq!(attachment.content_id.as_deref(), Some("cid-1@example.com"));
        assert_eq!(attachment.content_type.as_deref(), Some("text/plain"));
        assert!(attachment.message_id.is_none());
    }

    #[test]
    fn test_html_body_is_reduced_to_text() {
        let raw = b"Content-Type: text/html; charset=utf-8\r\n\r\n\
<html><body><p>Message ID: 8d798677-9a33-47d1-876c-a0efe27a7222</p>\
<p>2025-09-14T05:19:14Z Bob Demo - bob@example.com says:</p><p>See <b>you</b></p></body></html>\r\n";
        let parsed = FileParser::new().parse_bytes("html_1", raw).unwrap();
        let message = parsed.message.unwrap();
        assert_eq!(message.speaker_name.as_deref(), Some("Bob Demo"));
        assert_eq!(message.message.as_deref(), Some("See you"));
    }

    #[test]
    fn test_plain_preferred_over_html() {
        let raw = b"Content-Type: multipart/alternative; boundary=\"B\"\r\n\r\n\
--B\r\n\
Content-Type: text/html\r\n\r\n\
<p>no marker here</p>\r\n\
--B\r\n\
Content-Type: text/plain\r\n\r\n\
Message ID: 8d798677-9a33-47d1-876c-a0efe27a7222\r\n\
--B--\r\n";
        let parsed = FileParser::new().parse_bytes("alt", raw).unwrap();
        assert_eq!(parsed.status, ParseStatus::Parsed);
        assert!(parsed.message.is_some());
    }

    #[test]
    fn test_body_without_marker_yields_no_message() {
        let raw = b"Content-Type: text/plain\r\n\r\nJust a normal email.\r\n";
        let parsed = FileParser::new().parse_bytes("plain", raw).unwrap();
        assert_eq!(parsed.status, ParseStatus::NoMessageMarker);
        assert!(parsed.message.is_none());
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn test_attachments_recorded_without_message() {
        let raw = b"Content-Type: multipart/mixed; boundary=\"B\"\r\n\r\n\
--B\r\n\
Content-Type: text/plain\r\n\r\n\
no marker\r\n\
--B\r\n\
Content-Type: image/png; name=\"logo.png\"\r\n\
Content-Transfer-Encoding: base64\r\n\r\n\
iVBORw0KGgo=\r\n\
--B--\r\n";
        let parsed = FileParser::new().parse_bytes("img", raw).unwrap();
        assert!(parsed.message.is_none());
        assert_eq!(parsed.attachments.len(), 1);
        assert_eq!(parsed.attachments[0].attachment_name, "logo.png");
        assert!(parsed.attachments[0].content_id.is_none());
    }

    #[test]
    fn test_unreadable_file_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.eml");
        let parsed = FileParser::new().parse_file(&missing);
        assert!(parsed.is_failed());
        assert_eq!(parsed.email_id, "missing");
    }
}
