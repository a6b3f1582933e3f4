//! Sample archive generator
//!
//! Writes small multipart `.eml` files that follow the transcript convention, for
//! demos and end-to-end tests.

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

const SPEAKERS: &[(&str, &str)] = &[
    ("Alice Example", "alice@example.com"),
    ("Bob Demo", "bob@example.com"),
    ("Carol Sample", "carol.sample@example.org"),
];

const LINES: &[&str] = &[
    "Hello team, please find the weekly report.",
    "Quick reminder about tomorrow's sync.",
    "Sharing the notes from today's call.",
];

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEmail {
    /// Written `.eml` file
    pub path: PathBuf,
    /// UUID written after `Message ID:` in the body
    pub message_id: Uuid,
    /// Whether a text attachment was included
    pub has_attachment: bool,
}

/// Write `count` files named `sample_<i>.eml` into `dir`.
///
/// Even indices carry one `attachment_<i>.txt` part with its own Content-ID.
pub fn generate_sample_emails(dir: &Path, count: usize) -> Result<Vec<SampleEmail>> {
    fs::create_dir_all(dir)?;

    let mut generated = Vec::with_capacity(count);
    for index in 0..count {
        let message_id = Uuid::new_v4();
        let has_attachment = index % 2 == 0;
        let path = dir.join(format!("sample_{index}.eml"));

        fs::write(&path, render(index, message_id, has_attachment))?;
        generated.push(SampleEmail {
            path,
            message_id,
            has_attachment,
        });
    }

    info!("Generated {count} sample emails in {}", dir.display());
    Ok(generated)
}

fn render(index: usize, message_id: Uuid, has_attachment: bool) -> String {
    let (name, address) = SPEAKERS[index % SPEAKERS.len()];
    let line = LINES[index % LINES.len()];
    let now = Utc::now();
    let boundary = format!("=={}==", message_id.simple());

    let transcript = format!(
        "Message ID: {message_id}\r\n{} {name} - {address} says:\r\n{line}\r\n",
        now.format("%Y-%m-%dT%H:%M:%S%.6fZ")
    );

    let mut mail = format!(
        "From: {name} <{address}>\r\n\
         To: team@example.com\r\n\
         Subject: Sample email {index}\r\n\
         Date: {}\r\n\
         Message-ID: <{message_id}@example.com>\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\
         \r\n\
         --{boundary}\r\n\
         Content-Type: text/plain; charset=\"utf-8\"\r\n\
         Content-Transfer-Encoding: 7bit\r\n\
         \r\n\
         {transcript}",
        now.to_rfc2822()
    );

    if has_attachment {
        let file_name = format!("attachment_{index}.txt");
        let payload = STANDARD.encode(format!("This is attachment number {index}.\n"));
        mail.push_str(&format!(
            "--{boundary}\r\n\
             Content-Type: text/plain; charset=\"utf-8\"; name=\"{file_name}\"\r\n\
             Content-Disposition: attachment; filename=\"{file_name}\"\r\n\
             Content-ID: <attachment-{index}-{}@example.com>\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {payload}\r\n",
            message_id.simple()
        ));
    }

    mail.push_str(&format!("--{boundary}--\r\n"));
    mail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FileParser;

    #[test]
    fn test_generated_files_parse() {
        let dir = tempfile::tempdir().unwrap();
        let samples = generate_sample_emails(dir.path(), 3).unwrap();
        assert_eq!(samples.len(), 3);

        let parser = FileParser::new();
        for sample in &samples {
            let parsed = parser.try_parse_file(&sample.path).unwrap();
            let message = parsed.message.expect("sample has a message");
            assert_eq!(message.message_id, Some(sample.message_id.to_string()));
            assert!(message.speaker_contact.is_some());
            assert_eq!(parsed.attachments.len(), usize::from(sample.has_attachment));
        }
    }

    #[test]
    fn test_even_indices_have_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let samples = generate_sample_emails(dir.path(), 4).unwrap();
        let flags: Vec<bool> = samples.iter().map(|s| s.has_attachment).collect();
        assert_eq!(flags, vec![true, false, true, false]);
    }
}
