//! MIME part content decoding
//!
//! Turns one body or attachment part into text. The transfer encoding picks the
//! byte decoder, the declared charset (default utf-8) turns bytes into text, and
//! undecodable sequences are replaced rather than rejected. A part that still
//! cannot be decoded yields `None` so that one bad part never sinks its file.

use std::borrow::Cow;
use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use charset::Charset;
use mailparse::{body::Body, MailHeaderMap, ParsedMail};
use regex::{Captures, Regex};
use tracing::error;

use crate::error::{EtlError, Result};

static ENTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid")
});

const DEFAULT_CHARSET: &str = "utf-8";

/// Raw payload of a single MIME part plus the labels needed to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    /// Payload bytes exactly as they appear in the file (still transfer-encoded)
    pub payload: Vec<u8>,
    /// `Content-Transfer-Encoding` header value, if any
    pub transfer_encoding: Option<String>,
    /// `charset` parameter of `Content-Type`, if declared
    pub charset: Option<String>,
}

impl MimePart {
    /// Build a part directly from its pieces.
    pub fn new(
        payload: impl Into<Vec<u8>>,
        transfer_encoding: Option<&str>,
        charset: Option<&str>,
    ) -> Self {
        Self {
            payload: payload.into(),
            transfer_encoding: transfer_encoding.map(str::to_string),
            charset: charset.map(str::to_string),
        }
    }

    /// Capture the still-encoded payload of a parsed mailparse part.
    #[must_use]
    pub fn from_mail(part: &ParsedMail<'_>) -> Self {
        let payload = match part.get_body_encoded() {
            Body::Base64(body) | Body::QuotedPrintable(body) => body.get_raw().to_vec(),
            Body::SevenBit(body) | Body::EightBit(body) => body.get_raw().to_vec(),
            Body::Binary(body) => body.get_raw().to_vec(),
        };

        Self {
            payload,
            transfer_encoding: part.headers.get_first_value("Content-Transfer-Encoding"),
            // mailparse fills `ctype.charset` with us-ascii when nothing is declared,
            // so read the raw parameter to keep the utf-8 default.
            charset: part.ctype.params.get("charset").cloned(),
        }
    }
}

/// Decodes MIME parts into text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentDecoder;

impl ContentDecoder {
    /// Create a decoder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a part, logging and swallowing any failure.
    #[must_use]
    pub fn decode(&self, part: &MimePart) -> Option<String> {
        match self.try_decode(part) {
            Ok(text) => Some(text),
            Err(e) => {
                error!(
                    encoding = part.transfer_encoding.as_deref().unwrap_or(""),
                    charset = part.charset.as_deref().unwrap_or(DEFAULT_CHARSET),
                    "Failed to decode content: {e}"
                );
                None
            }
        }
    }

    /// Decode a part, reporting why it could not be decoded.
    pub fn try_decode(&self, part: &MimePart) -> Result<String> {
        let encoding = part
            .transfer_encoding
            .as_deref()
            .map(|cte| cte.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let bytes: Cow<'_, [u8]> = match encoding.as_str() {
            "base64" => Cow::Owned(decode_base64(&part.payload)?),
            "quoted-printable" => Cow::Owned(
                quoted_printable::decode(&part.payload, quoted_printable::ParseMode::Robust)
                    .map_err(|e| EtlError::Decode(format!("quoted-printable: {e}")))?,
            ),
            // 7bit, 8bit, binary and anything unrecognised are already raw text bytes
            _ => Cow::Borrowed(part.payload.as_slice()),
        };

        decode_charset(&bytes, part.charset.as_deref().unwrap_or(DEFAULT_CHARSET))
    }
}

fn decode_base64(payload: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| EtlError::Decode(format!("base64: {e}")))
}

/// Decode bytes in the named charset, replacing malformed sequences.
pub fn decode_charset(bytes: &[u8], label: &str) -> Result<String> {
    let charset = Charset::for_label(label.trim().as_bytes())
        .ok_or_else(|| EtlError::Decode(format!("unknown charset '{label}'")))?;
    let (text, _had_errors) = charset.decode_without_bom_handling(bytes);
    Ok(text.into_owned())
}

/// Reduce HTML to its visible text.
///
/// Text nodes are trimmed, empty ones dropped, and the rest joined by single
/// spaces. Comments plus `<script>` and `<style>` content are skipped. Named
/// entities for markup characters and all numeric character references are
/// unescaped.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut tag = String::new();
    let mut in_tag = false;
    let mut skipping = false;

    for c in html.chars() {
        if in_tag {
            // A comment only closes on `-->`, so a bare `>` inside it is content.
            let open_comment = tag.starts_with("!--") && !(tag.len() >= 5 && tag.ends_with("--"));
            if c == '>' && !open_comment {
                in_tag = false;
                let name = tag.trim().to_ascii_lowercase();
                if name.starts_with("script") || name.starts_with("style") {
                    skipping = true;
                } else if name.starts_with("/script") || name.starts_with("/style") {
                    skipping = false;
                }
                tag.clear();
            } else {
                tag.push(c);
            }
        } else if c == '<' {
            in_tag = true;
            push_segment(&mut segments, &current);
            current.clear();
        } else if !skipping {
            current.push(c);
        }
    }
    push_segment(&mut segments, &current);

    segments.join(" ")
}

fn push_segment(segments: &mut Vec<String>, raw: &str) {
    let text = unescape_entities(raw.trim());
    let text = text.trim();
    if !text.is_empty() {
        segments.push(text.to_string());
    }
}

/// Single pass, so `&amp;lt;` becomes `&lt;` and not `<`. Unknown names and
/// invalid code points are left as written.
fn unescape_entities(text: &str) -> String {
    ENTITY_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "nbsp" => Some(' '),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "amp" => Some('&'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_utf8() {
        let part = MimePart::new("SGVsbG8g\r\nd29ybGQ=\r\n", Some("base64"), Some("utf-8"));
        assert_eq!(ContentDecoder::new().decode(&part).as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_decode_is_case_insensitive_on_encoding() {
        let part = MimePart::new("SGk=", Some(" BASE64 "), None);
        assert_eq!(ContentDecoder::new().decode(&part).as_deref(), Some("Hi"));
    }

    #[test]
    fn test_decode_quoted_printable_latin1() {
        let part = MimePart::new("caf=E9 cr=E8me", Some("quoted-printable"), Some("iso-8859-1"));
        assert_eq!(ContentDecoder::new().decode(&part).as_deref(), Some("café crème"));
    }

    #[test]
    fn test_decode_quoted_printable_soft_breaks() {
        let part = MimePart::new("long =\r\nline", Some("quoted-printable"), None);
        assert_eq!(ContentDecoder::new().decode(&part).as_deref(), Some("long line"));
    }

    #[test]
    fn test_seven_bit_passes_through() {
        let part = MimePart::new("plain text", Some("7bit"), None);
        assert_eq!(ContentDecoder::new().decode(&part).as_deref(), Some("plain text"));
    }

    #[test]
    fn test_missing_encoding_treated_as_raw() {
        let part = MimePart::new("no header", None, None);
        assert_eq!(ContentDecoder::new().decode(&part).as_deref(), Some("no header"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let part = MimePart::new(vec![b'o', b'k', 0xFF, b'!'], Some("8bit"), Some("utf-8"));
        let text = ContentDecoder::new().decode(&part).unwrap();
        assert_eq!(text, "ok\u{FFFD}!");
    }

    #[test]
    fn test_malformed_base64_yields_none() {
        let part = MimePart::new("!!!not base64***", Some("base64"), None);
        assert!(ContentDecoder::new().decode(&part).is_none());
    }

    #[test]
    fn test_unknown_charset_yields_none() {
        let part = MimePart::new("text", Some("7bit"), Some("x-no-such-charset"));
        assert!(ContentDecoder::new().decode(&part).is_none());
    }

    #[test]
    fn test_from_mail_keeps_encoded_payload() {
        let raw = b"Content-Type: text/plain; charset=utf-8\r\n\
                    Content-Transfer-Encoding: base64\r\n\
                    \r\n\
                    SGk=\r\n";
        let parsed = mailparse::parse_mail(raw).unwrap();
        let part = MimePart::from_mail(&parsed);
        assert_eq!(part.transfer_encoding.as_deref(), Some("base64"));
        assert_eq!(part.charset.as_deref(), Some("utf-8"));
        assert_eq!(ContentDecoder::new().decode(&part).as_deref(), Some("Hi"));
    }

    #[test]
    fn test_from_mail_without_charset() {
        let raw = b"Content-Type: text/plain\r\n\r\nbody\r\n";
        let parsed = mailparse::parse_mail(raw).unwrap();
        assert!(MimePart::from_mail(&parsed).charset.is_none());
    }

    #[test]
    fn test_html_to_text() {
        let html = "<html><head><style>p { color: red; }</style></head>\
                    <body><p>Message ID: abc</p><p>Hello &amp; <b>welcome</b></p></body></html>";
        assert_eq!(html_to_text(html), "Message ID: abc Hello & welcome");
    }

    #[test]
    fn test_html_to_text_skips_script() {
        let html = "<div>before</div><script>var x = 1;</script><div>after</div>";
        assert_eq!(html_to_text(html), "before after");
    }

    #[test]
    fn test_html_to_text_drops_comments() {
        let html = "<p>kept</p><!-- if a > b then <b>hidden</b> --><p>also kept</p><!---->";
        assert_eq!(html_to_text(html), "kept also kept");
    }

    #[test]
    fn test_html_to_text_numeric_entities() {
        let html = "<p>it&#8217;s&#x2014;fine &#39;ok&#39; &#X41;</p>";
        assert_eq!(html_to_text(html), "it\u{2019}s\u{2014}fine 'ok' A");
    }

    #[test]
    fn test_html_to_text_unescapes_once() {
        assert_eq!(html_to_text("<p>&amp;lt;b&amp;gt;</p>"), "&lt;b&gt;");
        assert_eq!(html_to_text("<p>&bogus; &#1114112; &apos;</p>"), "&bogus; &#1114112; '");
    }
}
