//! MIME rendering for assembled messages.
//!
//! Provides RFC 5322 compliant output with:
//! - Header encoding in the message charset (RFC 2047)
//! - Header folding at 78 columns
//! - Charset and content type validation

use std::fmt;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use encoding_rs::Encoding;

use crate::assembler::AssembledMessage;
use crate::errors::{MailError, MailErrorKind, MailResult};
use crate::types::Address;

/// Longest header line before folding.
const MAX_LINE_LEN: usize = 78;

/// Input bytes per RFC 2047 encoded word, keeping each word under 75 chars.
const ENCODED_WORD_CHUNK: usize = 45;

/// A validated charset name.
#[derive(Clone, PartialEq, Eq)]
pub struct Charset {
    label: String,
    encoding: &'static Encoding,
    ascii_only: bool,
}

/// Labels WHATWG folds into windows-1252 that still mean 7-bit ASCII.
const ASCII_LABELS: &[&str] = &["us-ascii", "ascii", "ansi_x3.4-1968"];

impl Charset {
    /// Looks up a charset by its IANA/WHATWG label.
    pub fn new(label: &str) -> MailResult<Self> {
        let label = label.trim();
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            MailError::new(MailErrorKind::InvalidCharset, format!("Unknown charset: {}", label))
        })?;

        Ok(Self {
            label: label.to_string(),
            encoding,
            ascii_only: ASCII_LABELS.iter().any(|a| a.eq_ignore_ascii_case(label)),
        })
    }

    /// UTF-8.
    pub fn utf8() -> Self {
        Self {
            label: "UTF-8".to_string(),
            encoding: encoding_rs::UTF_8,
            ascii_only: false,
        }
    }

    /// Returns the label as supplied by the caller.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the label to declare for encoded output.
    ///
    /// The caller's label is kept when it names the encoding actually
    /// produced. Aliases that resolve elsewhere (`ISO-8859-1` is
    /// windows-1252) declare the canonical name, and encodings that cannot
    /// be produced (UTF-16, replacement) declare their output encoding.
    pub fn output_label(&self) -> &str {
        if self.ascii_only {
            return "US-ASCII";
        }

        let output = self.encoding.output_encoding();
        if output == self.encoding && self.label.eq_ignore_ascii_case(output.name()) {
            &self.label
        } else {
            output.name()
        }
    }

    /// Encodes `text`, or returns None if a character is unmappable.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        if self.ascii_only {
            return text.is_ascii().then(|| text.as_bytes().to_vec());
        }

        let (bytes, _, had_errors) = self.encoding.encode(text);
        (!had_errors).then(|| bytes.into_owned())
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.label).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Message body with its content type.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    body: String,
    content_type: mime::Mime,
}

impl Content {
    /// Creates content, parsing `content_type`.
    pub fn new(body: impl Into<String>, content_type: &str) -> MailResult<Self> {
        let content_type: mime::Mime = content_type.trim().parse().map_err(|e| {
            MailError::new(
                MailErrorKind::InvalidContentType,
                format!("Invalid content type {}: {}", content_type, e),
            )
        })?;

        Ok(Self {
            body: body.into(),
            content_type,
        })
    }

    /// Returns the body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the parsed content type.
    pub fn content_type(&self) -> &mime::Mime {
        &self.content_type
    }

    /// Returns the `charset` parameter, if present.
    pub fn charset_param(&self) -> Option<&str> {
        self.content_type.get_param(mime::CHARSET).map(|c| c.as_str())
    }

    /// Returns the Content-Type header value. Text types declare `charset`
    /// as the body is actually encoded, replacing any supplied parameter.
    pub fn header_value(&self, charset: Option<&Charset>) -> String {
        let charset = match charset {
            Some(charset) if self.content_type.type_() == mime::TEXT => charset,
            _ => return self.content_type.to_string(),
        };

        let mut value = self.content_type.essence_str().to_string();
        for (name, param) in self.content_type.params() {
            if name != mime::CHARSET {
                value.push_str(&format!("; {}={}", name, param));
            }
        }
        value.push_str(&format!("; charset={}", charset.output_label()));
        value
    }
}

/// Writes an [`AssembledMessage`] in RFC 5322 form.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeWriter;

impl MimeWriter {
    /// Renders the message. Bcc recipients are never written.
    pub fn render(message: &AssembledMessage) -> Vec<u8> {
        let charset = message.charset().cloned().unwrap_or_else(Charset::utf8);
        let mut output = Vec::new();

        write_header(&mut output, "Date", &message.sent_date().to_rfc2822());
        write_header(&mut output, "From", &encode_address(message.from(), &charset));

        for (name, list) in [
            ("To", message.to()),
            ("Cc", message.cc()),
            ("Reply-To", message.reply_to()),
        ] {
            if !list.is_empty() {
                let rendered: Vec<String> = list.iter().map(|a| encode_address(a, &charset)).collect();
                write_header(&mut output, name, &rendered.join(", "));
            }
        }

        if let Some(subject) = message.subject() {
            write_header(&mut output, "Subject", &encode_text(subject, &charset));
        }

        write_header(&mut output, "Message-ID", message.message_id());

        for header in message.headers().iter() {
            if header.name.eq_ignore_ascii_case("Message-ID") {
                continue;
            }
            write_header(&mut output, &header.name, &encode_text(&header.value, &charset));
        }

        write_header(&mut output, "MIME-Version", "1.0");

        match message.content() {
            Some(content) => {
                let declared = content
                    .charset_param()
                    .and_then(|label| Charset::new(label).ok())
                    .unwrap_or_else(|| charset.clone());
                let body = normalize_line_endings(content.body());

                // Unmappable text goes out as UTF-8 and is declared as such.
                let (body_charset, bytes) = match declared.encode(&body) {
                    Some(bytes) => (declared, bytes),
                    None => (Charset::utf8(), body.into_bytes()),
                };

                write_header(
                    &mut output,
                    "Content-Type",
                    &content.header_value(Some(&body_charset)),
                );
                write_header(
                    &mut output,
                    "Content-Transfer-Encoding",
                    if bytes.is_ascii() { "7bit" } else { "8bit" },
                );
                output.extend_from_slice(b"\r\n");
                output.extend_from_slice(&bytes);
                if !bytes.ends_with(b"\r\n") {
                    output.extend_from_slice(b"\r\n");
                }
            }
            None => {
                if let Some(charset) = message.charset() {
                    write_header(
                        &mut output,
                        "Content-Type",
                        &format!("text/plain; charset={}", charset.output_label()),
                    );
                }
                output.extend_from_slice(b"\r\n");
            }
        }

        output
    }
}

fn write_header(output: &mut Vec<u8>, name: &str, value: &str) {
    let header = format!("{}: {}", name, value);
    output.extend_from_slice(fold_header(&header).as_bytes());
    output.extend_from_slice(b"\r\n");
}

/// Folds a header line at whitespace so lines stay within 78 characters.
fn fold_header(header: &str) -> String {
    if header.len() <= MAX_LINE_LEN {
        return header.to_string();
    }

    // Each segment is a word with the whitespace run before it, so a fold
    // only inserts CRLF and unfolding restores the original line.
    let bytes = header.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    for i in 1..bytes.len() {
        if bytes[i] == b' ' && bytes[i - 1] != b' ' {
            segments.push(&header[start..i]);
            start = i;
        }
    }
    segments.push(&header[start..]);

    let mut result = String::with_capacity(header.len() + 8);
    let mut line_len = 0;
    for segment in segments {
        if line_len > 0 && line_len + segment.len() > MAX_LINE_LEN && !segment.trim().is_empty() {
            result.push_str("\r\n");
            line_len = 0;
        }
        result.push_str(segment);
        line_len += segment.len();
    }

    result
}

/// Encodes a header value using RFC 2047 B-encoding when it is not plain ASCII.
fn encode_text(value: &str, charset: &Charset) -> String {
    if value.chars().all(|c| c.is_ascii() && !c.is_control()) {
        return value.to_string();
    }

    // Fall back to UTF-8 when the declared charset cannot represent the text.
    let charset = match charset.encode(value) {
        Some(_) => charset.clone(),
        None => Charset::utf8(),
    };

    let mut words = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0;

    for c in value.chars() {
        let len = charset.encode(c.encode_utf8(&mut [0; 4])).map_or(c.len_utf8(), |b| b.len());
        if chunk_len + len > ENCODED_WORD_CHUNK && !chunk.is_empty() {
            words.push(encoded_word(&chunk, &charset));
            chunk.clear();
            chunk_len = 0;
        }
        chunk.push(c);
        chunk_len += len;
    }

    if !chunk.is_empty() {
        words.push(encoded_word(&chunk, &charset));
    }

    words.join(" ")
}

fn encoded_word(text: &str, charset: &Charset) -> String {
    let bytes = charset.encode(text).unwrap_or_else(|| text.as_bytes().to_vec());
    format!("=?{}?B?{}?=", charset.output_label(), BASE64.encode(bytes))
}

/// Formats an address, encoding a non-ASCII display name.
fn encode_address(address: &Address, charset: &Charset) -> String {
    match address.name() {
        Some(name) if !name.is_ascii() => {
            format!("{} <{}>", encode_text(name, charset), address.email())
        }
        _ => address.to_header(),
    }
}

fn normalize_line_endings(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\n', "\r\n")
}
