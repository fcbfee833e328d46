//! Custom header storage.

use indexmap::IndexMap;

use crate::errors::{MailError, MailResult};

/// Headers the renderer writes from message fields. `Message-ID` is not
/// listed: a custom value replaces the generated one.
const GENERATED_HEADERS: &[&str] = &[
    "Date",
    "From",
    "To",
    "Cc",
    "Bcc",
    "Reply-To",
    "Subject",
    "MIME-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
];

/// A custom header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name as last supplied.
    pub name: String,
    /// Unfolded header value.
    pub value: String,
}

/// Ordered custom headers.
///
/// Names compare case-insensitively. Adding an existing name overwrites its
/// value in place, so iteration keeps first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderStore {
    entries: IndexMap<String, Header>,
}

impl HeaderStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites a header.
    pub fn add(&mut self, name: &str, value: &str) -> MailResult<()> {
        validate_name(name)?;
        validate_value(name, value)?;

        self.entries.insert(
            name.to_ascii_lowercase(),
            Header {
                name: name.to_string(),
                value: value.to_string(),
            },
        );
        Ok(())
    }

    /// Returns the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|h| h.value.as_str())
    }

    /// Returns true if a header named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterates headers in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.values()
    }

    /// Returns the number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no header is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every header.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the whole store, validating every pair first.
    pub fn replace_all<I, N, V>(&mut self, headers: I) -> MailResult<()>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fresh = HeaderStore::new();
        for (name, value) in headers {
            fresh.add(name.as_ref(), value.as_ref())?;
        }
        *self = fresh;
        Ok(())
    }
}

/// Field names are printable US-ASCII without a colon (RFC 5322 section 2.2).
fn validate_name(name: &str) -> MailResult<()> {
    if name.is_empty() {
        return Err(MailError::invalid_header("Header name cannot be empty"));
    }

    if !name.bytes().all(|b| (33..=126).contains(&b) && b != b':') {
        return Err(MailError::invalid_header(format!(
            "Invalid header name: {}",
            name.escape_debug()
        )));
    }

    if GENERATED_HEADERS.iter().any(|g| g.eq_ignore_ascii_case(name)) {
        return Err(MailError::invalid_header(format!(
            "Header {} is written from the message fields and cannot be set directly",
            name
        )));
    }

    Ok(())
}

fn validate_value(name: &str, value: &str) -> MailResult<()> {
    if value.is_empty() {
        return Err(MailError::invalid_header(format!(
            "Value for header {} cannot be empty",
            name
        )));
    }

    // Folding happens at render time; raw line breaks would inject headers.
    if value.contains(['\r', '\n']) {
        return Err(MailError::invalid_header(format!(
            "Value for header {} contains a line break",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MailErrorKind;

    #[test]
    fn test_add_and_get() {
        let mut headers = HeaderStore::new();
        headers.add("1", "Sendmail").unwrap();
        assert_eq!(headers.get("1"), Some("Sendmail"));
        assert_eq!(headers.get("2"), None);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut headers = HeaderStore::new();
        let err = headers.add("", "Sendmail").unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::InvalidHeader);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_empty_value_rejected() {
        let mut headers = HeaderStore::new();
        let err = headers.add("abc@gmail.com", "").unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::InvalidHeader);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_malformed_names_rejected() {
        let mut headers = HeaderStore::new();
        assert!(headers.add("X Mailer", "v").is_err());
        assert!(headers.add("X-Mailer:", "v").is_err());
        assert!(headers.add("X-Mäiler", "v").is_err());
    }

    #[test]
    fn test_generated_names_rejected() {
        let mut headers = HeaderStore::new();
        for name in ["Subject", "from", "BCC", "Date", "To", "MIME-Version", "content-type"] {
            let err = headers.add(name, "value").unwrap_err();
            assert_eq!(err.kind(), MailErrorKind::InvalidHeader);
        }
        assert!(headers.is_empty());

        headers.add("Message-ID", "<fixed@example.com>").unwrap();
        assert!(headers.contains("message-id"));
    }

    #[test]
    fn test_line_break_in_value_rejected() {
        let mut headers = HeaderStore::new();
        let err = headers.add("X-Note", "a\r\nBcc: victim@example.com").unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::InvalidHeader);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut headers = HeaderStore::new();
        headers.add("X-First", "1").unwrap();
        headers.add("X-Second", "2").unwrap();
        headers.add("x-first", "one").unwrap();

        let pairs: Vec<(&str, &str)> = headers
            .iter()
            .map(|h| (h.name.as_str(), h.value.as_str()))
            .collect();
        assert_eq!(pairs, [("x-first", "one"), ("X-Second", "2")]);
        assert_eq!(headers.get("X-FIRST"), Some("one"));
    }

    #[test]
    fn test_replace_all_is_atomic() {
        let mut headers = HeaderStore::new();
        headers.add("X-Keep", "yes").unwrap();

        let result = headers.replace_all([("X-New", "1"), ("", "2")]);
        assert!(result.is_err());
        assert_eq!(headers.get("X-Keep"), Some("yes"));

        headers.replace_all([("X-New", "1")]).unwrap();
        assert!(!headers.contains("X-Keep"));
        assert_eq!(headers.len(), 1);
    }
}
