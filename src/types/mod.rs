//! Core types for message assembly.
//!
//! This module provides:
//! - [`Address`], the validated mailbox value, and its parser
//! - [`RecipientRole`], the four recipient categories

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::errors::{MailError, MailResult};

/// Maximum length of a complete address (RFC 5321).
pub const MAX_ADDRESS_LEN: usize = 254;

/// Maximum length of the local part (RFC 5321).
pub const MAX_LOCAL_PART_LEN: usize = 64;

/// Characters that need quoting in a display name (RFC 5322 specials).
const NAME_SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];

/// Characters never allowed in an unquoted local part.
const LOCAL_SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '"'];

/// Email address with optional display name.
///
/// Only constructed through [`Address::validate`] (or the convenience
/// wrappers built on it), so every value in circulation has passed the
/// syntax check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    name: Option<String>,
    email: String,
}

impl Address {
    /// Validates `raw` and attaches an optional display name.
    ///
    /// `raw` may be a bare address or `Name <address>`. An explicit,
    /// non-blank `display_name` replaces any name parsed from `raw`.
    pub fn validate(raw: &str, display_name: Option<&str>) -> MailResult<Self> {
        let (parsed_name, email) = split_display_form(raw)?;
        validate_email(email)?;

        let name = match display_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => Some(name.to_string()),
            None => parsed_name,
        };
        if let Some(name) = &name {
            validate_display_name(name)?;
        }

        Ok(Self {
            name,
            email: email.to_string(),
        })
    }

    /// Parses an address without a display name override.
    pub fn parse(raw: &str) -> MailResult<Self> {
        Self::validate(raw, None)
    }

    /// Creates an address with a display name.
    pub fn with_name(name: &str, email: &str) -> MailResult<Self> {
        Self::validate(email, Some(name))
    }

    /// Returns the `local@domain` part only.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name if present.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the local part.
    pub fn local_part(&self) -> &str {
        self.email.rsplit_once('@').map(|(l, _)| l).unwrap_or(&self.email)
    }

    /// Returns the domain.
    pub fn domain(&self) -> &str {
        self.email.rsplit_once('@').map(|(_, d)| d).unwrap_or("")
    }

    /// Formats the address for SMTP MAIL FROM/RCPT TO commands.
    pub fn to_smtp(&self) -> String {
        format!("<{}>", self.email)
    }

    /// Formats the address for a header, quoting the name when needed.
    pub fn to_header(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", quote_display_name(name), self.email),
            None => self.email.clone(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_header())
    }
}

impl TryFrom<&str> for Address {
    type Error = MailError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = MailError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Address::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_header()
    }
}

/// Splits `Name <addr>` into its parts; bare addresses pass through.
///
/// A `<` inside a quoted name does not open the address, and quoted names
/// are unescaped, so this inverts [`Address::to_header`].
fn split_display_form(raw: &str) -> MailResult<(Option<String>, &str)> {
    let raw = raw.trim();

    let mut in_quotes = false;
    let mut escaped = false;
    let mut open = None;
    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => {
                open = Some(i);
                break;
            }
            _ => {}
        }
    }

    match open {
        Some(start) if raw.ends_with('>') && start < raw.len() - 1 => {
            let name = unquote_display_name(raw[..start].trim());
            let email = raw[start + 1..raw.len() - 1].trim();
            Ok((name, email))
        }
        None if !raw.contains(['<', '>']) => Ok((None, raw)),
        _ => Err(MailError::invalid_address(format!(
            "Unbalanced angle brackets in address: {}",
            raw
        ))),
    }
}

/// Strips surrounding quotes and resolves `\\` escapes.
fn unquote_display_name(name: &str) -> Option<String> {
    let unquoted = match name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => out.extend(chars.next()),
                    c => out.push(c),
                }
            }
            out
        }
        None => name.to_string(),
    };

    let trimmed = unquoted.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Display names are written into header lines, so control characters
/// (CR and LF included) are refused.
fn validate_display_name(name: &str) -> MailResult<()> {
    if name.chars().any(char::is_control) {
        return Err(MailError::invalid_address(format!(
            "Display name contains control characters: {}",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// Validates a bare `local@domain` address.
fn validate_email(email: &str) -> MailResult<()> {
    if email.is_empty() {
        return Err(MailError::invalid_address("Email address cannot be empty"));
    }

    if email.len() > MAX_ADDRESS_LEN {
        return Err(MailError::invalid_address(format!(
            "Email address too long (max {} characters)",
            MAX_ADDRESS_LEN
        )));
    }

    if email.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(MailError::invalid_address(format!(
            "Email address cannot contain whitespace or control characters: {}",
            email
        )));
    }

    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => {
            return Err(MailError::invalid_address(format!(
                "Email address must contain exactly one @: {}",
                email
            )))
        }
    };

    if local.is_empty() || local.len() > MAX_LOCAL_PART_LEN {
        return Err(MailError::invalid_address(format!(
            "Local part must be 1-{} characters: {}",
            MAX_LOCAL_PART_LEN, email
        )));
    }

    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(MailError::invalid_address(format!(
            "Local part has a misplaced dot: {}",
            email
        )));
    }

    if local.contains(LOCAL_SPECIALS) {
        return Err(MailError::invalid_address(format!(
            "Local part contains special characters: {}",
            email
        )));
    }

    validate_domain(domain).map_err(|reason| {
        MailError::invalid_address(format!("{}: {}", reason, email))
    })
}

fn validate_domain(domain: &str) -> Result<(), &'static str> {
    if domain.is_empty() {
        return Err("Domain cannot be empty");
    }

    // Domain literal, e.g. [192.168.0.1]
    if let Some(literal) = domain.strip_prefix('[') {
        return match literal.strip_suffix(']') {
            Some(inner) if !inner.is_empty() && !inner.contains(['[', ']']) => Ok(()),
            _ => Err("Malformed domain literal"),
        };
    }

    if domain.split('.').any(str::is_empty) {
        return Err("Domain contains an empty label");
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '.')
    {
        return Err("Domain contains invalid characters");
    }

    Ok(())
}

/// Quotes a display name if it contains RFC 5322 specials.
fn quote_display_name(name: &str) -> String {
    if name.contains(NAME_SPECIALS) {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        name.to_string()
    }
}

/// Recipient category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    /// Primary recipients.
    To,
    /// Carbon-copy recipients.
    Cc,
    /// Blind carbon-copy recipients.
    Bcc,
    /// Reply-To addresses (not delivery recipients).
    ReplyTo,
}

impl RecipientRole {
    /// All roles in header order.
    pub const ALL: [RecipientRole; 4] = [
        RecipientRole::To,
        RecipientRole::Cc,
        RecipientRole::Bcc,
        RecipientRole::ReplyTo,
    ];

    /// Returns the header name for this role.
    pub fn header_name(&self) -> &'static str {
        match self {
            RecipientRole::To => "To",
            RecipientRole::Cc => "Cc",
            RecipientRole::Bcc => "Bcc",
            RecipientRole::ReplyTo => "Reply-To",
        }
    }

    /// Returns true if addresses in this role receive the message.
    pub fn is_delivery_role(&self) -> bool {
        !matches!(self, RecipientRole::ReplyTo)
    }
}

impl fmt::Display for RecipientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MailErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case("ab@bc.com")]
    #[case("a.b@c.org")]
    #[case("abcdefghijklmnopqrst@abcdefghijklmnopqrst.com.bd")]
    #[case("first+tag@sub.example.com")]
    #[case("o'brien@example.ie")]
    #[case("admin@[192.168.0.1]")]
    #[case("user@localhost")]
    fn test_valid_addresses(#[case] raw: &str) {
        let addr = Address::parse(raw).unwrap();
        assert_eq!(addr.email(), raw);
        assert_eq!(addr.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("JohnSmith")]
    #[case("two@@signs.com")]
    #[case("a@b@c.com")]
    #[case("@no-local.com")]
    #[case("no-domain@")]
    #[case("has space@example.com")]
    #[case(".leading@example.com")]
    #[case("trailing.@example.com")]
    #[case("double..dot@example.com")]
    #[case("user@example..com")]
    #[case("user@.example.com")]
    #[case("us(er@example.com")]
    #[case("user@exa_mple.com")]
    #[case("Name <user@example.com")]
    #[case("user@example.com>")]
    fn test_invalid_addresses(#[case] raw: &str) {
        let err = Address::parse(raw).unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::InvalidAddress);
    }

    #[test]
    fn test_local_part_length_limit() {
        let local = "a".repeat(MAX_LOCAL_PART_LEN + 1);
        assert!(Address::parse(&format!("{}@example.com", local)).is_err());

        let local = "a".repeat(MAX_LOCAL_PART_LEN);
        assert!(Address::parse(&format!("{}@example.com", local)).is_ok());
    }

    #[test]
    fn test_display_name_rendering() {
        let addr = Address::validate("JohnSmith@gmail.com", Some("John Smith")).unwrap();
        assert_eq!(addr.name(), Some("John Smith"));
        assert_eq!(addr.to_string(), "John Smith <JohnSmith@gmail.com>");
    }

    #[test]
    fn test_display_name_quoting() {
        let addr = Address::with_name("Smith, John", "john@example.com").unwrap();
        assert_eq!(addr.to_string(), "\"Smith, John\" <john@example.com>");

        let addr = Address::with_name("The \"Boss\"", "boss@example.com").unwrap();
        assert_eq!(addr.to_string(), "\"The \\\"Boss\\\"\" <boss@example.com>");
    }

    #[test]
    fn test_parse_named_form() {
        let addr = Address::parse("John Doe <john@example.com>").unwrap();
        assert_eq!(addr.email(), "john@example.com");
        assert_eq!(addr.name(), Some("John Doe"));

        let addr = Address::parse("\"John, Doe\" <john@example.com>").unwrap();
        assert_eq!(addr.name(), Some("John, Doe"));

        let addr = Address::parse("<john@example.com>").unwrap();
        assert_eq!(addr.name(), None);
    }

    #[test]
    fn test_explicit_name_overrides_parsed_name() {
        let addr = Address::validate("Old <john@example.com>", Some("New")).unwrap();
        assert_eq!(addr.name(), Some("New"));

        let addr = Address::validate("Old <john@example.com>", Some("  ")).unwrap();
        assert_eq!(addr.name(), Some("Old"));
    }

    #[test]
    fn test_address_parts() {
        let addr = Address::parse("a.b@c.org").unwrap();
        assert_eq!(addr.local_part(), "a.b");
        assert_eq!(addr.domain(), "c.org");
        assert_eq!(addr.to_smtp(), "<a.b@c.org>");
    }

    #[test]
    fn test_address_serde() {
        let addr = Address::with_name("John Smith", "john@example.com").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"John Smith <john@example.com>\"");

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);

        assert!(serde_json::from_str::<Address>("\"not-an-address\"").is_err());
    }

    #[rstest]
    #[case("The \"Boss\"")]
    #[case("a<b")]
    #[case("back\\slash")]
    #[case("Smith, John")]
    #[case("x > y")]
    fn test_special_name_round_trip(#[case] name: &str) {
        let addr = Address::with_name(name, "boss@example.com").unwrap();

        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), Some(name));
        assert_eq!(back, addr);

        assert_eq!(Address::parse(&addr.to_header()).unwrap(), addr);
    }

    #[rstest]
    #[case("Evil\r\nBcc: secret@example.com")]
    #[case("Line\nBreak")]
    #[case("Null\0Byte")]
    fn test_control_characters_in_name_rejected(#[case] name: &str) {
        let err = Address::with_name(name, "def@gmail.com").unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::InvalidAddress);

        let raw = format!("\"{}\" <def@gmail.com>", name);
        assert!(Address::parse(&raw).is_err());
    }

    #[test]
    fn test_role_header_names() {
        assert_eq!(RecipientRole::ReplyTo.header_name(), "Reply-To");
        assert!(RecipientRole::Bcc.is_delivery_role());
        assert!(!RecipientRole::ReplyTo.is_delivery_role());
    }
}
