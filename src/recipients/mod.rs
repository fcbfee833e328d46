//! Ordered recipient collections keyed by role.

use crate::errors::{MailError, MailResult};
use crate::types::{Address, RecipientRole};

/// Validated addresses for the To, Cc, Bcc and Reply-To roles.
///
/// Each role keeps insertion order and allows duplicates. Every mutation is
/// all-or-nothing: a rejected call leaves the registry as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientRegistry {
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    reply_to: Vec<Address>,
}

impl RecipientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates one address and appends it to `role`.
    pub fn add(&mut self, role: RecipientRole, raw: &str, display_name: Option<&str>) -> MailResult<()> {
        let address = Address::validate(raw, display_name)?;
        self.slot_mut(role).push(address);
        Ok(())
    }

    /// Appends an already validated address.
    pub fn push(&mut self, role: RecipientRole, address: Address) {
        self.slot_mut(role).push(address);
    }

    /// Validates every entry, then appends the whole batch in order.
    ///
    /// Fails with `EmptyRecipientList` before any validation when `raws`
    /// yields nothing, and with the first `InvalidAddress` otherwise. Nothing
    /// is appended unless every entry is valid.
    pub fn add_all<I, S>(&mut self, role: RecipientRole, raws: I) -> MailResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raws: Vec<S> = raws.into_iter().collect();
        if raws.is_empty() {
            return Err(MailError::empty_recipients(format!(
                "{} address list provided was empty",
                role
            )));
        }

        let batch = raws
            .iter()
            .map(|raw| Address::parse(raw.as_ref()))
            .collect::<MailResult<Vec<_>>>()?;

        self.slot_mut(role).extend(batch);
        Ok(())
    }

    /// Replaces every address of `role`.
    pub fn replace<I>(&mut self, role: RecipientRole, addresses: I) -> MailResult<()>
    where
        I: IntoIterator<Item = Address>,
    {
        let addresses: Vec<Address> = addresses.into_iter().collect();
        if addresses.is_empty() {
            return Err(MailError::empty_recipients(format!(
                "{} address list provided was empty",
                role
            )));
        }

        *self.slot_mut(role) = addresses;
        Ok(())
    }

    /// Returns the addresses of `role` in insertion order.
    pub fn get(&self, role: RecipientRole) -> &[Address] {
        match role {
            RecipientRole::To => &self.to,
            RecipientRole::Cc => &self.cc,
            RecipientRole::Bcc => &self.bcc,
            RecipientRole::ReplyTo => &self.reply_to,
        }
    }

    /// Returns the number of delivery recipients (To, Cc and Bcc).
    pub fn total_recipients(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Returns true if there is no delivery recipient.
    pub fn has_no_recipients(&self) -> bool {
        self.total_recipients() == 0
    }

    /// Returns all delivery recipients (To, then Cc, then Bcc).
    pub fn all_recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    fn slot_mut(&mut self, role: RecipientRole) -> &mut Vec<Address> {
        match role {
            RecipientRole::To => &mut self.to,
            RecipientRole::Cc => &mut self.cc,
            RecipientRole::Bcc => &mut self.bcc,
            RecipientRole::ReplyTo => &mut self.reply_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MailErrorKind;

    const BATCH: [&str; 3] = [
        "ab@bc.com",
        "a.b@c.org",
        "abcdefghijklmnopqrst@abcdefghijklmnopqrst.com.bd",
    ];

    #[test]
    fn test_batch_preserves_order() {
        let mut registry = RecipientRegistry::new();
        registry.add_all(RecipientRole::Bcc, BATCH).unwrap();

        let bcc: Vec<String> = registry
            .get(RecipientRole::Bcc)
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(bcc, BATCH);
    }

    #[test]
    fn test_empty_batch_rejected() {
        let mut registry = RecipientRegistry::new();
        let err = registry
            .add_all(RecipientRole::Bcc, Vec::<String>::new())
            .unwrap_err();

        assert_eq!(err.kind(), MailErrorKind::EmptyRecipientList);
        assert!(registry.get(RecipientRole::Bcc).is_empty());
    }

    #[test]
    fn test_batch_is_atomic() {
        let mut registry = RecipientRegistry::new();
        registry.add(RecipientRole::To, "first@example.com", None).unwrap();

        let err = registry
            .add_all(RecipientRole::To, ["ok@example.com", "broken", "late@example.com"])
            .unwrap_err();

        assert_eq!(err.kind(), MailErrorKind::InvalidAddress);
        assert!(err.message().contains("broken"));
        assert_eq!(registry.get(RecipientRole::To).len(), 1);
    }

    #[test]
    fn test_invalid_single_add_leaves_registry_unchanged() {
        let mut registry = RecipientRegistry::new();
        let err = registry.add(RecipientRole::Cc, "abc", None).unwrap_err();

        assert_eq!(err.kind(), MailErrorKind::InvalidAddress);
        assert!(registry.get(RecipientRole::Cc).is_empty());
    }

    #[test]
    fn test_duplicates_allowed() {
        let mut registry = RecipientRegistry::new();
        registry.add(RecipientRole::To, "same@example.com", None).unwrap();
        registry.add(RecipientRole::To, "same@example.com", None).unwrap();
        assert_eq!(registry.get(RecipientRole::To).len(), 2);
    }

    #[test]
    fn test_reply_to_not_counted() {
        let mut registry = RecipientRegistry::new();
        registry
            .add(RecipientRole::ReplyTo, "JohnSmith@gmail.com", Some("John Smith"))
            .unwrap();

        assert!(registry.has_no_recipients());
        assert_eq!(
            registry.get(RecipientRole::ReplyTo)[0].to_string(),
            "John Smith <JohnSmith@gmail.com>"
        );
    }

    #[test]
    fn test_replace() {
        let mut registry = RecipientRegistry::new();
        registry.add(RecipientRole::Cc, "old@example.com", None).unwrap();

        let fresh = vec![Address::parse("new@example.com").unwrap()];
        registry.replace(RecipientRole::Cc, fresh).unwrap();
        assert_eq!(registry.get(RecipientRole::Cc)[0].email(), "new@example.com");

        let err = registry.replace(RecipientRole::Cc, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), MailErrorKind::EmptyRecipientList);
        assert_eq!(registry.get(RecipientRole::Cc).len(), 1);
    }

    #[test]
    fn test_all_recipients_order() {
        let mut registry = RecipientRegistry::new();
        registry.add(RecipientRole::Bcc, "bcc@example.com", None).unwrap();
        registry.add(RecipientRole::To, "to@example.com", None).unwrap();
        registry.add(RecipientRole::Cc, "cc@example.com", None).unwrap();

        let order: Vec<&str> = registry.all_recipients().map(|a| a.email()).collect();
        assert_eq!(order, ["to@example.com", "cc@example.com", "bcc@example.com"]);
        assert_eq!(registry.total_recipients(), 3);
    }
}
