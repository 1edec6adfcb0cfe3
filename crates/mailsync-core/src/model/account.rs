//! Account, identity and quota models.

use serde::{Deserialize, Serialize};

/// A mail account available in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account email address.
    pub email: String,
    /// True for accounts added on top of the main login.
    pub is_additional: bool,
    /// Unread count shown next to the account, when known.
    pub count: u32,
}

impl Account {
    /// Creates an account entry.
    #[must_use]
    pub fn new(email: impl Into<String>, is_additional: bool) -> Self {
        Self {
            email: email.into(),
            is_additional,
            count: 0,
        }
    }
}

/// A sender identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-side identifier (empty for the main identity).
    pub id: String,
    /// From address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Reply-To address.
    pub reply_to: String,
    /// Bcc address.
    pub bcc: String,
    /// Signature text.
    pub signature: String,
    /// Insert the signature above the quoted text.
    pub signature_insert_before: bool,
}

/// Result of the accounts-and-identities fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountsAndIdentities {
    /// Accounts, main account first.
    pub accounts: Vec<Account>,
    /// Identities of the current account.
    pub identities: Vec<Identity>,
}

/// Mailbox storage usage, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quota {
    /// Used storage.
    pub usage: u64,
    /// Storage limit; zero means unlimited.
    pub limit: u64,
}

impl Quota {
    /// Percentage of the limit in use, or `None` when unlimited.
    #[must_use]
    pub fn percentage(&self) -> Option<u8> {
        if self.limit == 0 {
            return None;
        }
        let pct = (self.usage.saturating_mul(100) / self.limit).min(100);
        u8::try_from(pct).ok()
    }
}
