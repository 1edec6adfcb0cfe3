//! Mailbox navigation routes.

use std::fmt;

use super::Uid;

/// Location of the message list, rendered as a `#/mailbox/...` hash route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxRoute {
    /// URL-safe folder identifier.
    pub folder_hash: String,
    /// 1-based page number.
    pub page: u32,
    /// Search expression, empty for none.
    pub search: String,
    /// Thread root when a thread is open.
    pub thread_uid: Option<Uid>,
}

impl MailboxRoute {
    /// Route to the first page of a folder.
    #[must_use]
    pub fn folder(folder_hash: impl Into<String>) -> Self {
        Self {
            folder_hash: folder_hash.into(),
            page: 1,
            search: String::new(),
            thread_uid: None,
        }
    }
}

impl fmt::Display for MailboxRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#/mailbox/{}", self.folder_hash)?;
        if let Some(uid) = self.thread_uid {
            write!(f, "~{uid}")?;
        }
        if self.page > 1 {
            write!(f, "/p{}", self.page)?;
        }
        if !self.search.is_empty() {
            write!(f, "/{}", self.search)?;
        }
        Ok(())
    }
}
