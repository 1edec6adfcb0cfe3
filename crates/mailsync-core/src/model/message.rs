//! Message list entry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message UID. Unique only within its folder.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Uid(pub u32);

impl Uid {
    /// Returns the raw UID value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for Uid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a message: folder raw name plus UID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    /// Folder raw name.
    pub folder: String,
    /// UID inside the folder.
    pub uid: Uid,
}

/// Persistent message flags as reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MessageFlags {
    /// Message has not been read.
    pub unseen: bool,
    /// Message is flagged/starred.
    pub flagged: bool,
    /// Message has been answered.
    pub answered: bool,
    /// Message has been forwarded.
    pub forwarded: bool,
    /// Sender asked for a read receipt.
    pub read_receipt: bool,
    /// Message carries the `\Deleted` flag.
    pub deleted_mark: bool,
}

impl MessageFlags {
    /// Returns the cacheable part of the flags:
    /// `[unseen, flagged, answered, forwarded, read_receipt]`.
    #[must_use]
    pub const fn to_cache_tuple(self) -> [bool; 5] {
        [
            self.unseen,
            self.flagged,
            self.answered,
            self.forwarded,
            self.read_receipt,
        ]
    }

    /// Overwrites the cacheable flags, leaving `deleted_mark` alone.
    pub fn apply_cache_tuple(&mut self, tuple: [bool; 5]) {
        let [unseen, flagged, answered, forwarded, read_receipt] = tuple;
        self.unseen = unseen;
        self.flagged = flagged;
        self.answered = answered;
        self.forwarded = forwarded;
        self.read_receipt = read_receipt;
    }
}

/// Flag mutation applied to a set of messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetAction {
    /// Mark as read.
    SetSeen,
    /// Mark as unread.
    UnsetSeen,
    /// Add the flagged mark.
    SetFlag,
    /// Remove the flagged mark.
    UnsetFlag,
}

/// A message list entry.
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)] // transient UI state is a handful of toggles
pub struct Message {
    /// Raw name of the folder containing the message.
    pub folder: String,
    /// UID inside the folder.
    pub uid: Uid,
    /// Server content fingerprint.
    pub hash: String,
    /// Opaque token used to fetch the full message.
    pub request_hash: String,
    /// Subject line.
    pub subject: String,
    /// Sender, formatted for display.
    pub from: String,
    /// Date of the message.
    pub date: Option<DateTime<Utc>>,
    /// Size in bytes.
    pub size: u64,
    /// Persistent flags.
    pub flags: MessageFlags,
    /// UIDs of the messages in this message's thread.
    pub threads: Vec<Uid>,
    /// Selected in the list (local only).
    pub selected: bool,
    /// Checked in the list (local only).
    pub checked: bool,
    /// Has keyboard focus (local only).
    pub focused: bool,
    /// Struck from the list, awaiting confirmation (local only).
    pub deleted: bool,
}

impl Message {
    /// Creates an empty message entry for the given folder and UID.
    #[must_use]
    pub fn new(folder: impl Into<String>, uid: impl Into<Uid>) -> Self {
        Self {
            folder: folder.into(),
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Returns the identity key of the message.
    #[must_use]
    pub fn key(&self) -> MessageKey {
        MessageKey {
            folder: self.folder.clone(),
            uid: self.uid,
        }
    }

    /// Returns true if the message is unread.
    #[must_use]
    pub const fn is_unseen(&self) -> bool {
        self.flags.unseen
    }

    /// Returns true if the message is flagged.
    #[must_use]
    pub const fn is_flagged(&self) -> bool {
        self.flags.flagged
    }
}

/// A newly arrived message announced by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Folder raw name.
    pub folder: String,
    /// UID inside the folder.
    pub uid: Uid,
    /// Subject line.
    pub subject: String,
    /// Sender, formatted for display.
    pub from: String,
}

/// Removes duplicate UIDs, keeping the first occurrence of each.
#[must_use]
pub fn unique_uids(uids: impl IntoIterator<Item = Uid>) -> Vec<Uid> {
    let mut out: Vec<Uid> = Vec::new();
    for uid in uids {
        if !out.contains(&uid) {
            out.push(uid);
        }
    }
    out
}
