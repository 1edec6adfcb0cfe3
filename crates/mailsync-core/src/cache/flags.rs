//! Per-message flag cache.

use std::collections::HashMap;

use crate::model::{Message, SetAction, Uid};

const UNSEEN: usize = 0;
const FLAGGED: usize = 1;

/// Client-side record of message flags, keyed by folder and UID.
///
/// Entries are `[unseen, flagged, answered, forwarded, read_receipt]`. When an
/// entry exists it overrides the flags a message was fetched with, so optimistic
/// changes survive list reloads until the server reports otherwise.
#[derive(Debug, Clone, Default)]
pub struct FlagCache {
    folders: HashMap<String, HashMap<Uid, [bool; 5]>>,
}

impl FlagCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the message's flags from the cache, if an entry exists.
    pub fn init_message(&self, message: &mut Message) {
        if let Some(entry) = self.get(&message.folder, message.uid) {
            message.flags.apply_cache_tuple(entry);
        }
    }

    /// Records the flags of a freshly fetched message.
    pub fn store_message(&mut self, message: &Message) {
        self.store_by_folder_and_uid(&message.folder, message.uid, message.flags.to_cache_tuple());
    }

    /// Stores the flags of one message, replacing any previous entry.
    pub fn store_by_folder_and_uid(&mut self, folder: &str, uid: Uid, flags: [bool; 5]) {
        self.folders
            .entry(folder.to_string())
            .or_default()
            .insert(uid, flags);
    }

    /// Applies a flag action to one message.
    ///
    /// Creates the entry when missing. Returns `1` when the message was
    /// unread before the action, `0` otherwise.
    pub fn store_by_set_action(&mut self, folder: &str, uid: Uid, action: SetAction) -> u32 {
        let entry = self
            .folders
            .entry(folder.to_string())
            .or_default()
            .entry(uid)
            .or_default();
        let was_unseen = u32::from(entry[UNSEEN]);

        match action {
            SetAction::SetSeen => entry[UNSEEN] = false,
            SetAction::UnsetSeen => entry[UNSEEN] = true,
            SetAction::SetFlag => entry[FLAGGED] = true,
            SetAction::UnsetFlag => entry[FLAGGED] = false,
        }

        was_unseen
    }

    /// Returns the cached flags of a message.
    #[must_use]
    pub fn get(&self, folder: &str, uid: Uid) -> Option<[bool; 5]> {
        self.folders.get(folder)?.get(&uid).copied()
    }

    /// Forgets every entry of a folder.
    pub fn clear_folder(&mut self, folder: &str) {
        self.folders.remove(folder);
    }

    /// Number of cached entries in a folder.
    #[must_use]
    pub fn folder_len(&self, folder: &str) -> usize {
        self.folders.get(folder).map_or(0, HashMap::len)
    }
}
