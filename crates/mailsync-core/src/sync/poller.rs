//! Folder metadata polling and change detection.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::cache::{FlagCache, FolderHashRegistry};
use crate::model::{FolderStore, NewMessage, Uid};
use crate::remote::FolderInfo;

/// How a folder information result was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Single-folder request carrying the displayed UIDs.
    Single,
    /// Part of a batched request.
    Batch,
}

/// What the engine must do after a poll result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Nothing changed.
    Unchanged,
    /// The displayed folder changed; reload the list.
    ReloadCurrent,
    /// The inbox changed while not displayed; refetch it silently.
    RecacheInbox,
    /// Only the unread count of the displayed folder moved; refresh its flags.
    RefreshCurrentFlags,
}

/// Effect of one folder information result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Folder raw name.
    pub folder: String,
    /// Follow-up action.
    pub decision: PollDecision,
    /// The server sent per-message flags that were stored in the cache.
    pub flags_updated: bool,
    /// The unread counter differs from the previous value.
    pub unread_changed: bool,
    /// Messages to announce as new.
    pub new_messages: Vec<NewMessage>,
}

/// Selects folders to poll and interprets the results.
#[derive(Debug, Clone, Copy)]
pub struct FolderPoller {
    batch_limit: usize,
    stale_after: TimeDelta,
}

impl Default for FolderPoller {
    fn default() -> Self {
        Self::new(5, TimeDelta::minutes(5))
    }
}

impl FolderPoller {
    /// Creates a poller picking at most `batch_limit` folders not polled
    /// within `stale_after`.
    #[must_use]
    pub const fn new(batch_limit: usize, stale_after: TimeDelta) -> Self {
        Self {
            batch_limit,
            stale_after,
        }
    }

    /// Picks the folders of the next batched poll and marks them polled.
    pub fn next_batch(&self, folders: &mut FolderStore, now: DateTime<Utc>) -> Vec<String> {
        folders.next_folder_names(now, self.batch_limit, self.stale_after)
    }

    /// Applies a folder information result to the caches.
    ///
    /// Returns `None` when the folder is not in the folder list.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        info: &FolderInfo,
        mode: PollMode,
        now: DateTime<Utc>,
        folders: &mut FolderStore,
        flags: &mut FlagCache,
        hashes: &mut FolderHashRegistry,
        list_has_messages: bool,
    ) -> Option<PollOutcome> {
        let is_current = folders.current_name() == info.folder;
        let is_inbox = folders.inbox_name() == info.folder;
        let folder = folders.get_mut(&info.folder)?;

        folder.last_polled_at = Some(now);

        let hash_changed = hashes.is_changed(&info.folder, &info.hash);
        if !info.hash.is_empty() {
            hashes.set(&info.folder, info.hash.as_str());
        }

        if let Some(count) = info.message_count {
            folder.message_count_all = count;
        }

        let mut unread_changed = false;
        if let Some(unseen) = info.unseen_count {
            unread_changed = folder.message_count_unread != unseen;
            folder.message_count_unread = unseen;
        }
        if unread_changed {
            flags.clear_folder(&info.folder);
        }

        for entry in &info.flags {
            flags.store_by_folder_and_uid(&info.folder, entry.uid, entry.flags);
        }

        let new_messages =
            init_uid_next_and_new_messages(folders, &info.folder, info.uid_next, &info.new_messages);

        let decision = match mode {
            PollMode::Single if hash_changed || unread_changed => {
                if is_current {
                    PollDecision::ReloadCurrent
                } else if is_inbox {
                    PollDecision::RecacheInbox
                } else {
                    PollDecision::Unchanged
                }
            }
            PollMode::Batch if hash_changed && is_current => PollDecision::ReloadCurrent,
            PollMode::Batch if !hash_changed && unread_changed && is_current && list_has_messages => {
                PollDecision::RefreshCurrentFlags
            }
            PollMode::Single | PollMode::Batch => PollDecision::Unchanged,
        };

        debug!(folder = %info.folder, ?decision, hash_changed, unread_changed, "Applied folder information");

        Some(PollOutcome {
            folder: info.folder.clone(),
            decision,
            flags_updated: !info.flags.is_empty(),
            unread_changed,
            new_messages,
        })
    }
}

/// Records the inbox's next UID and returns the messages to announce.
///
/// Only the inbox is tracked. Nothing is announced on the first report, nor
/// when the next UID did not move.
pub fn init_uid_next_and_new_messages(
    folders: &mut FolderStore,
    folder: &str,
    uid_next: Option<Uid>,
    new_messages: &[NewMessage],
) -> Vec<NewMessage> {
    if folders.inbox_name() != folder {
        return Vec::new();
    }
    let (Some(uid_next), Some(inbox)) = (uid_next, folders.get_mut(folder)) else {
        return Vec::new();
    };

    let previous = inbox.uid_next.replace(uid_next);
    match previous {
        Some(previous) if previous != uid_next => new_messages.to_vec(),
        _ => Vec::new(),
    }
}
