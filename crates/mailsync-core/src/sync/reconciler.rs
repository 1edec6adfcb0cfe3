//! The displayed message list and its reconciliation with the server.
//!
//! Mutations are applied optimistically; the next list fetch or poll is the
//! only correction. Fetches are numbered and only the most recently issued one
//! may replace the list.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::cache::{FlagCache, FolderHashRegistry};
use crate::i18n::{Notification, Translate, notification_text};
use crate::model::{
    FolderStore, MailboxRoute, Message, MessageKey, NewMessage, SetAction, Uid, folder_name_hash,
    unique_uids,
};
use crate::remote::{ListQuery, MessageListPage, RemoteError, RemoteResult};

/// Lifecycle of the displayed list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The latest fetch was applied.
    Loaded,
    /// The latest fetch failed.
    Errored,
    /// The latest fetch was aborted.
    Aborted,
}

/// Page size and threading mode used for fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Messages per page.
    pub per_page: u32,
    /// Group messages into threads.
    pub use_threads: bool,
}

/// A list fetch to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Sequence number to hand back with the result.
    pub seq: u64,
    /// Fetch parameters.
    pub query: ListQuery,
    /// Route to navigate to, when the page position was reset.
    pub route: Option<MailboxRoute>,
}

/// Data from an applied page the engine acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedPage {
    /// Folder raw name.
    pub folder: String,
    /// Next UID reported by the server.
    pub uid_next: Option<Uid>,
    /// Newly arrived messages.
    pub new_messages: Vec<NewMessage>,
}

/// What happened to a list fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// The page replaced the list.
    Applied(AppliedPage),
    /// A newer fetch was issued; the result was dropped.
    Superseded,
    /// The fetch was aborted.
    Aborted,
    /// The client was going away.
    Unloaded,
    /// The fetch failed; the list was cleared and the error text set.
    Failed(RemoteError),
}

/// Effect of an optimistic removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    /// Number of messages struck from the displayed list.
    pub struck: usize,
    /// Route to navigate to when the thread context changed.
    pub route: Option<MailboxRoute>,
}

#[derive(Clone, Copy)]
struct LocalMarks {
    selected: bool,
    checked: bool,
    focused: bool,
}

/// The displayed message list.
#[derive(Debug)]
pub struct MessageListReconciler {
    messages: Vec<Message>,
    state: ListState,
    loading: bool,
    error: String,
    page: u32,
    page_before_thread: u32,
    search: String,
    thread_uid: Option<Uid>,
    result_count: u32,
    latest_seq: u64,
    open_message: Option<MessageKey>,
}

impl Default for MessageListReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListReconciler {
    /// Creates an empty list positioned on page 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            state: ListState::Idle,
            loading: false,
            error: String::new(),
            page: 1,
            page_before_thread: 1,
            search: String::new(),
            thread_uid: None,
            result_count: 0,
            latest_seq: 0,
            open_message: None,
        }
    }

    /// Prepares a fetch of the current folder.
    ///
    /// `drop_page` resets the position to page 1 and yields a route;
    /// `drop_folder_cache` forgets the folder hash so the server sends a full
    /// page.
    pub fn reload(
        &mut self,
        drop_page: bool,
        drop_folder_cache: bool,
        hashes: &mut FolderHashRegistry,
        folders: &FolderStore,
        paging: Paging,
    ) -> ListRequest {
        let folder = folders.current_name().to_string();

        if drop_folder_cache {
            hashes.invalidate(&folder);
        }

        let route = if drop_page {
            self.page = 1;
            self.page_before_thread = 1;
            Some(self.route(folders))
        } else {
            None
        };

        self.loading = true;
        self.state = ListState::Loading;
        self.latest_seq += 1;

        let uid_next = if folder == folders.inbox_name() {
            folders.get(&folder).and_then(|f| f.uid_next)
        } else {
            None
        };

        let query = ListQuery {
            offset: self.page.saturating_sub(1).saturating_mul(paging.per_page),
            limit: paging.per_page,
            search: self.search.clone(),
            thread_uid: self.thread_uid,
            use_threads: paging.use_threads,
            folder_hash: hashes.get(&folder).to_string(),
            uid_next,
            folder,
        };
        debug!(seq = self.latest_seq, folder = %query.folder, offset = query.offset, "Reloading message list");

        ListRequest {
            seq: self.latest_seq,
            query,
            route,
        }
    }

    /// Applies the result of the fetch numbered `seq`.
    pub fn apply_result(
        &mut self,
        seq: u64,
        result: RemoteResult<MessageListPage>,
        flags: &mut FlagCache,
        hashes: &mut FolderHashRegistry,
        folders: &mut FolderStore,
        tr: &dyn Translate,
    ) -> ListOutcome {
        if seq != self.latest_seq {
            debug!(seq, latest = self.latest_seq, "Dropping superseded list result");
            return ListOutcome::Superseded;
        }

        match result {
            Ok(page) => {
                self.error.clear();
                self.loading = false;
                self.state = ListState::Loaded;
                self.result_count = page.result_count;
                let applied = self.replace_list(page, flags, hashes, folders);
                ListOutcome::Applied(applied)
            }
            Err(RemoteError::Aborted) => {
                self.loading = false;
                self.state = ListState::Aborted;
                ListOutcome::Aborted
            }
            Err(RemoteError::Unloaded) => {
                self.loading = false;
                self.error.clear();
                self.state = ListState::Idle;
                ListOutcome::Unloaded
            }
            Err(err) => {
                warn!(error = %err, "Message list fetch failed");
                self.messages.clear();
                self.loading = false;
                self.state = ListState::Errored;
                let server_message = match &err {
                    RemoteError::Server { message, .. } => message.as_deref(),
                    _ => None,
                };
                self.error = notification_text(
                    tr,
                    err.code(),
                    server_message,
                    Notification::CantGetMessageList,
                );
                ListOutcome::Failed(err)
            }
        }
    }

    fn replace_list(
        &mut self,
        page: MessageListPage,
        flags: &mut FlagCache,
        hashes: &mut FolderHashRegistry,
        folders: &mut FolderStore,
    ) -> AppliedPage {
        let marks: HashMap<Uid, LocalMarks> = self
            .messages
            .iter()
            .filter(|m| m.folder == page.folder && !m.deleted)
            .map(|m| {
                (
                    m.uid,
                    LocalMarks {
                        selected: m.selected,
                        checked: m.checked,
                        focused: m.focused,
                    },
                )
            })
            .collect();

        let MessageListPage {
            folder,
            mut messages,
            message_count,
            unseen_count,
            folder_hash,
            uid_next,
            new_messages,
            ..
        } = page;

        for message in &mut messages {
            merge_flags(flags, message);
            if let Some(m) = marks.get(&message.uid) {
                message.selected = m.selected;
                message.checked = m.checked;
                message.focused = m.focused;
            }
        }
        self.messages = messages;

        update_counts(folders, hashes, &folder, message_count, unseen_count, &folder_hash);

        AppliedPage {
            folder,
            uid_next,
            new_messages,
        }
    }

    /// Feeds a silently fetched page into the caches without touching the
    /// displayed list.
    pub fn absorb_page(
        page: MessageListPage,
        flags: &mut FlagCache,
        hashes: &mut FolderHashRegistry,
        folders: &mut FolderStore,
    ) -> AppliedPage {
        for message in &page.messages {
            if flags.get(&message.folder, message.uid).is_none() {
                flags.store_message(message);
            }
        }
        update_counts(
            folders,
            hashes,
            &page.folder,
            page.message_count,
            page.unseen_count,
            &page.folder_hash,
        );
        AppliedPage {
            folder: page.folder,
            uid_next: page.uid_next,
            new_messages: page.new_messages,
        }
    }

    /// Strikes messages from the list and adjusts folder counters.
    ///
    /// Removing an already removed UID changes nothing in the list. A copy
    /// only unchecks the messages. Both folders' hashes are invalidated.
    pub fn remove_messages(
        &mut self,
        from: &str,
        uids: &[Uid],
        to: Option<&str>,
        copy: bool,
        hashes: &mut FolderHashRegistry,
        folders: &mut FolderStore,
    ) -> Removal {
        let uids = unique_uids(uids.iter().copied());
        let displayed = folders.current_name() == from;

        let mut struck = 0_usize;
        let mut unseen = 0_u32;
        if displayed {
            for message in &mut self.messages {
                if message.deleted || !uids.contains(&message.uid) {
                    continue;
                }
                if copy {
                    message.checked = false;
                    continue;
                }
                struck += 1;
                if message.is_unseen() {
                    unseen += 1;
                }
                message.deleted = true;
                message.checked = false;
                message.selected = false;
                if self.open_message.as_ref() == Some(&message.key()) {
                    self.open_message = None;
                }
            }
        }

        let moved = if displayed {
            u32::try_from(struck).unwrap_or(u32::MAX)
        } else {
            u32::try_from(uids.len()).unwrap_or(u32::MAX)
        };

        if !copy && let Some(source) = folders.get_mut(from) {
            source.message_count_all = source.message_count_all.saturating_sub(moved);
            source.message_count_unread = source.message_count_unread.saturating_sub(unseen);
        }

        if let Some(to) = to {
            let system = folders.system();
            let carried_unseen = if system.trash.is(to) || system.spam.is(to) {
                0
            } else {
                unseen
            };
            let added = if copy {
                u32::try_from(uids.len()).unwrap_or(u32::MAX)
            } else {
                moved
            };
            if let Some(target) = folders.get_mut(to) {
                target.message_count_all = target.message_count_all.saturating_add(added);
                target.message_count_unread =
                    target.message_count_unread.saturating_add(carried_unseen);
            }
            hashes.invalidate(to);
        }
        hashes.invalidate(from);

        let route = if displayed && !copy {
            self.fix_thread_context(folders)
        } else {
            None
        };

        debug!(from, ?to, struck, copy, "Removed messages from list");
        Removal { struck, route }
    }

    fn fix_thread_context(&mut self, folders: &FolderStore) -> Option<MailboxRoute> {
        let root = self.thread_uid?;
        let root_removed = self.messages.iter().any(|m| m.deleted && m.uid == root);
        if !root_removed {
            return None;
        }

        match self.messages.iter().find(|m| !m.deleted).map(|m| m.uid) {
            Some(uid) if uid != root => self.thread_uid = Some(uid),
            Some(_) => return None,
            None if self.page > 1 => self.page -= 1,
            None => {
                self.thread_uid = None;
                self.page = self.page_before_thread;
            }
        }
        Some(self.route(folders))
    }

    /// Re-derives the displayed flags from the cache.
    pub fn refresh_flags(&mut self, flags: &FlagCache) {
        for message in &mut self.messages {
            flags.init_message(message);
        }
    }

    /// Applies a flag action optimistically.
    ///
    /// Returns the deduplicated UIDs the remote call must carry; empty when
    /// there was nothing to do.
    pub fn apply_set_action(
        &mut self,
        folder: &str,
        uids: &[Uid],
        action: SetAction,
        flags: &mut FlagCache,
        folders: &mut FolderStore,
    ) -> Vec<Uid> {
        let uids = unique_uids(uids.iter().copied());
        if folder.is_empty() || uids.is_empty() {
            return uids;
        }

        let already_unread: u32 = uids
            .iter()
            .map(|&uid| flags.store_by_set_action(folder, uid, action))
            .sum();

        if let Some(f) = folders.get_mut(folder) {
            let count = u32::try_from(uids.len()).unwrap_or(u32::MAX);
            match action {
                SetAction::SetSeen => {
                    f.message_count_unread = f.message_count_unread.saturating_sub(already_unread);
                }
                SetAction::UnsetSeen => {
                    f.message_count_unread = f
                        .message_count_unread
                        .saturating_sub(already_unread)
                        .saturating_add(count);
                }
                SetAction::SetFlag | SetAction::UnsetFlag => {}
            }
        }

        self.refresh_flags(flags);
        uids
    }

    /// Marks every displayed message of `folder` read or unread.
    ///
    /// With `in_thread` the counters are adjusted by the number of changed
    /// messages; otherwise they are set to zero or to the folder total. The
    /// folder's flag cache is cleared. Returns the UIDs of the displayed
    /// messages, or `None` for actions other than seen/unseen.
    pub fn apply_set_action_for_all(
        &mut self,
        folder: &str,
        action: SetAction,
        in_thread: bool,
        flags: &mut FlagCache,
        folders: &mut FolderStore,
    ) -> Option<Vec<Uid>> {
        let unseen = match action {
            SetAction::SetSeen => false,
            SetAction::UnsetSeen => true,
            SetAction::SetFlag | SetAction::UnsetFlag => return None,
        };
        let displayed = folders.current_name() == folder;

        let mut changed = 0_u32;
        let mut uids = Vec::new();
        if displayed {
            for message in self.messages.iter_mut().filter(|m| !m.deleted) {
                if message.flags.unseen != unseen {
                    changed += 1;
                }
                message.flags.unseen = unseen;
                uids.push(message.uid);
            }
        }

        if let Some(f) = folders.get_mut(folder) {
            f.message_count_unread = match (in_thread, unseen) {
                (true, false) => f.message_count_unread.saturating_sub(changed),
                (true, true) => f
                    .message_count_unread
                    .saturating_add(changed)
                    .min(f.message_count_all),
                (false, false) => 0,
                (false, true) => f.message_count_all,
            };
        }
        flags.clear_folder(folder);

        Some(uids)
    }

    /// UIDs of the checked messages.
    #[must_use]
    pub fn checked_uids(&self) -> Vec<Uid> {
        self.visible().filter(|m| m.checked).map(|m| m.uid).collect()
    }

    fn checked_or_selected(&self) -> Vec<&Message> {
        let checked: Vec<&Message> = self.visible().filter(|m| m.checked).collect();
        if checked.is_empty() {
            self.visible().filter(|m| m.selected).collect()
        } else {
            checked
        }
    }

    /// UIDs of the checked messages, or of the selected one when none is
    /// checked.
    #[must_use]
    pub fn checked_or_selected_uids(&self) -> Vec<Uid> {
        self.checked_or_selected().into_iter().map(|m| m.uid).collect()
    }

    /// Like [`Self::checked_or_selected_uids`], with each message expanded
    /// to its thread members.
    #[must_use]
    pub fn checked_or_selected_uids_with_threads(&self) -> Vec<Uid> {
        unique_uids(
            self.checked_or_selected()
                .into_iter()
                .flat_map(|m| std::iter::once(m.uid).chain(m.threads.iter().copied())),
        )
    }

    /// Sets the checked mark of a displayed message.
    pub fn set_checked(&mut self, uid: Uid, checked: bool) {
        if let Some(m) = self.messages.iter_mut().find(|m| m.uid == uid && !m.deleted) {
            m.checked = checked;
        }
    }

    /// Selects one displayed message, deselecting the others.
    pub fn select(&mut self, uid: Option<Uid>) {
        for m in &mut self.messages {
            m.selected = Some(m.uid) == uid && !m.deleted;
        }
    }

    /// Switches to another folder, resetting page, search and thread.
    pub fn open_folder(&mut self, folder: &str, folders: &mut FolderStore) -> MailboxRoute {
        folders.set_current(folder);
        self.messages.clear();
        self.page = 1;
        self.page_before_thread = 1;
        self.search.clear();
        self.thread_uid = None;
        self.open_message = None;
        self.route(folders)
    }

    /// Moves to another page.
    pub fn set_page(&mut self, page: u32, folders: &FolderStore) -> MailboxRoute {
        self.page = page.max(1);
        self.route(folders)
    }

    /// Changes the search expression and goes back to page 1.
    pub fn set_search(&mut self, search: &str, folders: &FolderStore) -> MailboxRoute {
        search.trim().clone_into(&mut self.search);
        self.page = 1;
        self.route(folders)
    }

    /// Opens a thread, remembering the current page.
    pub fn open_thread(&mut self, root: Uid, folders: &FolderStore) -> MailboxRoute {
        if self.thread_uid.is_none() {
            self.page_before_thread = self.page;
        }
        self.thread_uid = Some(root);
        self.page = 1;
        self.route(folders)
    }

    /// Leaves the thread, returning to the page it was opened from.
    pub fn close_thread(&mut self, folders: &FolderStore) -> MailboxRoute {
        self.thread_uid = None;
        self.page = self.page_before_thread;
        self.route(folders)
    }

    /// Route describing the current position.
    #[must_use]
    pub fn route(&self, folders: &FolderStore) -> MailboxRoute {
        let current = folders.current_name();
        let folder_hash = folders
            .current()
            .map_or_else(|| folder_name_hash(current), |f| f.full_name_hash.clone());
        MailboxRoute {
            folder_hash,
            page: self.page,
            search: self.search.clone(),
            thread_uid: self.thread_uid,
        }
    }

    /// Records the message open in the viewer.
    pub fn set_open_message(&mut self, key: Option<MessageKey>) {
        self.open_message = key;
    }

    /// The message open in the viewer.
    #[must_use]
    pub const fn open_message(&self) -> Option<&MessageKey> {
        self.open_message.as_ref()
    }

    /// Messages still shown (not struck).
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| !m.deleted)
    }

    /// Returns true when no message is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible().next().is_none()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ListState {
        self.state
    }

    /// Returns true while a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Inline error text, empty when there is none.
    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Current page, starting at 1.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Current search expression.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Root of the open thread.
    #[must_use]
    pub const fn thread_uid(&self) -> Option<Uid> {
        self.thread_uid
    }

    /// Number of messages matching the last query.
    #[must_use]
    pub const fn result_count(&self) -> u32 {
        self.result_count
    }

    /// Sequence number of the most recently issued fetch.
    #[must_use]
    pub const fn latest_seq(&self) -> u64 {
        self.latest_seq
    }
}

fn merge_flags(flags: &mut FlagCache, message: &mut Message) {
    if flags.get(&message.folder, message.uid).is_some() {
        flags.init_message(message);
    } else {
        flags.store_message(message);
    }
}

fn update_counts(
    folders: &mut FolderStore,
    hashes: &mut FolderHashRegistry,
    folder: &str,
    message_count: u32,
    unseen_count: u32,
    folder_hash: &str,
) {
    if let Some(f) = folders.get_mut(folder) {
        f.message_count_all = message_count;
        f.message_count_unread = unseen_count;
    }
    if !folder_hash.is_empty() {
        hashes.set(folder, folder_hash);
    }
}
