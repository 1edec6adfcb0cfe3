//! Messages flowing into and out of the sync engine.

use crate::model::{
    AccountsAndIdentities, MailboxRoute, NewMessage, Quota, SetAction, Uid,
};
use crate::remote::{
    FolderHashUpdate, FolderInfo, FolderListPayload, MessageListPage, RemoteError, RemoteResult,
};

/// Destination class of a delete action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKind {
    /// Move to spam.
    Spam,
    /// Move out of spam into the inbox.
    NotSpam,
    /// Move to trash.
    Trash,
    /// Move to the archive.
    Archive,
}

/// A permanent delete waiting for the user's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    /// Folder raw name.
    pub folder: String,
    /// UIDs to delete.
    pub uids: Vec<Uid>,
}

/// How a delete request was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteDisposition {
    /// Queued as a move to the given folder.
    Moved {
        /// Destination raw name.
        to: String,
    },
    /// Nothing was done; the user must confirm a permanent delete.
    NeedsConfirmation(PendingDelete),
    /// Nothing was done; the system folder must be configured first.
    SystemFolderRequired(DeleteKind),
}

/// Why the engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// A shutdown command was received.
    Requested,
    /// The client was suspended for too long and must start over.
    ReloadRequired,
    /// The session ended.
    LoggedOut,
}

/// User-level requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Refetch the displayed list.
    ReloadMessageList {
        /// Go back to page 1.
        drop_page: bool,
        /// Forget the folder hash first.
        drop_folder_cache: bool,
    },
    /// Display another folder.
    OpenFolder(String),
    /// Display another page.
    SetPage(u32),
    /// Filter the list.
    SetSearch(String),
    /// Open a thread.
    OpenThread(Uid),
    /// Leave the open thread.
    CloseThread,
    /// Select a message, or clear the selection.
    Select(Option<Uid>),
    /// Check or uncheck a message.
    SetChecked {
        /// Message UID.
        uid: Uid,
        /// New checked state.
        checked: bool,
    },
    /// Delete messages through the matching system folder.
    DeleteMessages {
        /// Destination class.
        kind: DeleteKind,
        /// Source folder raw name.
        folder: String,
        /// UIDs to delete.
        uids: Vec<Uid>,
        /// Move into the system folder rather than delete permanently.
        use_folder: bool,
    },
    /// Permanently delete the checked or selected messages (needs dangerous
    /// actions enabled).
    DeleteWithoutMove,
    /// Carry out a confirmed permanent delete.
    ConfirmDelete(PendingDelete),
    /// Move or copy messages.
    MoveMessages {
        /// Source folder raw name.
        from: String,
        /// UIDs to move.
        uids: Vec<Uid>,
        /// Destination raw name.
        to: String,
        /// Copy instead of move.
        copy: bool,
    },
    /// Apply a flag action; `None` targets the checked or selected messages.
    SetAction {
        /// Folder raw name.
        folder: String,
        /// Action to apply.
        action: SetAction,
        /// Target UIDs.
        uids: Option<Vec<Uid>>,
    },
    /// Mark the whole folder, or the open thread, read or unread.
    SetActionForAll {
        /// Folder raw name.
        folder: String,
        /// `SetSeen` or `UnsetSeen`.
        action: SetAction,
    },
    /// Poll one folder.
    FolderInformation(String),
    /// Poll the next batch of folders.
    FolderInformationMultiply,
    /// Expand or collapse a folder in the tree.
    SetExpandedFolder {
        /// Folder hash.
        full_name_hash: String,
        /// New state.
        expanded: bool,
    },
    /// Reload the folder list.
    FoldersReload,
    /// Refresh the quota.
    Quota,
    /// Refresh accounts and identities.
    AccountsAndIdentities,
    /// Synchronize contacts.
    ContactsSync,
    /// Stop the engine.
    Shutdown,
}

/// Outputs for the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A list fetch started.
    ListLoading,
    /// The displayed list was replaced.
    ListChanged {
        /// Folder raw name.
        folder: String,
        /// Number of messages shown.
        count: usize,
    },
    /// The list fetch failed.
    ListError(String),
    /// Displayed flags were re-derived from the cache.
    FlagsChanged {
        /// Folder raw name.
        folder: String,
    },
    /// Folder counters changed.
    FolderCounts {
        /// Folder raw name.
        folder: String,
        /// Total messages.
        all: u32,
        /// Unread messages.
        unread: u32,
    },
    /// The folder list was reloaded.
    FoldersReloaded {
        /// Number of folders.
        count: usize,
    },
    /// Blocking error message.
    Alert(String),
    /// A system folder must be configured first.
    SystemFolderRequired {
        /// Destination class that is missing.
        kind: DeleteKind,
        /// Explanation text.
        text: String,
    },
    /// A permanent delete needs confirmation.
    ConfirmDelete {
        /// Delete to hand back with [`Command::ConfirmDelete`].
        pending: PendingDelete,
        /// Question to ask.
        prompt: String,
    },
    /// The list position changed.
    Navigate(MailboxRoute),
    /// New mail arrived.
    NewMessages {
        /// Folder raw name.
        folder: String,
        /// Announced messages.
        messages: Vec<NewMessage>,
        /// Summary text.
        text: String,
    },
    /// Quota refreshed.
    QuotaChanged(Quota),
    /// Accounts and identities refreshed.
    AccountsChanged(AccountsAndIdentities),
    /// The client must start over.
    ReloadRequired,
    /// The session ended.
    LoggedOut,
}

/// Recurring and one-shot timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Timer {
    PollFolders,
    InitialPoll,
    BootPoll,
    Quota,
    FoldersReload,
    ContactsSync,
    WakeCheck,
}

/// Everything the engine loop reacts to.
#[derive(Debug)]
pub(crate) enum Event {
    Command(Command),
    FoldersLoaded {
        boot: bool,
        result: RemoteResult<FolderListPayload>,
    },
    ListLoaded {
        seq: u64,
        result: RemoteResult<MessageListPage>,
    },
    InboxRecached(RemoteResult<MessageListPage>),
    FolderInfoLoaded(RemoteResult<FolderInfo>),
    FolderInfoBatchLoaded {
        boot: bool,
        result: RemoteResult<Vec<FolderInfo>>,
    },
    MoveOrDeleteDone(RemoteResult<Option<FolderHashUpdate>>),
    FlagsStored(RemoteResult<()>),
    QuotaLoaded(RemoteResult<Quota>),
    AccountsLoaded(RemoteResult<AccountsAndIdentities>),
    ContactsSynced(RemoteResult<()>),
    MoveFlushDue { generation: u64 },
    QuotaDue { generation: u64 },
    Timer(Timer),
}

impl Event {
    /// Returns true if the event carries a logged-out remote outcome.
    pub(crate) fn is_logout(&self) -> bool {
        let err = match self {
            Self::FoldersLoaded { result: Err(e), .. }
            | Self::ListLoaded { result: Err(e), .. }
            | Self::InboxRecached(Err(e))
            | Self::FolderInfoLoaded(Err(e))
            | Self::FolderInfoBatchLoaded { result: Err(e), .. }
            | Self::MoveOrDeleteDone(Err(e))
            | Self::FlagsStored(Err(e))
            | Self::QuotaLoaded(Err(e))
            | Self::AccountsLoaded(Err(e))
            | Self::ContactsSynced(Err(e)) => e,
            _ => return false,
        };
        matches!(err, RemoteError::LoggedOut)
    }
}
