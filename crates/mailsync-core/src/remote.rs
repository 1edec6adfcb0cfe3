//! The remote mail store, as seen by the sync engine.
//!
//! Implementations translate these calls into server requests. Every call
//! resolves to one of four outcomes: success, a failure ([`RemoteError`]), an
//! abort (the request was superseded) or an unload (the client went away
//! before the response arrived).

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    AccountsAndIdentities, Folder, Message, NewMessage, Quota, SystemFolders, Uid,
};

/// Failure outcome of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request was cancelled because a newer one superseded it.
    #[error("request aborted")]
    Aborted,

    /// The client was shutting down before the response arrived.
    #[error("request unloaded")]
    Unloaded,

    /// Network or HTTP level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an error code.
    #[error("server error {code}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Server {
        /// Server notification code.
        code: u32,
        /// Optional server-provided message.
        message: Option<String>,
    },

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The server ended the session.
    #[error("session logged out")]
    LoggedOut,
}

impl RemoteError {
    /// Returns the server notification code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<u32> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for outcomes that are never shown to the user.
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::Aborted | Self::Unloaded)
    }
}

/// Result of a remote call.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Parameters of a message list fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Folder raw name.
    pub folder: String,
    /// Index of the first message.
    pub offset: u32,
    /// Page size.
    pub limit: u32,
    /// Search expression, empty for none.
    pub search: String,
    /// Thread root to list, if a thread is open.
    pub thread_uid: Option<Uid>,
    /// Group the list into threads.
    pub use_threads: bool,
    /// Content hash the client currently holds for the folder.
    pub folder_hash: String,
    /// Next UID known for the folder (inbox only).
    pub uid_next: Option<Uid>,
}

/// One page of a message list.
#[derive(Debug, Clone, Default)]
pub struct MessageListPage {
    /// Folder raw name.
    pub folder: String,
    /// Messages on the page, server flags included.
    pub messages: Vec<Message>,
    /// Total messages in the folder.
    pub message_count: u32,
    /// Unread messages in the folder.
    pub unseen_count: u32,
    /// Number of messages matching the query.
    pub result_count: u32,
    /// Offset the page starts at.
    pub offset: u32,
    /// Current content hash of the folder.
    pub folder_hash: String,
    /// Next UID of the folder.
    pub uid_next: Option<Uid>,
    /// Messages that arrived since the UID the client sent.
    pub new_messages: Vec<NewMessage>,
}

/// Flags of one message as reported by a folder information call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidFlags {
    /// Message UID.
    pub uid: Uid,
    /// `[unseen, flagged, answered, forwarded, read_receipt]`.
    pub flags: [bool; 5],
}

/// Folder metadata returned by the status calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderInfo {
    /// Folder raw name.
    pub folder: String,
    /// Current content hash.
    pub hash: String,
    /// Total messages, when reported.
    pub message_count: Option<u32>,
    /// Unread messages, when reported.
    pub unseen_count: Option<u32>,
    /// Next UID, when reported.
    pub uid_next: Option<Uid>,
    /// Current flags of the messages the client asked about.
    pub flags: Vec<UidFlags>,
    /// Messages that arrived since the UID the client sent.
    pub new_messages: Vec<NewMessage>,
}

/// The folder list.
#[derive(Debug, Clone, Default)]
pub struct FolderListPayload {
    /// All folders, in server order.
    pub folders: Vec<Folder>,
    /// System folder roles the server knows about.
    pub system_folders: SystemFolders,
    /// Fingerprint of the folder list itself.
    pub folders_hash: String,
}

/// Learning marker attached to a move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MoveMarker {
    /// Plain move.
    #[default]
    None,
    /// Moving into spam.
    Spam,
    /// Moving out of spam back into the inbox.
    Ham,
}

impl MoveMarker {
    /// Wire representation of the marker.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Spam => "SPAM",
            Self::Ham => "HAM",
        }
    }
}

/// A batched move request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// Source folder raw name.
    pub from: String,
    /// Destination folder raw name.
    pub to: String,
    /// UIDs to move.
    pub uids: Vec<Uid>,
    /// Learning marker.
    pub marker: MoveMarker,
    /// Destination is trash or spam; the messages are also marked read.
    pub permanent: bool,
}

/// New content hash of a folder, returned by mutating calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHashUpdate {
    /// Folder raw name.
    pub folder: String,
    /// New content hash.
    pub hash: String,
}

/// The remote mail store.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Fetches the folder list.
    async fn folders(&self) -> RemoteResult<FolderListPayload>;

    /// Fetches one page of a message list.
    async fn message_list(&self, query: &ListQuery) -> RemoteResult<MessageListPage>;

    /// Fetches the metadata of one folder plus the flags of `known_uids`.
    async fn folder_information(
        &self,
        folder: &str,
        known_uids: &[Uid],
        uid_next: Option<Uid>,
    ) -> RemoteResult<FolderInfo>;

    /// Fetches the metadata of several folders in one request.
    async fn folder_information_multiple(&self, folders: &[String])
    -> RemoteResult<Vec<FolderInfo>>;

    /// Moves messages between folders.
    async fn move_messages(&self, request: &MoveRequest) -> RemoteResult<Option<FolderHashUpdate>>;

    /// Copies messages between folders.
    async fn copy_messages(
        &self,
        from: &str,
        to: &str,
        uids: &[Uid],
    ) -> RemoteResult<Option<FolderHashUpdate>>;

    /// Permanently deletes messages.
    async fn delete_messages(
        &self,
        folder: &str,
        uids: &[Uid],
    ) -> RemoteResult<Option<FolderHashUpdate>>;

    /// Sets or clears the seen flag.
    async fn set_seen(&self, folder: &str, uids: &[Uid], seen: bool) -> RemoteResult<()>;

    /// Sets or clears the seen flag on a whole folder, or on the given thread.
    async fn set_seen_to_all(
        &self,
        folder: &str,
        seen: bool,
        thread_uids: Option<&[Uid]>,
    ) -> RemoteResult<()>;

    /// Sets or clears the flagged mark.
    async fn set_flagged(&self, folder: &str, uids: &[Uid], flagged: bool) -> RemoteResult<()>;

    /// Fetches the storage quota.
    async fn quota(&self) -> RemoteResult<Quota>;

    /// Fetches the accounts and identities of the session.
    async fn accounts_and_identities(&self) -> RemoteResult<AccountsAndIdentities>;

    /// Synchronizes the address book with the remote contacts store.
    async fn contacts_sync(&self) -> RemoteResult<()>;
}
