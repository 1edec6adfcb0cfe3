//! JSON payloads of the webmail action protocol.
//!
//! Both the older `PascalCase` field names and the newer `camelCase` ones are
//! accepted.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use mailsync_core::model::{
    Account, AccountsAndIdentities, Folder, Identity, Message, MessageFlags, NewMessage, Quota,
    SystemFolder, SystemFolders, Uid,
};
use mailsync_core::remote::{
    FolderHashUpdate, FolderInfo, FolderListPayload, MessageListPage, RemoteError, RemoteResult,
    UidFlags,
};

/// Code reported when the server fails without giving one.
const UNKNOWN_ERROR_CODE: u32 = 999;

/// Response envelope shared by every action.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Result", default)]
    result: Value,
    #[serde(rename = "ErrorCode")]
    error_code: Option<u32>,
    #[serde(rename = "ErrorMessage")]
    error_message: Option<String>,
    #[serde(rename = "Logout", default)]
    logout: bool,
}

/// Unwraps the envelope and returns its `Result` value.
///
/// # Errors
///
/// `Logout` maps to [`RemoteError::LoggedOut`], an error code or a `false`
/// result to [`RemoteError::Server`], an undecodable body to
/// [`RemoteError::Malformed`].
pub fn decode_envelope(body: &[u8]) -> RemoteResult<Value> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| RemoteError::Malformed(e.to_string()))?;

    if envelope.logout {
        return Err(RemoteError::LoggedOut);
    }
    if let Some(code) = envelope.error_code {
        return Err(RemoteError::Server {
            code,
            message: envelope.error_message,
        });
    }
    match envelope.result {
        Value::Null | Value::Bool(false) => Err(RemoteError::Server {
            code: UNKNOWN_ERROR_CODE,
            message: envelope.error_message,
        }),
        result => Ok(result),
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> RemoteResult<T> {
    serde_json::from_value(value).map_err(|e| RemoteError::Malformed(e.to_string()))
}

/// Joins UIDs the way the server expects them: `1,2,3`.
#[must_use]
pub fn join_uids(uids: &[Uid]) -> String {
    uids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(rename = "@Collection", default = "Vec::new")]
    items: Vec<T>,
}

// Folders

#[derive(Debug, Deserialize)]
struct WireFolderList {
    #[serde(rename = "@Collection", default)]
    items: Vec<WireFolder>,
    #[serde(rename = "SystemFolders", alias = "systemFolders", default)]
    system_folders: WireSystemFolders,
    #[serde(rename = "FoldersHash", alias = "foldersHash", default)]
    folders_hash: String,
}

#[derive(Debug, Deserialize)]
struct WireFolder {
    #[serde(rename = "FullName", alias = "FullNameRaw", alias = "fullName")]
    full_name: String,
    #[serde(rename = "FullNameHash", alias = "fullNameHash", default)]
    full_name_hash: String,
    #[serde(rename = "Name", alias = "name", default)]
    name: String,
    #[serde(rename = "Delimiter", alias = "delimiter", default)]
    delimiter: String,
    #[serde(rename = "IsSubscribed", alias = "isSubscribed", alias = "subscribed", default = "yes")]
    subscribed: bool,
    #[serde(rename = "IsSelectable", alias = "Selectable", alias = "selectable", default = "yes")]
    selectable: bool,
    #[serde(rename = "HasSubFolders", alias = "hasSubFolders", default)]
    has_children: bool,
    #[serde(rename = "MessageCount", alias = "totalEmails")]
    message_count: Option<u32>,
    #[serde(rename = "MessageUnseenCount", alias = "unreadEmails")]
    unseen_count: Option<u32>,
    #[serde(rename = "UidNext", alias = "uidNext")]
    uid_next: Option<u32>,
    #[serde(rename = "SubFolders", alias = "subFolders")]
    sub_folders: Option<Collection<WireFolder>>,
}

const fn yes() -> bool {
    true
}

impl WireFolder {
    /// Converts the folder and appends it, then its children, to `out`.
    fn flatten_into(self, out: &mut Vec<Folder>) {
        let mut folder = Folder::new(self.full_name);
        if !self.full_name_hash.is_empty() {
            folder.full_name_hash = self.full_name_hash;
        }
        if !self.name.is_empty() {
            folder.name = self.name;
        }
        folder.delimiter = self.delimiter.chars().next();
        folder.subscribed = self.subscribed;
        folder.selectable = self.selectable;
        folder.message_count_all = self.message_count.unwrap_or_default();
        folder.message_count_unread = self.unseen_count.unwrap_or_default();
        folder.uid_next = self.uid_next.map(Uid);

        let children = self.sub_folders.map(|c| c.items).unwrap_or_default();
        folder.has_children = self.has_children || !children.is_empty();
        out.push(folder);
        for child in children {
            child.flatten_into(out);
        }
    }
}

/// System folders keyed by role number: 1 inbox, 2 sent, 3 drafts, 4 spam,
/// 5 trash, 6 archive.
#[derive(Debug, Default, Deserialize)]
struct WireSystemFolders {
    #[serde(rename = "1")]
    inbox: Option<String>,
    #[serde(rename = "2", default)]
    sent: SystemFolder,
    #[serde(rename = "3", default)]
    drafts: SystemFolder,
    #[serde(rename = "4", default)]
    spam: SystemFolder,
    #[serde(rename = "5", default)]
    trash: SystemFolder,
    #[serde(rename = "6", default)]
    archive: SystemFolder,
}

impl From<WireSystemFolders> for SystemFolders {
    fn from(wire: WireSystemFolders) -> Self {
        let defaults = Self::default();
        Self {
            inbox: wire
                .inbox
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.inbox),
            sent: wire.sent,
            drafts: wire.drafts,
            spam: wire.spam,
            trash: wire.trash,
            archive: wire.archive,
        }
    }
}

/// Decodes the `Folders` result, flattening nested folders in tree order.
///
/// # Errors
///
/// Returns [`RemoteError::Malformed`] if the payload does not match.
pub fn parse_folders(value: Value) -> RemoteResult<FolderListPayload> {
    let wire: WireFolderList = from_value(value)?;
    let mut folders = Vec::new();
    for folder in wire.items {
        folder.flatten_into(&mut folders);
    }
    Ok(FolderListPayload {
        folders,
        system_folders: wire.system_folders.into(),
        folders_hash: wire.folders_hash,
    })
}

// Messages

#[derive(Debug, Default, Deserialize)]
struct WireAddress {
    #[serde(rename = "Name", alias = "name", default)]
    name: String,
    #[serde(rename = "Email", alias = "email", default)]
    email: String,
}

fn format_addresses(addresses: &[WireAddress]) -> String {
    addresses
        .iter()
        .map(|a| {
            if a.name.is_empty() {
                a.email.clone()
            } else {
                format!("{} <{}>", a.name, a.email)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Derives message flags from IMAP keywords.
fn flags_from_keywords(keywords: &[String]) -> MessageFlags {
    let has = |flag: &str| keywords.iter().any(|k| k.eq_ignore_ascii_case(flag));
    MessageFlags {
        unseen: !has("\\seen"),
        flagged: has("\\flagged"),
        answered: has("\\answered"),
        forwarded: has("$forwarded"),
        read_receipt: has("$mdnsent"),
        deleted_mark: has("\\deleted"),
    }
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(rename = "Folder", alias = "folder")]
    folder: String,
    #[serde(rename = "Uid", alias = "uid")]
    uid: u32,
    #[serde(rename = "Hash", alias = "hash", default)]
    hash: String,
    #[serde(rename = "RequestHash", alias = "requestHash", default)]
    request_hash: String,
    #[serde(rename = "Subject", alias = "subject", default)]
    subject: String,
    #[serde(rename = "From", alias = "from", default)]
    from: Vec<WireAddress>,
    #[serde(rename = "DateTimeStampInUTC", alias = "dateTimestampInUTC")]
    timestamp: Option<i64>,
    #[serde(rename = "Size", alias = "size", default)]
    size: u64,
    #[serde(rename = "Flags", alias = "flags", default)]
    flags: Vec<String>,
    #[serde(rename = "Threads", alias = "threads", default)]
    threads: Vec<u32>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let mut message = Self::new(wire.folder, wire.uid);
        message.hash = wire.hash;
        message.request_hash = wire.request_hash;
        message.subject = wire.subject;
        message.from = format_addresses(&wire.from);
        message.date = wire
            .timestamp
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));
        message.size = wire.size;
        message.flags = flags_from_keywords(&wire.flags);
        message.threads = wire.threads.into_iter().map(Uid).collect();
        message
    }
}

#[derive(Debug, Deserialize)]
struct WireNewMessage {
    #[serde(rename = "Folder", alias = "folder", default)]
    folder: String,
    #[serde(rename = "Uid", alias = "uid")]
    uid: u32,
    #[serde(rename = "Subject", alias = "subject", default)]
    subject: String,
    #[serde(rename = "From", alias = "from", default)]
    from: Vec<WireAddress>,
}

fn new_messages(wire: Vec<WireNewMessage>, folder: &str) -> Vec<NewMessage> {
    wire.into_iter()
        .map(|m| NewMessage {
            folder: if m.folder.is_empty() {
                folder.to_string()
            } else {
                m.folder
            },
            uid: Uid(m.uid),
            subject: m.subject,
            from: format_addresses(&m.from),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct WireMessageList {
    #[serde(rename = "@Collection", default)]
    items: Vec<WireMessage>,
    #[serde(rename = "Folder", alias = "folder")]
    folder: String,
    #[serde(rename = "MessageCount", alias = "totalEmails", default)]
    message_count: u32,
    #[serde(rename = "MessageUnseenCount", alias = "unreadEmails", default)]
    unseen_count: u32,
    #[serde(rename = "MessageResultCount", alias = "resultCount")]
    result_count: Option<u32>,
    #[serde(rename = "Offset", alias = "offset", default)]
    offset: u32,
    #[serde(rename = "FolderHash", alias = "folderHash", default)]
    folder_hash: String,
    #[serde(rename = "UidNext", alias = "uidNext")]
    uid_next: Option<u32>,
    #[serde(rename = "NewMessages", alias = "newMessages", default)]
    new_messages: Vec<WireNewMessage>,
}

/// Decodes the `MessageList` result.
///
/// # Errors
///
/// Returns [`RemoteError::Malformed`] if the payload does not match.
pub fn parse_message_list(value: Value) -> RemoteResult<MessageListPage> {
    let wire: WireMessageList = from_value(value)?;
    let new_messages = new_messages(wire.new_messages, &wire.folder);
    Ok(MessageListPage {
        messages: wire.items.into_iter().map(Message::from).collect(),
        message_count: wire.message_count,
        unseen_count: wire.unseen_count,
        result_count: wire.result_count.unwrap_or(wire.message_count),
        offset: wire.offset,
        folder_hash: wire.folder_hash,
        uid_next: wire.uid_next.map(Uid),
        new_messages,
        folder: wire.folder,
    })
}

// Folder information

#[derive(Debug, Deserialize)]
struct WireUidFlags {
    #[serde(rename = "Uid", alias = "uid")]
    uid: u32,
    #[serde(rename = "Flags", alias = "flags", default)]
    flags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireFolderInfo {
    #[serde(rename = "Folder", alias = "folder", alias = "Name", alias = "name")]
    folder: String,
    #[serde(rename = "Hash", alias = "hash", default)]
    hash: String,
    #[serde(rename = "MessageCount", alias = "totalEmails")]
    message_count: Option<u32>,
    #[serde(rename = "MessageUnseenCount", alias = "unreadEmails")]
    unseen_count: Option<u32>,
    #[serde(rename = "UidNext", alias = "uidNext")]
    uid_next: Option<u32>,
    #[serde(rename = "Flags", alias = "flags", default)]
    flags: Vec<WireUidFlags>,
    #[serde(rename = "NewMessages", alias = "newMessages", default)]
    new_messages: Vec<WireNewMessage>,
}

impl From<WireFolderInfo> for FolderInfo {
    fn from(wire: WireFolderInfo) -> Self {
        let new_messages = new_messages(wire.new_messages, &wire.folder);
        Self {
            hash: wire.hash,
            message_count: wire.message_count,
            unseen_count: wire.unseen_count,
            uid_next: wire.uid_next.map(Uid),
            flags: wire
                .flags
                .into_iter()
                .map(|f| UidFlags {
                    uid: Uid(f.uid),
                    flags: flags_from_keywords(&f.flags).to_cache_tuple(),
                })
                .collect(),
            new_messages,
            folder: wire.folder,
        }
    }
}

/// Decodes the `FolderInformation` result.
///
/// # Errors
///
/// Returns [`RemoteError::Malformed`] if the payload does not match.
pub fn parse_folder_info(value: Value) -> RemoteResult<FolderInfo> {
    from_value::<WireFolderInfo>(value).map(FolderInfo::from)
}

#[derive(Debug, Deserialize)]
struct WireFolderInfoList {
    #[serde(rename = "List", alias = "list", default)]
    list: Vec<WireFolderInfo>,
}

/// Decodes the `FolderInformationMultiply` result.
///
/// # Errors
///
/// Returns [`RemoteError::Malformed`] if the payload does not match.
pub fn parse_folder_info_list(value: Value) -> RemoteResult<Vec<FolderInfo>> {
    let wire: WireFolderInfoList = from_value(value)?;
    Ok(wire.list.into_iter().map(FolderInfo::from).collect())
}

/// Decodes the result of a move, copy or delete: either `true` or a
/// `[folder, hash]` pair.
///
/// # Errors
///
/// Returns [`RemoteError::Malformed`] for any other shape.
pub fn parse_hash_update(value: Value) -> RemoteResult<Option<FolderHashUpdate>> {
    match value {
        Value::Array(items) => match items.as_slice() {
            [Value::String(folder), Value::String(hash)] => Ok(Some(FolderHashUpdate {
                folder: folder.clone(),
                hash: hash.clone(),
            })),
            _ => Err(RemoteError::Malformed(format!(
                "expected [folder, hash], got {} items",
                items.len()
            ))),
        },
        Value::Bool(true) => Ok(None),
        other => Err(RemoteError::Malformed(format!(
            "unexpected mutation result: {other}"
        ))),
    }
}

/// Decodes the `Quota` result, `[usage, limit]` in KiB.
///
/// # Errors
///
/// Returns [`RemoteError::Malformed`] if the payload does not match.
pub fn parse_quota(value: Value) -> RemoteResult<Quota> {
    let (usage, limit): (u64, u64) = from_value(value)?;
    Ok(Quota {
        usage: usage.saturating_mul(1024),
        limit: limit.saturating_mul(1024),
    })
}

// Accounts

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireAccount {
    Email(String),
    Object {
        #[serde(alias = "Email")]
        email: String,
    },
}

impl WireAccount {
    fn into_email(self) -> String {
        match self {
            Self::Email(email) | Self::Object { email } => email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireIdentity {
    #[serde(rename = "Id", alias = "id", default)]
    id: String,
    #[serde(rename = "Email", alias = "email", default)]
    email: String,
    #[serde(rename = "Name", alias = "name", default)]
    name: String,
    #[serde(rename = "ReplyTo", alias = "replyTo", default)]
    reply_to: String,
    #[serde(rename = "Bcc", alias = "bcc", default)]
    bcc: String,
    #[serde(rename = "Signature", alias = "signature", default)]
    signature: String,
    #[serde(rename = "SignatureInsertBefore", alias = "signatureInsertBefore", default)]
    signature_insert_before: bool,
}

#[derive(Debug, Deserialize)]
struct WireAccounts {
    #[serde(rename = "Accounts", alias = "accounts", default)]
    accounts: Vec<WireAccount>,
    #[serde(rename = "Identities", alias = "identities", default)]
    identities: Vec<WireIdentity>,
}

/// Decodes the `AccountsAndIdentities` result. The first account is the main
/// one.
///
/// # Errors
///
/// Returns [`RemoteError::Malformed`] if the payload does not match.
pub fn parse_accounts(value: Value) -> RemoteResult<AccountsAndIdentities> {
    let wire: WireAccounts = from_value(value)?;
    Ok(AccountsAndIdentities {
        accounts: wire
            .accounts
            .into_iter()
            .enumerate()
            .map(|(i, a)| Account::new(a.into_email(), i > 0))
            .collect(),
        identities: wire
            .identities
            .into_iter()
            .map(|i| Identity {
                id: i.id,
                email: i.email,
                name: i.name,
                reply_to: i.reply_to,
                bcc: i.bcc,
                signature: i.signature,
                signature_insert_before: i.signature_insert_before,
            })
            .collect(),
    })
}
