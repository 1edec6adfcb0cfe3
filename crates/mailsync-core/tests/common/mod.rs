//! Scripted remote used by the engine tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use mailsync_core::model::{
    Account, AccountsAndIdentities, Folder, Message, Quota, SystemFolder, SystemFolders, Uid,
};
use mailsync_core::remote::{
    FolderHashUpdate, FolderInfo, FolderListPayload, ListQuery, MessageListPage, MoveRequest,
    Remote, RemoteResult,
};

/// A call received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Folders,
    MessageList(ListQuery),
    FolderInformation {
        folder: String,
        known_uids: Vec<Uid>,
        uid_next: Option<Uid>,
    },
    FolderInformationMultiple(Vec<String>),
    Move(MoveRequest),
    Copy {
        from: String,
        to: String,
        uids: Vec<Uid>,
    },
    Delete {
        folder: String,
        uids: Vec<Uid>,
    },
    SetSeen {
        folder: String,
        uids: Vec<Uid>,
        seen: bool,
    },
    SetSeenToAll {
        folder: String,
        seen: bool,
        thread_uids: Option<Vec<Uid>>,
    },
    SetFlagged {
        folder: String,
        uids: Vec<Uid>,
        flagged: bool,
    },
    Quota,
    Accounts,
    ContactsSync,
}

/// Remote whose answers are scripted per call kind.
///
/// Scripted queues are consumed first; once empty, message lists fall back to
/// the per-folder default page and everything else succeeds with empty data.
#[derive(Default)]
pub struct MockRemote {
    calls: Mutex<Vec<Call>>,
    folders: Mutex<VecDeque<RemoteResult<FolderListPayload>>>,
    pages: Mutex<HashMap<String, MessageListPage>>,
    lists: Mutex<VecDeque<(Duration, RemoteResult<MessageListPage>)>>,
    infos: Mutex<VecDeque<RemoteResult<FolderInfo>>>,
    batches: Mutex<VecDeque<RemoteResult<Vec<FolderInfo>>>>,
    moves: Mutex<VecDeque<RemoteResult<Option<FolderHashUpdate>>>>,
    quotas: Mutex<VecDeque<RemoteResult<Quota>>>,
}

impl MockRemote {
    /// A remote serving [`folder_payload`] and a three-message inbox.
    pub fn standard() -> Self {
        let mock = Self::default();
        mock.set_page(inbox_page());
        mock
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<ListQuery> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::MessageList(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    pub fn moves(&self) -> Vec<MoveRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Move(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(*c)).count()
    }

    pub fn set_page(&self, page: MessageListPage) {
        self.pages.lock().unwrap().insert(page.folder.clone(), page);
    }

    pub fn push_folders(&self, result: RemoteResult<FolderListPayload>) {
        self.folders.lock().unwrap().push_back(result);
    }

    pub fn push_list(&self, delay: Duration, result: RemoteResult<MessageListPage>) {
        self.lists.lock().unwrap().push_back((delay, result));
    }

    pub fn push_info(&self, result: RemoteResult<FolderInfo>) {
        self.infos.lock().unwrap().push_back(result);
    }

    pub fn push_batch(&self, result: RemoteResult<Vec<FolderInfo>>) {
        self.batches.lock().unwrap().push_back(result);
    }

    pub fn push_move(&self, result: RemoteResult<Option<FolderHashUpdate>>) {
        self.moves.lock().unwrap().push_back(result);
    }

    pub fn push_quota(&self, result: RemoteResult<Quota>) {
        self.quotas.lock().unwrap().push_back(result);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_move(&self) -> RemoteResult<Option<FolderHashUpdate>> {
        self.moves.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

#[async_trait]
impl Remote for MockRemote {
    async fn folders(&self) -> RemoteResult<FolderListPayload> {
        self.record(Call::Folders);
        let scripted = self.folders.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(folder_payload()))
    }

    async fn message_list(&self, query: &ListQuery) -> RemoteResult<MessageListPage> {
        self.record(Call::MessageList(query.clone()));
        let scripted = self.lists.lock().unwrap().pop_front();
        if let Some((delay, result)) = scripted {
            tokio::time::sleep(delay).await;
            return result;
        }
        let page = self.pages.lock().unwrap().get(&query.folder).cloned();
        Ok(page.unwrap_or_else(|| MessageListPage {
            folder: query.folder.clone(),
            ..MessageListPage::default()
        }))
    }

    async fn folder_information(
        &self,
        folder: &str,
        known_uids: &[Uid],
        uid_next: Option<Uid>,
    ) -> RemoteResult<FolderInfo> {
        self.record(Call::FolderInformation {
            folder: folder.to_string(),
            known_uids: known_uids.to_vec(),
            uid_next,
        });
        let scripted = self.infos.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(FolderInfo {
                folder: folder.to_string(),
                ..FolderInfo::default()
            })
        })
    }

    async fn folder_information_multiple(
        &self,
        folders: &[String],
    ) -> RemoteResult<Vec<FolderInfo>> {
        self.record(Call::FolderInformationMultiple(folders.to_vec()));
        let scripted = self.batches.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn move_messages(&self, request: &MoveRequest) -> RemoteResult<Option<FolderHashUpdate>> {
        self.record(Call::Move(request.clone()));
        self.next_move()
    }

    async fn copy_messages(
        &self,
        from: &str,
        to: &str,
        uids: &[Uid],
    ) -> RemoteResult<Option<FolderHashUpdate>> {
        self.record(Call::Copy {
            from: from.to_string(),
            to: to.to_string(),
            uids: uids.to_vec(),
        });
        self.next_move()
    }

    async fn delete_messages(
        &self,
        folder: &str,
        uids: &[Uid],
    ) -> RemoteResult<Option<FolderHashUpdate>> {
        self.record(Call::Delete {
            folder: folder.to_string(),
            uids: uids.to_vec(),
        });
        self.next_move()
    }

    async fn set_seen(&self, folder: &str, uids: &[Uid], seen: bool) -> RemoteResult<()> {
        self.record(Call::SetSeen {
            folder: folder.to_string(),
            uids: uids.to_vec(),
            seen,
        });
        Ok(())
    }

    async fn set_seen_to_all(
        &self,
        folder: &str,
        seen: bool,
        thread_uids: Option<&[Uid]>,
    ) -> RemoteResult<()> {
        self.record(Call::SetSeenToAll {
            folder: folder.to_string(),
            seen,
            thread_uids: thread_uids.map(<[Uid]>::to_vec),
        });
        Ok(())
    }

    async fn set_flagged(&self, folder: &str, uids: &[Uid], flagged: bool) -> RemoteResult<()> {
        self.record(Call::SetFlagged {
            folder: folder.to_string(),
            uids: uids.to_vec(),
            flagged,
        });
        Ok(())
    }

    async fn quota(&self) -> RemoteResult<Quota> {
        self.record(Call::Quota);
        let scripted = self.quotas.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(Quota {
            usage: 10,
            limit: 100,
        }))
    }

    async fn accounts_and_identities(&self) -> RemoteResult<AccountsAndIdentities> {
        self.record(Call::Accounts);
        Ok(AccountsAndIdentities {
            accounts: vec![Account::new("user@example.com", false)],
            identities: Vec::new(),
        })
    }

    async fn contacts_sync(&self) -> RemoteResult<()> {
        self.record(Call::ContactsSync);
        Ok(())
    }
}

/// INBOX, Sent, Drafts, Spam, Trash and Archive, all roles assigned.
pub fn folder_payload() -> FolderListPayload {
    let named = |name: &str| SystemFolder::Named(name.to_string());
    FolderListPayload {
        folders: ["INBOX", "Sent", "Drafts", "Spam", "Trash", "Archive"]
            .into_iter()
            .map(Folder::new)
            .collect(),
        system_folders: SystemFolders {
            sent: named("Sent"),
            drafts: named("Drafts"),
            spam: named("Spam"),
            trash: named("Trash"),
            archive: named("Archive"),
            ..SystemFolders::default()
        },
        folders_hash: "folders-1".to_string(),
    }
}

/// Inbox with ten messages, four unread; UIDs 1 and 2 (unread) and 3 (read)
/// are on the first page.
pub fn inbox_page() -> MessageListPage {
    let message = |uid: u32, unseen: bool| {
        let mut m = Message::new("INBOX", uid);
        m.subject = format!("Message {uid}");
        m.flags.unseen = unseen;
        m
    };
    MessageListPage {
        folder: "INBOX".to_string(),
        messages: vec![message(1, true), message(2, true), message(3, false)],
        message_count: 10,
        unseen_count: 4,
        result_count: 10,
        offset: 0,
        folder_hash: "inbox-h1".to_string(),
        uid_next: None,
        new_messages: Vec::new(),
    }
}
