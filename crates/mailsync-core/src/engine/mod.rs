//! The sync engine: owns every cache and component and reacts to commands,
//! timers and remote completions one event at a time.
//!
//! Remote calls run in spawned tasks that post their outcome back to the
//! engine's channel, so state is only ever touched from [`SyncEngine::step`].

mod event;
mod timers;
mod watchdog;

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use event::{Command, DeleteDisposition, DeleteKind, Notice, PendingDelete, Shutdown};
pub use watchdog::WakeWatchdog;

use crate::cache::{FlagCache, FolderHashRegistry};
use crate::config::{SyncSettings, Timing};
use crate::error::{Error, Result};
use crate::i18n::{Notification, Translate, notification_text};
use crate::model::{
    AccountsAndIdentities, FolderStore, NewMessage, Quota, SetAction, SystemFolder, Uid,
};
use crate::remote::{
    FolderHashUpdate, FolderInfo, FolderListPayload, ListQuery, MessageListPage, Remote,
    RemoteResult,
};
use crate::storage::LocalStore;
use crate::sync::{
    Debounce, FolderPoller, ListOutcome, MessageListReconciler, MoveBatcher, Paging, PollDecision,
    PollMode, Removal, init_uid_next_and_new_messages,
};
use event::{Event, Timer};
use timers::Timers;

const NOTICE_CAPACITY: usize = 256;

/// Sends commands to a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl EngineHandle {
    /// Queues a command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EngineStopped`] if the engine is gone.
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(Event::Command(command))
            .map_err(|_| Error::EngineStopped)
    }
}

/// The application controller.
pub struct SyncEngine {
    remote: Arc<dyn Remote>,
    tr: Arc<dyn Translate>,
    settings: SyncSettings,
    local: LocalStore,
    folders: FolderStore,
    flags: FlagCache,
    hashes: FolderHashRegistry,
    list: MessageListReconciler,
    batcher: MoveBatcher,
    poller: FolderPoller,
    move_debounce: Debounce,
    quota_debounce: Debounce,
    timers: Timers,
    watchdog: WakeWatchdog,
    list_task: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    notices: broadcast::Sender<Notice>,
    contacts_syncing: bool,
    folders_hash: String,
    quota: Option<Quota>,
    accounts: AccountsAndIdentities,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("current_folder", &self.folders.current_name())
            .field("folders", &self.folders.len())
            .field("pending_moves", &self.batcher.len())
            .field("list_state", &self.list.state())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Creates an engine. Nothing is fetched until [`SyncEngine::boot`].
    #[must_use]
    pub fn new(
        remote: Arc<dyn Remote>,
        settings: SyncSettings,
        local: LocalStore,
        tr: Arc<dyn Translate>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let timing = settings.timing;

        Self {
            remote,
            tr,
            folders: FolderStore::new(settings.system_folders.clone()),
            local,
            flags: FlagCache::new(),
            hashes: FolderHashRegistry::new(),
            list: MessageListReconciler::new(),
            batcher: MoveBatcher::new(),
            poller: FolderPoller::new(
                timing.poll_batch_size,
                TimeDelta::milliseconds(i64::try_from(timing.folder_stale_after_ms).unwrap_or(i64::MAX)),
            ),
            move_debounce: Debounce::new(Timing::ms(timing.move_debounce_ms)),
            quota_debounce: Debounce::new(Timing::ms(timing.quota_debounce_ms)),
            timers: Timers::default(),
            watchdog: WakeWatchdog::new(
                Timing::ms(timing.wake_check_interval_ms),
                Timing::ms(timing.wake_grace_ms),
                Utc::now(),
            ),
            list_task: None,
            tx,
            rx,
            notices,
            contacts_syncing: false,
            folders_hash: String::new(),
            quota: None,
            accounts: AccountsAndIdentities::default(),
            settings,
        }
    }

    /// Returns a handle for sending commands.
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            tx: self.tx.clone(),
        }
    }

    /// Subscribes to notices.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Starts the boot sequence: the folder list is fetched first, everything
    /// else follows once it arrives.
    pub fn boot(&mut self) {
        info!("Booting sync engine");
        self.timers.every(
            &self.tx,
            Timing::ms(self.settings.timing.wake_check_interval_ms),
            Timer::WakeCheck,
        );
        self.folders_reload_inner(true);
    }

    /// Boots and processes events until the engine stops.
    pub async fn run(mut self) -> Shutdown {
        self.boot();
        let reason = loop {
            if let ControlFlow::Break(reason) = self.step().await {
                break reason;
            }
        };
        info!(?reason, "Sync engine stopped");
        self.shutdown().await;
        reason
    }

    /// Stops timers and the list fetch, then waits for queued local store
    /// writes.
    pub async fn shutdown(mut self) {
        self.timers.clear();
        if let Some(task) = self.list_task.take() {
            task.abort();
        }
        self.local.close().await;
    }

    /// Waits for the next event and handles it.
    pub async fn step(&mut self) -> ControlFlow<Shutdown> {
        match self.rx.recv().await {
            Some(event) => self.handle_event(event),
            None => ControlFlow::Break(Shutdown::Requested),
        }
    }

    fn handle_event(&mut self, event: Event) -> ControlFlow<Shutdown> {
        if event.is_logout() {
            warn!("Session logged out");
            self.notify(Notice::LoggedOut);
            return ControlFlow::Break(Shutdown::LoggedOut);
        }

        match event {
            Event::Command(command) => return self.handle_command(command),
            Event::FoldersLoaded { boot, result } => return self.on_folders_loaded(boot, result),
            Event::ListLoaded { seq, result } => self.on_list_loaded(seq, result),
            Event::InboxRecached(result) => self.on_inbox_recached(result),
            Event::FolderInfoLoaded(result) => self.on_folder_info(result),
            Event::FolderInfoBatchLoaded { boot, result } => self.on_folder_info_batch(boot, result),
            Event::MoveOrDeleteDone(result) => self.on_move_or_delete_done(result),
            Event::FlagsStored(result) => {
                if let Err(err) = result {
                    warn!(error = %err, "Storing flags failed");
                }
            }
            Event::QuotaLoaded(result) => self.on_quota_loaded(result),
            Event::AccountsLoaded(result) => self.on_accounts_loaded(result),
            Event::ContactsSynced(result) => {
                self.contacts_syncing = false;
                if let Err(err) = result {
                    warn!(error = %err, "Contacts sync failed");
                }
            }
            Event::MoveFlushDue { generation } => {
                if self.move_debounce.fire(generation) {
                    self.flush_moves();
                }
            }
            Event::QuotaDue { generation } => {
                if self.quota_debounce.fire(generation) {
                    self.quota();
                }
            }
            Event::Timer(timer) => return self.on_timer(timer),
        }
        ControlFlow::Continue(())
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<Shutdown> {
        debug!(?command, "Handling command");
        let result = match command {
            Command::ReloadMessageList {
                drop_page,
                drop_folder_cache,
            } => {
                self.reload_message_list(drop_page, drop_folder_cache);
                Ok(())
            }
            Command::OpenFolder(folder) => self.open_folder(&folder),
            Command::SetPage(page) => {
                self.set_page(page);
                Ok(())
            }
            Command::SetSearch(search) => {
                self.set_search(&search);
                Ok(())
            }
            Command::OpenThread(uid) => {
                self.open_thread(uid);
                Ok(())
            }
            Command::CloseThread => {
                self.close_thread();
                Ok(())
            }
            Command::Select(uid) => {
                self.list.select(uid);
                Ok(())
            }
            Command::SetChecked { uid, checked } => {
                self.list.set_checked(uid, checked);
                Ok(())
            }
            Command::DeleteMessages {
                kind,
                folder,
                uids,
                use_folder,
            } => {
                self.delete_messages_from_folder(kind, &folder, &uids, use_folder);
                Ok(())
            }
            Command::DeleteWithoutMove => {
                self.delete_without_move();
                Ok(())
            }
            Command::ConfirmDelete(pending) => {
                self.confirm_delete(pending);
                Ok(())
            }
            Command::MoveMessages {
                from,
                uids,
                to,
                copy,
            } => {
                if !self.move_messages_to_folder(&from, &uids, &to, copy) {
                    debug!(from, to, "Move ignored");
                }
                Ok(())
            }
            Command::SetAction {
                folder,
                action,
                uids,
            } => {
                let uids = uids.unwrap_or_else(|| self.list.checked_or_selected_uids());
                self.message_list_action(&folder, action, &uids);
                Ok(())
            }
            Command::SetActionForAll { folder, action } => {
                self.message_list_action_for_all(&folder, action);
                Ok(())
            }
            Command::FolderInformation(folder) => {
                self.folder_information(&folder);
                Ok(())
            }
            Command::FolderInformationMultiply => {
                self.folder_information_multiply(false);
                Ok(())
            }
            Command::SetExpandedFolder {
                full_name_hash,
                expanded,
            } => self.set_expanded_folder(&full_name_hash, expanded),
            Command::FoldersReload => {
                self.folders_reload();
                Ok(())
            }
            Command::Quota => {
                self.quota();
                Ok(())
            }
            Command::AccountsAndIdentities => {
                self.accounts_and_identities();
                Ok(())
            }
            Command::ContactsSync => {
                self.contacts_sync();
                Ok(())
            }
            Command::Shutdown => return ControlFlow::Break(Shutdown::Requested),
        };

        if let Err(err) = result {
            warn!(error = %err, "Command failed");
        }
        ControlFlow::Continue(())
    }

    // Folder list

    /// Reloads the folder list.
    pub fn folders_reload(&mut self) {
        self.folders_reload_inner(false);
    }

    fn folders_reload_inner(&mut self, boot: bool) {
        let remote = Arc::clone(&self.remote);
        self.spawn_call(async move {
            Event::FoldersLoaded {
                boot,
                result: remote.folders().await,
            }
        });
    }

    fn on_folders_loaded(
        &mut self,
        boot: bool,
        result: RemoteResult<FolderListPayload>,
    ) -> ControlFlow<Shutdown> {
        match result {
            Ok(payload) => {
                self.apply_folder_list(payload);
                if boot {
                    self.start();
                } else if self.folders.current().is_none() {
                    let inbox = self.folders.inbox_name().to_string();
                    if let Err(err) = self.open_folder(&inbox) {
                        warn!(error = %err, "Cannot return to the inbox");
                    }
                }
            }
            Err(err) if boot => {
                warn!(error = %err, "Folder list unavailable at boot");
                self.notify(Notice::LoggedOut);
                return ControlFlow::Break(Shutdown::LoggedOut);
            }
            Err(err) => warn!(error = %err, "Folder list reload failed"),
        }
        ControlFlow::Continue(())
    }

    /// Replaces the folder list.
    ///
    /// Counters, poll times and next UIDs of folders that were already known
    /// carry over. Locally configured system folders win over the server's.
    pub fn apply_folder_list(&mut self, payload: FolderListPayload) {
        let FolderListPayload {
            mut folders,
            system_folders,
            folders_hash,
        } = payload;

        for folder in &mut folders {
            if let Some(old) = self.folders.get(&folder.full_name_raw) {
                folder.message_count_all = old.message_count_all;
                folder.message_count_unread = old.message_count_unread;
                folder.last_polled_at = old.last_polled_at;
                folder.uid_next = old.uid_next;
            }
        }

        let mut system = self.settings.system_folders.clone();
        system.fill_from(&system_folders);
        *self.folders.system_mut() = system;

        let expanded = self.local.expanded_folders();
        self.folders.replace_all(folders, &expanded);
        self.folders_hash = folders_hash;

        info!(count = self.folders.len(), "Folder list loaded");
        self.notify(Notice::FoldersReloaded {
            count: self.folders.len(),
        });
    }

    fn start(&mut self) {
        let timing = self.settings.timing;
        let tx = self.tx.clone();

        self.timers
            .every(&tx, Timing::ms(timing.poll_interval_ms), Timer::PollFolders);
        self.timers
            .every(&tx, Timing::ms(timing.quota_interval_ms), Timer::Quota);
        self.timers.every(
            &tx,
            Timing::ms(timing.folders_reload_interval_ms),
            Timer::FoldersReload,
        );
        self.timers.after(
            &tx,
            Timing::ms(timing.contacts_initial_delay_ms),
            Timer::ContactsSync,
        );
        self.timers
            .every(&tx, self.settings.contacts_sync_period(), Timer::ContactsSync);

        let inbox = self.folders.inbox_name().to_string();
        if let Err(err) = self.open_folder(&inbox) {
            warn!(error = %err, "Inbox missing from the folder list");
        }
        self.accounts_and_identities();

        self.timers
            .after(&tx, Timing::ms(timing.initial_poll_delay_ms), Timer::InitialPoll);
        self.timers
            .after(&tx, Timing::ms(timing.initial_quota_delay_ms), Timer::Quota);
        info!("Sync engine started");
    }

    /// Records a folder's expanded state in the local store.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be written.
    pub fn set_expanded_folder(&mut self, full_name_hash: &str, expanded: bool) -> Result<()> {
        self.folders.set_collapsed_by_hash(full_name_hash, !expanded);
        self.local.set_expanded_folder(full_name_hash, expanded)
    }

    // Message list

    fn paging(&self) -> Paging {
        Paging {
            per_page: self.settings.messages_per_page.max(1),
            use_threads: self.settings.use_threads,
        }
    }

    /// Refetches the displayed list.
    pub fn reload_message_list(&mut self, drop_page: bool, drop_folder_cache: bool) {
        let paging = self.paging();
        let request = self
            .list
            .reload(drop_page, drop_folder_cache, &mut self.hashes, &self.folders, paging);

        if let Some(route) = request.route {
            self.notify(Notice::Navigate(route));
        }
        self.notify(Notice::ListLoading);

        if let Some(previous) = self.list_task.take() {
            previous.abort();
        }
        let remote = Arc::clone(&self.remote);
        let seq = request.seq;
        let query = request.query;
        self.list_task = Some(self.spawn_call(async move {
            Event::ListLoaded {
                seq,
                result: remote.message_list(&query).await,
            }
        }));
    }

    fn on_list_loaded(&mut self, seq: u64, result: RemoteResult<MessageListPage>) {
        let outcome = self.list.apply_result(
            seq,
            result,
            &mut self.flags,
            &mut self.hashes,
            &mut self.folders,
            self.tr.as_ref(),
        );

        match outcome {
            ListOutcome::Applied(page) => {
                self.list_task = None;
                self.notify(Notice::ListChanged {
                    folder: page.folder.clone(),
                    count: self.list.visible().count(),
                });
                self.notify_counts(&page.folder);
                let fresh = init_uid_next_and_new_messages(
                    &mut self.folders,
                    &page.folder,
                    page.uid_next,
                    &page.new_messages,
                );
                self.notify_new_messages(&page.folder, fresh);
            }
            ListOutcome::Failed(_) => {
                self.list_task = None;
                self.notify(Notice::ListError(self.list.error().to_string()));
            }
            ListOutcome::Aborted | ListOutcome::Unloaded => self.list_task = None,
            ListOutcome::Superseded => {}
        }
    }

    fn recache_inbox(&mut self) {
        let inbox = self.folders.inbox_name().to_string();
        let query = ListQuery {
            offset: 0,
            limit: self.paging().per_page,
            use_threads: self.settings.use_threads,
            folder_hash: self.hashes.get(&inbox).to_string(),
            uid_next: self.folders.get(&inbox).and_then(|f| f.uid_next),
            folder: inbox,
            ..ListQuery::default()
        };
        debug!("Recaching inbox");
        let remote = Arc::clone(&self.remote);
        self.spawn_call(async move { Event::InboxRecached(remote.message_list(&query).await) });
    }

    fn on_inbox_recached(&mut self, result: RemoteResult<MessageListPage>) {
        match result {
            Ok(page) => {
                let applied = MessageListReconciler::absorb_page(
                    page,
                    &mut self.flags,
                    &mut self.hashes,
                    &mut self.folders,
                );
                self.notify_counts(&applied.folder);
                let fresh = init_uid_next_and_new_messages(
                    &mut self.folders,
                    &applied.folder,
                    applied.uid_next,
                    &applied.new_messages,
                );
                self.notify_new_messages(&applied.folder, fresh);
            }
            Err(err) if err.is_silent() => {}
            Err(err) => warn!(error = %err, "Inbox recache failed"),
        }
    }

    /// Displays another folder from its first page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFolder`] if the folder is not in the list.
    pub fn open_folder(&mut self, folder: &str) -> Result<()> {
        if self.folders.get(folder).is_none() {
            return Err(Error::UnknownFolder(folder.to_string()));
        }
        let route = self.list.open_folder(folder, &mut self.folders);
        self.notify(Notice::Navigate(route));
        self.reload_message_list(false, false);
        Ok(())
    }

    /// Displays another page.
    pub fn set_page(&mut self, page: u32) {
        let route = self.list.set_page(page, &self.folders);
        self.navigate_and_reload(route);
    }

    /// Filters the list.
    pub fn set_search(&mut self, search: &str) {
        let route = self.list.set_search(search, &self.folders);
        self.navigate_and_reload(route);
    }

    /// Opens a thread.
    pub fn open_thread(&mut self, root: Uid) {
        let route = self.list.open_thread(root, &self.folders);
        self.navigate_and_reload(route);
    }

    /// Leaves the open thread.
    pub fn close_thread(&mut self) {
        let route = self.list.close_thread(&self.folders);
        self.navigate_and_reload(route);
    }

    fn navigate_and_reload(&mut self, route: crate::model::MailboxRoute) {
        self.notify(Notice::Navigate(route));
        self.reload_message_list(false, false);
    }

    // Moves and deletes

    /// Deletes messages through the system folder matching `kind`.
    ///
    /// Nothing is mutated unless the result is [`DeleteDisposition::Moved`].
    pub fn delete_messages_from_folder(
        &mut self,
        kind: DeleteKind,
        folder: &str,
        uids: &[Uid],
        use_folder: bool,
    ) -> DeleteDisposition {
        let system = self.folders.system();
        let target = match kind {
            DeleteKind::Spam => system.spam.clone(),
            DeleteKind::NotSpam => SystemFolder::Named(system.inbox.clone()),
            DeleteKind::Trash => system.trash.clone(),
            DeleteKind::Archive => system.archive.clone(),
        };
        let from_junk = system.spam.is(folder) || system.trash.is(folder);

        let use_folder = use_folder && !target.is_unused();
        let destination = target
            .name()
            .filter(|name| self.folders.get(name).is_some())
            .map(str::to_string);

        match destination {
            None if use_folder => {
                let key = match kind {
                    DeleteKind::Spam => "POPUPS_SYSTEM_FOLDERS/NOTIFICATION_SPAM",
                    DeleteKind::Trash => "POPUPS_SYSTEM_FOLDERS/NOTIFICATION_TRASH",
                    DeleteKind::Archive => "POPUPS_SYSTEM_FOLDERS/NOTIFICATION_ARCHIVE",
                    DeleteKind::NotSpam => Notification::UnknownError.key(),
                };
                let text = self.tr.translate(key, &[]);
                self.notify(Notice::SystemFolderRequired { kind, text });
                DeleteDisposition::SystemFolderRequired(kind)
            }
            Some(to) if use_folder && !(kind == DeleteKind::Trash && from_junk) => {
                self.request_move(folder, &to, uids);
                let removal = self.list.remove_messages(
                    folder,
                    uids,
                    Some(&to),
                    false,
                    &mut self.hashes,
                    &mut self.folders,
                );
                self.after_removal(removal, folder, Some(&to));
                DeleteDisposition::Moved { to }
            }
            _ => {
                let pending = PendingDelete {
                    folder: folder.to_string(),
                    uids: uids.to_vec(),
                };
                let prompt = self.tr.translate("POPUPS_ASK/DESC_WANT_DELETE_MESSAGES", &[]);
                self.notify(Notice::ConfirmDelete {
                    pending: pending.clone(),
                    prompt,
                });
                DeleteDisposition::NeedsConfirmation(pending)
            }
        }
    }

    /// Asks to permanently delete the checked or selected messages of the
    /// displayed folder. Ignored unless dangerous actions are enabled.
    pub fn delete_without_move(&mut self) -> Option<DeleteDisposition> {
        if !self.settings.dangerous_actions {
            debug!("Delete without move is disabled");
            return None;
        }
        let folder = self.folders.current_name().to_string();
        let uids = self.list.checked_or_selected_uids_with_threads();
        if uids.is_empty() {
            return None;
        }
        Some(self.delete_messages_from_folder(DeleteKind::Trash, &folder, &uids, false))
    }

    /// Carries out a permanent delete the user confirmed.
    pub fn confirm_delete(&mut self, pending: PendingDelete) {
        self.delete_messages_from_folder_without_check(&pending.folder, &pending.uids);
    }

    /// Permanently deletes messages without asking.
    pub fn delete_messages_from_folder_without_check(&mut self, folder: &str, uids: &[Uid]) {
        if uids.is_empty() {
            return;
        }
        let remote = Arc::clone(&self.remote);
        let owned_folder = folder.to_string();
        let owned_uids = uids.to_vec();
        self.spawn_call(async move {
            Event::MoveOrDeleteDone(remote.delete_messages(&owned_folder, &owned_uids).await)
        });

        let removal =
            self.list
                .remove_messages(folder, uids, None, false, &mut self.hashes, &mut self.folders);
        self.after_removal(removal, folder, None);
    }

    /// Moves or copies messages between two known folders.
    ///
    /// Returns false, doing nothing, when the folders are equal or unknown or
    /// no UID is given.
    pub fn move_messages_to_folder(&mut self, from: &str, uids: &[Uid], to: &str, copy: bool) -> bool {
        if from == to || uids.is_empty() {
            return false;
        }
        if self.folders.get(from).is_none() || self.folders.get(to).is_none() {
            return false;
        }

        if copy {
            let remote = Arc::clone(&self.remote);
            let (owned_from, owned_to, owned_uids) = (from.to_string(), to.to_string(), uids.to_vec());
            self.spawn_call(async move {
                Event::MoveOrDeleteDone(
                    remote
                        .copy_messages(&owned_from, &owned_to, &owned_uids)
                        .await,
                )
            });
        } else {
            self.request_move(from, to, uids);
        }

        let removal =
            self.list
                .remove_messages(from, uids, Some(to), copy, &mut self.hashes, &mut self.folders);
        self.after_removal(removal, from, Some(to));
        true
    }

    fn request_move(&mut self, from: &str, to: &str, uids: &[Uid]) {
        self.batcher.request_move(from, to, uids);
        self.move_debounce
            .schedule(&self.tx, |generation| Event::MoveFlushDue { generation });
    }

    fn flush_moves(&mut self) {
        for pending in self.batcher.drain() {
            let request = pending.into_request(self.folders.system());
            info!(
                from = %request.from,
                to = %request.to,
                count = request.uids.len(),
                marker = request.marker.as_str(),
                "Flushing move"
            );
            let remote = Arc::clone(&self.remote);
            self.spawn_call(async move {
                Event::MoveOrDeleteDone(remote.move_messages(&request).await)
            });
        }
    }

    fn after_removal(&mut self, removal: Removal, from: &str, to: Option<&str>) {
        if let Some(route) = removal.route {
            self.notify(Notice::Navigate(route));
        }
        if removal.struck > 0 {
            self.notify(Notice::ListChanged {
                folder: from.to_string(),
                count: self.list.visible().count(),
            });
        }
        self.notify_counts(from);
        if let Some(to) = to {
            self.notify_counts(to);
        }
    }

    fn on_move_or_delete_done(&mut self, result: RemoteResult<Option<FolderHashUpdate>>) {
        let current = self.folders.current_name().to_string();
        match result {
            Err(err) if err.is_silent() => return,
            Ok(Some(update)) => self.hashes.set(&update.folder, update.hash),
            Ok(None) => self.hashes.invalidate(&current),
            Err(err) => {
                warn!(error = %err, "Move or delete failed");
                self.hashes.invalidate(&current);
                let code = err.code();
                if code == Some(Notification::CantMoveMessage.code())
                    || code == Some(Notification::CantCopyMessage.code())
                {
                    let text = notification_text(
                        self.tr.as_ref(),
                        code,
                        None,
                        Notification::UnknownError,
                    );
                    self.notify(Notice::Alert(text));
                }
            }
        }

        self.reload_message_list(self.list.is_empty(), false);
        self.quota_debounce
            .schedule(&self.tx, |generation| Event::QuotaDue { generation });
    }

    // Flags

    /// Applies a flag action optimistically and sends it to the server.
    pub fn message_list_action(&mut self, folder: &str, action: SetAction, uids: &[Uid]) {
        let uids = self
            .list
            .apply_set_action(folder, uids, action, &mut self.flags, &mut self.folders);
        if uids.is_empty() {
            return;
        }

        let remote = Arc::clone(&self.remote);
        let owned_folder = folder.to_string();
        self.spawn_call(async move {
            let result = match action {
                SetAction::SetSeen => remote.set_seen(&owned_folder, &uids, true).await,
                SetAction::UnsetSeen => remote.set_seen(&owned_folder, &uids, false).await,
                SetAction::SetFlag => remote.set_flagged(&owned_folder, &uids, true).await,
                SetAction::UnsetFlag => remote.set_flagged(&owned_folder, &uids, false).await,
            };
            Event::FlagsStored(result)
        });

        self.notify(Notice::FlagsChanged {
            folder: folder.to_string(),
        });
        self.notify_counts(folder);
    }

    /// Marks a whole folder, or the open thread, read or unread.
    pub fn message_list_action_for_all(&mut self, folder: &str, action: SetAction) {
        let in_thread = self.list.thread_uid().is_some();
        let Some(uids) = self.list.apply_set_action_for_all(
            folder,
            action,
            in_thread,
            &mut self.flags,
            &mut self.folders,
        ) else {
            return;
        };

        let remote = Arc::clone(&self.remote);
        let owned_folder = folder.to_string();
        let seen = action == SetAction::SetSeen;
        self.spawn_call(async move {
            let thread_uids = in_thread.then_some(uids.as_slice());
            Event::FlagsStored(
                remote
                    .set_seen_to_all(&owned_folder, seen, thread_uids)
                    .await,
            )
        });

        self.notify(Notice::FlagsChanged {
            folder: folder.to_string(),
        });
        self.notify_counts(folder);
    }

    // Polling

    /// Polls one folder, sending the UIDs displayed from it.
    pub fn folder_information(&mut self, folder: &str) {
        if folder.trim().is_empty() {
            return;
        }
        let known_uids: Vec<Uid> = if folder == self.folders.current_name() {
            self.list.visible().map(|m| m.uid).collect()
        } else {
            Vec::new()
        };
        let uid_next = if folder == self.folders.inbox_name() {
            self.folders.get(folder).and_then(|f| f.uid_next)
        } else {
            None
        };

        let remote = Arc::clone(&self.remote);
        let owned_folder = folder.to_string();
        self.spawn_call(async move {
            Event::FolderInfoLoaded(
                remote
                    .folder_information(&owned_folder, &known_uids, uid_next)
                    .await,
            )
        });
    }

    fn on_folder_info(&mut self, result: RemoteResult<FolderInfo>) {
        match result {
            Ok(info) => self.apply_folder_info(&info, PollMode::Single),
            Err(err) if err.is_silent() => {}
            Err(err) => warn!(error = %err, "Folder information failed"),
        }
    }

    /// Polls the next batch of stale folders. In boot mode the batch repeats
    /// after a short delay for as long as it returns results.
    pub fn folder_information_multiply(&mut self, boot: bool) {
        let names = self.poller.next_batch(&mut self.folders, Utc::now());
        if names.is_empty() {
            return;
        }
        debug!(?names, boot, "Polling folder batch");
        let remote = Arc::clone(&self.remote);
        self.spawn_call(async move {
            Event::FolderInfoBatchLoaded {
                boot,
                result: remote.folder_information_multiple(&names).await,
            }
        });
    }

    fn on_folder_info_batch(&mut self, boot: bool, result: RemoteResult<Vec<FolderInfo>>) {
        match result {
            Ok(infos) if !infos.is_empty() => {
                for info in &infos {
                    self.apply_folder_info(info, PollMode::Batch);
                }
                if boot {
                    self.timers.after(
                        &self.tx,
                        Timing::ms(self.settings.timing.boot_repoll_delay_ms),
                        Timer::BootPoll,
                    );
                }
            }
            Ok(_) => {}
            Err(err) if err.is_silent() => {}
            Err(err) => warn!(error = %err, "Batched folder information failed"),
        }
    }

    fn apply_folder_info(&mut self, info: &FolderInfo, mode: PollMode) {
        let list_has_messages = !self.list.is_empty();
        let Some(outcome) = self.poller.apply(
            info,
            mode,
            Utc::now(),
            &mut self.folders,
            &mut self.flags,
            &mut self.hashes,
            list_has_messages,
        ) else {
            return;
        };

        if outcome.flags_updated {
            self.list.refresh_flags(&self.flags);
            self.notify(Notice::FlagsChanged {
                folder: outcome.folder.clone(),
            });
        }
        self.notify_counts(&outcome.folder);
        self.notify_new_messages(&outcome.folder, outcome.new_messages);

        match outcome.decision {
            PollDecision::Unchanged => {}
            PollDecision::ReloadCurrent => self.reload_message_list(false, false),
            PollDecision::RecacheInbox => self.recache_inbox(),
            PollDecision::RefreshCurrentFlags => self.folder_information(&outcome.folder),
        }
    }

    fn on_timer(&mut self, timer: Timer) -> ControlFlow<Shutdown> {
        match timer {
            Timer::PollFolders => {
                let inbox = self.folders.inbox_name().to_string();
                let current = self.folders.current_name().to_string();
                self.folder_information(&inbox);
                if inbox != current {
                    self.folder_information(&current);
                }
                self.folder_information_multiply(false);
            }
            Timer::InitialPoll => {
                let current = self.folders.current_name().to_string();
                if current != self.folders.inbox_name() {
                    self.folder_information(&current);
                }
                self.folder_information_multiply(true);
            }
            Timer::BootPoll => self.folder_information_multiply(true),
            Timer::Quota => self.quota(),
            Timer::FoldersReload => self.folders_reload(),
            Timer::ContactsSync => {
                self.contacts_sync();
            }
            Timer::WakeCheck => {
                if self.watchdog.check(Utc::now()) {
                    warn!("Wall clock jumped past the watchdog period; reload required");
                    self.notify(Notice::ReloadRequired);
                    return ControlFlow::Break(Shutdown::ReloadRequired);
                }
            }
        }
        ControlFlow::Continue(())
    }

    // Account data

    /// Refreshes the quota.
    pub fn quota(&mut self) {
        let remote = Arc::clone(&self.remote);
        self.spawn_call(async move { Event::QuotaLoaded(remote.quota().await) });
    }

    fn on_quota_loaded(&mut self, result: RemoteResult<Quota>) {
        match result {
            Ok(quota) => {
                self.quota = Some(quota);
                self.notify(Notice::QuotaChanged(quota));
            }
            Err(err) if err.is_silent() => {}
            Err(err) => warn!(error = %err, "Quota fetch failed"),
        }
    }

    /// Refreshes accounts and identities.
    pub fn accounts_and_identities(&mut self) {
        let remote = Arc::clone(&self.remote);
        self.spawn_call(async move {
            Event::AccountsLoaded(remote.accounts_and_identities().await)
        });
    }

    fn on_accounts_loaded(&mut self, result: RemoteResult<AccountsAndIdentities>) {
        match result {
            Ok(mut fresh) => {
                for account in &mut fresh.accounts {
                    if let Some(old) = self
                        .accounts
                        .accounts
                        .iter()
                        .find(|a| a.email == account.email)
                    {
                        account.count = old.count;
                    }
                }
                self.accounts = fresh;
                self.notify(Notice::AccountsChanged(self.accounts.clone()));
            }
            Err(err) if err.is_silent() => {}
            Err(err) => warn!(error = %err, "Accounts fetch failed"),
        }
    }

    /// Starts a contacts sync. Returns false when one is running or sync is
    /// disabled or not allowed.
    pub fn contacts_sync(&mut self) -> bool {
        if self.contacts_syncing
            || !self.settings.contacts_sync_enabled
            || !self.settings.contacts_sync_allowed
        {
            return false;
        }
        self.contacts_syncing = true;
        let remote = Arc::clone(&self.remote);
        self.spawn_call(async move { Event::ContactsSynced(remote.contacts_sync().await) });
        true
    }

    // Helpers

    fn spawn_call<F>(&self, call: F) -> JoinHandle<()>
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(call.await);
        })
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }

    fn notify_counts(&self, folder: &str) {
        if let Some(f) = self.folders.get(folder) {
            self.notify(Notice::FolderCounts {
                folder: folder.to_string(),
                all: f.message_count_all,
                unread: f.message_count_unread,
            });
        }
    }

    fn notify_new_messages(&self, folder: &str, messages: Vec<NewMessage>) {
        if messages.is_empty() {
            return;
        }
        let count = messages.len().to_string();
        let text = self
            .tr
            .translate("MESSAGE_LIST/NEW_MESSAGE_NOTIFICATION", &[("COUNT", &count)]);
        info!(folder, count = messages.len(), "New messages");
        self.notify(Notice::NewMessages {
            folder: folder.to_string(),
            messages,
            text,
        });
    }

    // Accessors

    /// The folder list.
    #[must_use]
    pub const fn folders(&self) -> &FolderStore {
        &self.folders
    }

    /// The displayed message list.
    #[must_use]
    pub const fn list(&self) -> &MessageListReconciler {
        &self.list
    }

    /// The flag cache.
    #[must_use]
    pub const fn flags(&self) -> &FlagCache {
        &self.flags
    }

    /// The folder hash registry.
    #[must_use]
    pub const fn hashes(&self) -> &FolderHashRegistry {
        &self.hashes
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Fingerprint of the loaded folder list.
    #[must_use]
    pub fn folders_hash(&self) -> &str {
        &self.folders_hash
    }

    /// Last fetched quota.
    #[must_use]
    pub const fn quota_info(&self) -> Option<Quota> {
        self.quota
    }

    /// Last fetched accounts and identities.
    #[must_use]
    pub const fn accounts(&self) -> &AccountsAndIdentities {
        &self.accounts
    }

    /// Number of folder pairs with queued moves.
    #[must_use]
    pub fn pending_moves(&self) -> usize {
        self.batcher.len()
    }

    /// Period used by the move debounce.
    #[must_use]
    pub const fn move_debounce_window(&self) -> Duration {
        Timing::ms(self.settings.timing.move_debounce_ms)
    }
}
