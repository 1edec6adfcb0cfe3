//! Engine tests against a scripted remote, on paused time.

#![allow(clippy::unwrap_used)]

mod common;

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use mailsync_core::model::{Message, NewMessage, Quota, SystemFolder, Uid};
use mailsync_core::remote::{
    FolderHashUpdate, FolderInfo, MoveMarker, MoveRequest, RemoteError, UidFlags,
};
use mailsync_core::{
    Command, DeleteDisposition, DeleteKind, EnglishCatalog, Error, LocalStore, Notice,
    PendingDelete, SetAction, Shutdown, SyncEngine, SyncSettings,
};

use common::{Call, MockRemote, folder_payload, inbox_page};

const fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn engine_with(remote: &Arc<MockRemote>, settings: SyncSettings) -> SyncEngine {
    SyncEngine::new(
        Arc::clone(remote) as Arc<dyn mailsync_core::Remote>,
        settings,
        LocalStore::in_memory(),
        Arc::new(EnglishCatalog),
    )
}

/// Drives the engine until `duration` of (paused) time has passed or it stops.
async fn run_for(engine: &mut SyncEngine, duration: Duration) -> Option<Shutdown> {
    let deadline = tokio::time::Instant::now() + duration;
    loop {
        match tokio::time::timeout_at(deadline, engine.step()).await {
            Ok(ControlFlow::Continue(())) => {}
            Ok(ControlFlow::Break(reason)) => return Some(reason),
            Err(_) => return None,
        }
    }
}

async fn booted(remote: &Arc<MockRemote>, settings: SyncSettings) -> SyncEngine {
    let mut engine = engine_with(remote, settings);
    engine.boot();
    assert_eq!(run_for(&mut engine, ms(100)).await, None);
    engine
}

fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}

fn visible_uids(engine: &SyncEngine) -> Vec<u32> {
    engine.list().visible().map(|m| m.uid.get()).collect()
}

fn counts(engine: &SyncEngine, folder: &str) -> (u32, u32) {
    let f = engine.folders().get(folder).unwrap();
    (f.message_count_all, f.message_count_unread)
}

#[tokio::test(start_paused = true)]
async fn test_boot_loads_folders_and_opens_inbox() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = engine_with(&remote, SyncSettings::default());
    let mut notices = engine.subscribe();

    engine.boot();
    assert_eq!(run_for(&mut engine, ms(100)).await, None);

    assert_eq!(engine.folders().len(), 6);
    assert_eq!(engine.folders().current_name(), "INBOX");
    assert_eq!(engine.folders_hash(), "folders-1");
    assert_eq!(
        engine.folders().system().trash,
        SystemFolder::Named("Trash".into())
    );
    assert_eq!(visible_uids(&engine), [1, 2, 3]);
    assert_eq!(counts(&engine, "INBOX"), (10, 4));
    assert_eq!(engine.hashes().get("INBOX"), "inbox-h1");
    assert_eq!(engine.accounts().accounts.len(), 1);
    assert_eq!(remote.list_calls().len(), 1);

    let notices = drain(&mut notices);
    assert!(notices.contains(&Notice::FoldersReloaded { count: 6 }));
    assert!(notices.contains(&Notice::ListChanged {
        folder: "INBOX".into(),
        count: 3
    }));
}

#[tokio::test(start_paused = true)]
async fn test_boot_failure_logs_out() {
    let remote = Arc::new(MockRemote::standard());
    remote.push_folders(Err(RemoteError::Transport("connection refused".into())));
    let mut engine = engine_with(&remote, SyncSettings::default());
    let mut notices = engine.subscribe();

    engine.boot();
    assert_eq!(run_for(&mut engine, ms(100)).await, Some(Shutdown::LoggedOut));
    assert!(drain(&mut notices).contains(&Notice::LoggedOut));
    assert!(remote.list_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logged_out_response_stops_engine() {
    let remote = Arc::new(MockRemote::standard());
    remote.push_quota(Err(RemoteError::LoggedOut));
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert_eq!(run_for(&mut engine, ms(6_000)).await, Some(Shutdown::LoggedOut));
}

#[tokio::test(start_paused = true)]
async fn test_boot_schedules_poll_and_quota() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert_eq!(run_for(&mut engine, ms(6_000)).await, None);

    let batches: Vec<Vec<String>> = remote
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::FolderInformationMultiple(names) => Some(names),
            _ => None,
        })
        .collect();
    assert_eq!(
        batches,
        [vec!["Sent", "Drafts", "Spam", "Trash", "Archive"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()]
    );
    assert_eq!(remote.count(|c| *c == Call::Quota), 1);
    assert_eq!(engine.quota_info(), Some(Quota { usage: 10, limit: 100 }));
    assert_eq!(remote.count(|c| *c == Call::ContactsSync), 0);
}

#[tokio::test(start_paused = true)]
async fn test_contacts_sync_runs_when_enabled_and_allowed() {
    let remote = Arc::new(MockRemote::standard());
    let settings = SyncSettings {
        contacts_sync_enabled: true,
        contacts_sync_allowed: true,
        ..SyncSettings::default()
    };
    let mut engine = booted(&remote, settings).await;

    assert_eq!(run_for(&mut engine, ms(10_500)).await, None);
    assert_eq!(remote.count(|c| *c == Call::ContactsSync), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_command_stops_engine() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    engine.handle().send(Command::Shutdown).unwrap();
    assert_eq!(run_for(&mut engine, ms(100)).await, Some(Shutdown::Requested));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_moves_coalesce_into_one_request() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert!(engine.move_messages_to_folder("INBOX", &[Uid(1), Uid(2)], "Archive", false));
    assert_eq!(run_for(&mut engine, ms(300)).await, None);
    assert!(engine.move_messages_to_folder("INBOX", &[Uid(2), Uid(3)], "Archive", false));
    assert!(engine.move_messages_to_folder("INBOX", &[Uid(4)], "Archive", false));

    assert_eq!(engine.pending_moves(), 1);
    assert!(visible_uids(&engine).is_empty());
    assert_eq!(counts(&engine, "INBOX"), (7, 2));
    assert_eq!(counts(&engine, "Archive"), (3, 2));

    assert_eq!(run_for(&mut engine, ms(400)).await, None);
    assert!(remote.moves().is_empty());

    assert_eq!(run_for(&mut engine, ms(200)).await, None);
    assert_eq!(
        remote.moves(),
        [MoveRequest {
            from: "INBOX".into(),
            to: "Archive".into(),
            uids: vec![Uid(1), Uid(2), Uid(3), Uid(4)],
            marker: MoveMarker::None,
            permanent: false,
        }]
    );
    assert_eq!(engine.pending_moves(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_moves_to_different_folders_are_sent_separately() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert!(engine.move_messages_to_folder("INBOX", &[Uid(1)], "Spam", false));
    assert!(engine.move_messages_to_folder("INBOX", &[Uid(2)], "Archive", false));
    assert_eq!(run_for(&mut engine, ms(600)).await, None);

    let moves = remote.moves();
    assert_eq!(moves.len(), 2);
    let spam = moves.iter().find(|m| m.to == "Spam").unwrap();
    assert_eq!(spam.marker, MoveMarker::Spam);
    assert!(spam.permanent);
    let archive = moves.iter().find(|m| m.to == "Archive").unwrap();
    assert_eq!(archive.marker, MoveMarker::None);
    assert_eq!(archive.uids, [Uid(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_move_to_same_or_unknown_folder_is_ignored() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert!(!engine.move_messages_to_folder("INBOX", &[Uid(1)], "INBOX", false));
    assert!(!engine.move_messages_to_folder("INBOX", &[Uid(1)], "Nope", false));
    assert!(!engine.move_messages_to_folder("INBOX", &[], "Archive", false));
    assert_eq!(engine.pending_moves(), 0);
    assert_eq!(visible_uids(&engine), [1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_copy_keeps_messages_and_calls_remote_at_once() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert!(engine.move_messages_to_folder("INBOX", &[Uid(1), Uid(2)], "Archive", true));
    assert_eq!(engine.pending_moves(), 0);
    assert_eq!(visible_uids(&engine), [1, 2, 3]);
    assert_eq!(counts(&engine, "INBOX"), (10, 4));
    assert_eq!(counts(&engine, "Archive").0, 2);

    assert_eq!(run_for(&mut engine, ms(50)).await, None);
    assert_eq!(
        remote.count(|c| matches!(c, Call::Copy { to, .. } if to == "Archive")),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_newer_list_reload_supersedes_older() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    let mut slow = inbox_page();
    slow.messages.truncate(1);
    let mut fast = inbox_page();
    fast.messages = vec![Message::new("INBOX", 9)];
    remote.push_list(ms(500), Ok(slow));
    remote.push_list(ms(10), Ok(fast));

    engine.reload_message_list(false, false);
    assert_eq!(run_for(&mut engine, ms(50)).await, None);
    engine.reload_message_list(false, false);
    assert_eq!(run_for(&mut engine, ms(1_000)).await, None);

    assert_eq!(visible_uids(&engine), [9]);
    assert_eq!(remote.list_calls().len(), 3);
    assert!(!engine.list().is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_list_failure_shows_inline_error() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;
    let mut notices = engine.subscribe();

    remote.push_list(
        ms(0),
        Err(RemoteError::Server {
            code: 201,
            message: None,
        }),
    );
    engine.reload_message_list(false, false);
    assert_eq!(run_for(&mut engine, ms(50)).await, None);

    assert!(engine.list().is_empty());
    assert_eq!(engine.list().error(), "Can't get message list");
    assert!(drain(&mut notices).contains(&Notice::ListError("Can't get message list".into())));
}

#[tokio::test(start_paused = true)]
async fn test_delete_moves_to_trash_optimistically() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    let disposition = engine.delete_messages_from_folder(DeleteKind::Trash, "INBOX", &[Uid(1)], true);

    assert_eq!(disposition, DeleteDisposition::Moved { to: "Trash".into() });
    assert_eq!(visible_uids(&engine), [2, 3]);
    assert_eq!(counts(&engine, "INBOX"), (9, 3));
    assert_eq!(counts(&engine, "Trash"), (1, 0));

    assert_eq!(run_for(&mut engine, ms(600)).await, None);
    assert_eq!(
        remote.moves(),
        [MoveRequest {
            from: "INBOX".into(),
            to: "Trash".into(),
            uids: vec![Uid(1)],
            marker: MoveMarker::None,
            permanent: true,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_from_trash_needs_confirmation() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;
    let mut notices = engine.subscribe();

    let pending = PendingDelete {
        folder: "Trash".into(),
        uids: vec![Uid(5)],
    };
    let disposition = engine.delete_messages_from_folder(DeleteKind::Trash, "Trash", &[Uid(5)], true);
    assert_eq!(disposition, DeleteDisposition::NeedsConfirmation(pending.clone()));
    assert!(drain(&mut notices).contains(&Notice::ConfirmDelete {
        pending: pending.clone(),
        prompt: "Are you sure you want to delete the message(s)?".into(),
    }));

    assert_eq!(run_for(&mut engine, ms(600)).await, None);
    assert_eq!(remote.count(|c| matches!(c, Call::Delete { .. })), 0);
    assert!(remote.moves().is_empty());

    engine.handle().send(Command::ConfirmDelete(pending)).unwrap();
    assert_eq!(run_for(&mut engine, ms(100)).await, None);
    assert_eq!(
        remote.count(|c| *c
            == Call::Delete {
                folder: "Trash".into(),
                uids: vec![Uid(5)],
            }),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_with_unused_trash_needs_confirmation() {
    let remote = Arc::new(MockRemote::standard());
    let mut settings = SyncSettings::default();
    settings.system_folders.trash = SystemFolder::Unused;
    let mut engine = booted(&remote, settings).await;

    let disposition = engine.delete_messages_from_folder(DeleteKind::Trash, "INBOX", &[Uid(1)], true);

    assert!(matches!(disposition, DeleteDisposition::NeedsConfirmation(_)));
    assert_eq!(visible_uids(&engine), [1, 2, 3]);
    assert_eq!(counts(&engine, "INBOX"), (10, 4));
    assert_eq!(engine.pending_moves(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_spam_without_spam_folder_requires_setup() {
    let remote = Arc::new(MockRemote::standard());
    let mut payload = folder_payload();
    payload.system_folders.spam = SystemFolder::NotSet;
    remote.push_folders(Ok(payload));
    let mut engine = booted(&remote, SyncSettings::default()).await;
    let mut notices = engine.subscribe();

    let disposition = engine.delete_messages_from_folder(DeleteKind::Spam, "INBOX", &[Uid(1)], true);

    assert_eq!(disposition, DeleteDisposition::SystemFolderRequired(DeleteKind::Spam));
    assert!(drain(&mut notices).contains(&Notice::SystemFolderRequired {
        kind: DeleteKind::Spam,
        text: "Choose the folder to receive spam, or disable it".into(),
    }));
    assert_eq!(visible_uids(&engine), [1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_delete_without_move_requires_dangerous_actions() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;
    engine.handle().send(Command::Select(Some(Uid(2)))).unwrap();
    assert_eq!(run_for(&mut engine, ms(10)).await, None);
    assert_eq!(engine.delete_without_move(), None);

    let settings = SyncSettings {
        dangerous_actions: true,
        ..SyncSettings::default()
    };
    let mut engine = booted(&remote, settings).await;
    engine.handle().send(Command::Select(Some(Uid(2)))).unwrap();
    assert_eq!(run_for(&mut engine, ms(10)).await, None);
    assert_eq!(
        engine.delete_without_move(),
        Some(DeleteDisposition::NeedsConfirmation(PendingDelete {
            folder: "INBOX".into(),
            uids: vec![Uid(2)],
        }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_move_result_hash_is_used_by_next_reload() {
    let remote = Arc::new(MockRemote::standard());
    remote.push_move(Ok(Some(FolderHashUpdate {
        folder: "INBOX".into(),
        hash: "after-move".into(),
    })));
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert!(engine.move_messages_to_folder("INBOX", &[Uid(1)], "Archive", false));
    assert_eq!(run_for(&mut engine, ms(600)).await, None);

    let lists = remote.list_calls();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[1].folder_hash, "after-move");
}

#[tokio::test(start_paused = true)]
async fn test_failed_move_alerts_and_reloads_without_hash() {
    let remote = Arc::new(MockRemote::standard());
    remote.push_move(Err(RemoteError::Server {
        code: 204,
        message: None,
    }));
    let mut engine = booted(&remote, SyncSettings::default()).await;
    let mut notices = engine.subscribe();

    assert!(engine.move_messages_to_folder("INBOX", &[Uid(1)], "Archive", false));
    assert_eq!(run_for(&mut engine, ms(600)).await, None);

    assert!(drain(&mut notices).contains(&Notice::Alert("Can't move message".into())));
    let lists = remote.list_calls();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[1].folder_hash, "");
}

#[tokio::test(start_paused = true)]
async fn test_mutation_refreshes_quota_after_quiet_period() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert!(engine.move_messages_to_folder("INBOX", &[Uid(1)], "Archive", false));
    assert_eq!(run_for(&mut engine, ms(29_000)).await, None);
    assert_eq!(remote.count(|c| *c == Call::Quota), 1);

    assert_eq!(run_for(&mut engine, ms(2_000)).await, None);
    assert_eq!(remote.count(|c| *c == Call::Quota), 2);
}

#[tokio::test(start_paused = true)]
async fn test_poll_with_same_hash_does_not_reload() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    remote.push_info(Ok(FolderInfo {
        folder: "INBOX".into(),
        hash: "inbox-h1".into(),
        message_count: Some(10),
        unseen_count: Some(4),
        ..FolderInfo::default()
    }));
    engine.folder_information("INBOX");
    assert_eq!(run_for(&mut engine, ms(100)).await, None);

    assert_eq!(remote.list_calls().len(), 1);
    assert!(remote.calls().contains(&Call::FolderInformation {
        folder: "INBOX".into(),
        known_uids: vec![Uid(1), Uid(2), Uid(3)],
        uid_next: None,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_poll_with_new_hash_reloads_once() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    remote.push_info(Ok(FolderInfo {
        folder: "INBOX".into(),
        hash: "inbox-h2".into(),
        message_count: Some(11),
        unseen_count: Some(4),
        ..FolderInfo::default()
    }));
    engine.folder_information("INBOX");
    assert_eq!(run_for(&mut engine, ms(100)).await, None);

    let lists = remote.list_calls();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[1].folder_hash, "inbox-h2");
}

#[tokio::test(start_paused = true)]
async fn test_poll_flags_refresh_displayed_messages() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;
    let mut notices = engine.subscribe();

    remote.push_info(Ok(FolderInfo {
        folder: "INBOX".into(),
        hash: "inbox-h1".into(),
        unseen_count: Some(4),
        flags: vec![UidFlags {
            uid: Uid(3),
            flags: [true, true, false, false, false],
        }],
        ..FolderInfo::default()
    }));
    engine.folder_information("INBOX");
    assert_eq!(run_for(&mut engine, ms(100)).await, None);

    let third = engine.list().visible().find(|m| m.uid == Uid(3)).unwrap();
    assert!(third.is_unseen());
    assert!(third.is_flagged());
    assert!(drain(&mut notices).contains(&Notice::FlagsChanged {
        folder: "INBOX".into()
    }));
    assert_eq!(remote.list_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_mail_is_announced_after_uid_next_moves() {
    let remote = Arc::new(MockRemote::standard());
    let mut page = inbox_page();
    page.uid_next = Some(Uid(100));
    remote.set_page(page);
    let mut engine = booted(&remote, SyncSettings::default()).await;
    let mut notices = engine.subscribe();

    let arrived = vec![
        NewMessage {
            folder: "INBOX".into(),
            uid: Uid(100),
            subject: "Hello".into(),
            from: "a@example.com".into(),
        },
        NewMessage {
            folder: "INBOX".into(),
            uid: Uid(101),
            subject: "Again".into(),
            from: "b@example.com".into(),
        },
    ];
    remote.push_info(Ok(FolderInfo {
        folder: "INBOX".into(),
        hash: "inbox-h1".into(),
        unseen_count: Some(4),
        uid_next: Some(Uid(102)),
        new_messages: arrived.clone(),
        ..FolderInfo::default()
    }));
    engine.folder_information("INBOX");
    assert_eq!(run_for(&mut engine, ms(100)).await, None);

    assert!(remote.calls().contains(&Call::FolderInformation {
        folder: "INBOX".into(),
        known_uids: vec![Uid(1), Uid(2), Uid(3)],
        uid_next: Some(Uid(100)),
    }));
    assert!(drain(&mut notices).contains(&Notice::NewMessages {
        folder: "INBOX".into(),
        messages: arrived,
        text: "You have 2 new message(s)".into(),
    }));
    assert_eq!(
        engine.folders().get("INBOX").unwrap().uid_next,
        Some(Uid(102))
    );
}

#[tokio::test(start_paused = true)]
async fn test_set_seen_updates_unread_counter() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    engine.message_list_action("INBOX", SetAction::SetSeen, &[Uid(1), Uid(3)]);

    assert_eq!(counts(&engine, "INBOX"), (10, 3));
    let first = engine.list().visible().find(|m| m.uid == Uid(1)).unwrap();
    assert!(!first.is_unseen());

    assert_eq!(run_for(&mut engine, ms(50)).await, None);
    assert!(remote.calls().contains(&Call::SetSeen {
        folder: "INBOX".into(),
        uids: vec![Uid(1), Uid(3)],
        seen: true,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_mark_all_read_zeroes_unread() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    engine.message_list_action_for_all("INBOX", SetAction::SetSeen);

    assert_eq!(counts(&engine, "INBOX"), (10, 0));
    assert!(engine.list().visible().all(|m| !m.is_unseen()));
    assert_eq!(engine.flags().folder_len("INBOX"), 0);

    assert_eq!(run_for(&mut engine, ms(50)).await, None);
    assert!(remote.calls().contains(&Call::SetSeenToAll {
        folder: "INBOX".into(),
        seen: true,
        thread_uids: None,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_flag_command_targets_selected_message() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;
    let handle = engine.handle();

    handle.send(Command::Select(Some(Uid(2)))).unwrap();
    handle
        .send(Command::SetAction {
            folder: "INBOX".into(),
            action: SetAction::SetFlag,
            uids: None,
        })
        .unwrap();
    assert_eq!(run_for(&mut engine, ms(50)).await, None);

    assert!(remote.calls().contains(&Call::SetFlagged {
        folder: "INBOX".into(),
        uids: vec![Uid(2)],
        flagged: true,
    }));
    let second = engine.list().visible().find(|m| m.uid == Uid(2)).unwrap();
    assert!(second.is_flagged());
}

#[tokio::test(start_paused = true)]
async fn test_open_unknown_folder_fails() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    assert!(matches!(
        engine.open_folder("Nope"),
        Err(Error::UnknownFolder(name)) if name == "Nope"
    ));
    assert_eq!(engine.folders().current_name(), "INBOX");
}

#[tokio::test(start_paused = true)]
async fn test_open_folder_navigates_and_loads() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;
    let mut notices = engine.subscribe();

    engine.open_folder("Archive").unwrap();
    assert_eq!(run_for(&mut engine, ms(50)).await, None);

    assert_eq!(engine.folders().current_name(), "Archive");
    assert!(engine.list().is_empty());
    assert_eq!(remote.list_calls().last().unwrap().folder, "Archive");
    let notices = drain(&mut notices);
    assert!(
        notices
            .iter()
            .any(|n| matches!(n, Notice::Navigate(route) if route.to_string() == "#/mailbox/Archive"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_page_keeps_engine_running() {
    let remote = Arc::new(MockRemote::standard());
    let mut engine = booted(&remote, SyncSettings::default()).await;

    engine.handle().send(Command::SetPage(u32::MAX)).unwrap();
    assert_eq!(run_for(&mut engine, ms(50)).await, None);

    let query = remote.list_calls().last().unwrap().clone();
    assert_eq!(query.offset, u32::MAX);
    assert_eq!(query.limit, 20);
}

#[tokio::test]
async fn test_expanded_folders_are_written_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.json");
    let remote = Arc::new(MockRemote::standard());
    let mut engine = SyncEngine::new(
        Arc::clone(&remote) as Arc<dyn mailsync_core::Remote>,
        SyncSettings::default(),
        LocalStore::open(&path).await.unwrap(),
        Arc::new(EnglishCatalog),
    );
    engine.boot();
    assert_eq!(run_for(&mut engine, ms(100)).await, None);

    engine.set_expanded_folder("Archive", true).unwrap();
    engine.set_expanded_folder("Sent", true).unwrap();
    engine.set_expanded_folder("Sent", false).unwrap();
    engine.shutdown().await;

    let reopened = LocalStore::open(&path).await.unwrap();
    assert_eq!(reopened.expanded_folders(), vec!["Archive"]);
}
