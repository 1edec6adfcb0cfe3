//! `mailsync` - terminal client for SnappyMail/RainLoop webmail servers
//!
//! Keeps the folder tree and message list of a webmail account in sync and
//! forwards typed commands to the sync engine.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod command;
mod config;

use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailsync_core::{
    EnglishCatalog, LocalStore, Notice, PendingDelete, Remote, Shutdown, SyncEngine,
};
use mailsync_remote::JsonClient;

use command::Line;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailsync=info,mailsync_core=debug,mailsync_remote=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mailsync");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run())
}

async fn run() -> anyhow::Result<()> {
    let settings_path = config::settings_path();

    if std::env::args().any(|arg| arg == "--init") {
        if settings_path.exists() {
            anyhow::bail!("{} already exists", settings_path.display());
        }
        return config::save(&settings_path, &config::AppConfig::default()).await;
    }

    let config = config::load(&settings_path).await?;
    let client = JsonClient::new(&config.remote).context("invalid remote settings")?;
    info!(endpoint = %client.endpoint(), "Using webmail server");
    let remote: Arc<dyn Remote> = Arc::new(client);

    let mut lines = spawn_stdin_reader();

    loop {
        let local = LocalStore::open(config::local_store_path()).await?;
        let mut engine = SyncEngine::new(
            Arc::clone(&remote),
            config.sync.clone(),
            local,
            Arc::new(EnglishCatalog),
        );

        let reason = drive(&mut engine, &mut lines).await;
        engine.shutdown().await;

        match reason {
            Shutdown::ReloadRequired => info!("Restarting sync engine"),
            Shutdown::Requested => return Ok(()),
            Shutdown::LoggedOut => anyhow::bail!("the webmail session has ended, log in again"),
        }
    }
}

/// Forwards standard input lines; the channel closes at end of input.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut reader = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {e}");
                    break;
                }
            }
        }
    });
    rx
}

/// Runs one engine until it stops.
async fn drive(engine: &mut SyncEngine, lines: &mut mpsc::UnboundedReceiver<String>) -> Shutdown {
    let handle = engine.handle();
    let mut notices = engine.subscribe();
    let mut pending: Option<PendingDelete> = None;

    engine.boot();

    loop {
        tokio::select! {
            flow = engine.step() => {
                if let ControlFlow::Break(reason) = flow {
                    info!(?reason, "Sync engine stopped");
                    return reason;
                }
            }
            notice = notices.recv() => match notice {
                Ok(notice) => show_notice(engine, &notice, &mut pending),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Dropped notices");
                }
                Err(broadcast::error::RecvError::Closed) => {}
            },
            line = lines.recv() => {
                let Some(line) = line else {
                    return Shutdown::Requested;
                };
                let command = match command::parse(&line) {
                    Ok(Some(Line::Command(command))) => command,
                    Ok(Some(Line::Confirm)) => match pending.take() {
                        Some(delete) => mailsync_core::Command::ConfirmDelete(delete),
                        None => {
                            println!("nothing to confirm");
                            continue;
                        }
                    },
                    Ok(Some(Line::Help)) => {
                        println!("{}", command::HELP);
                        continue;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{e:#}");
                        continue;
                    }
                };
                debug!(?command, "Queueing command");
                if let Err(e) = handle.send(command) {
                    error!("Failed to queue command: {e}");
                }
            }
        }
    }
}

fn show_notice(engine: &SyncEngine, notice: &Notice, pending: &mut Option<PendingDelete>) {
    match notice {
        Notice::ListLoading => debug!("Loading message list"),
        Notice::ListChanged { folder, count } => {
            println!("{folder}: {count} message(s)");
            for message in engine.list().visible() {
                println!(
                    "  {}{} {:>6}  {}  {}",
                    if message.flags.unseen { '*' } else { ' ' },
                    if message.flags.flagged { '!' } else { ' ' },
                    message.uid.get(),
                    message.from,
                    message.subject,
                );
            }
        }
        Notice::ListError(text) | Notice::Alert(text) => println!("error: {text}"),
        Notice::FlagsChanged { folder } => debug!(folder, "Flags refreshed"),
        Notice::FolderCounts {
            folder,
            all,
            unread,
        } => println!("{folder}: {unread} unread of {all}"),
        Notice::FoldersReloaded { count } => println!("{count} folder(s)"),
        Notice::SystemFolderRequired { text, .. } => println!("{text}"),
        Notice::ConfirmDelete { pending: delete, prompt } => {
            println!("{prompt} (type `yes` to confirm)");
            *pending = Some(delete.clone());
        }
        Notice::Navigate(route) => debug!(%route, "Navigated"),
        Notice::NewMessages { messages, text, .. } => {
            println!("{text}");
            for message in messages {
                println!("  {}: {}", message.from, message.subject);
            }
        }
        Notice::QuotaChanged(quota) => match quota.percentage() {
            Some(percent) => println!("quota: {percent}% used"),
            None => debug!(usage = quota.usage, "Quota has no limit"),
        },
        Notice::AccountsChanged(data) => {
            for account in &data.accounts {
                println!("account: {}", account.email);
            }
        }
        Notice::ReloadRequired => warn!("Client was suspended, starting over"),
        Notice::LoggedOut => warn!("Logged out"),
    }
}
