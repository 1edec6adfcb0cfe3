//! # mailsync-core
//!
//! Client-side synchronization engine for SnappyMail/RainLoop webmail.
//!
//! This crate provides:
//! - Domain models for folders, messages and accounts
//! - The flag cache and folder hash registry
//! - A debounced move queue that coalesces rapid moves per folder pair
//! - The message list reconciler with optimistic removal and flag updates
//! - Folder polling and change detection
//! - The [`SyncEngine`] controller tying these together over a [`Remote`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod engine;
mod error;
pub mod i18n;
pub mod model;
pub mod remote;
pub mod storage;
pub mod sync;

pub use cache::{FlagCache, FolderHashRegistry};
pub use config::{SyncSettings, Timing};
pub use engine::{
    Command, DeleteDisposition, DeleteKind, EngineHandle, Notice, PendingDelete, Shutdown,
    SyncEngine,
};
pub use error::{Error, Result};
pub use i18n::{EnglishCatalog, Notification, Translate};
pub use model::{Folder, FolderStore, Message, SetAction, SystemFolder, SystemFolders, Uid};
pub use remote::{Remote, RemoteError, RemoteResult};
pub use storage::LocalStore;
