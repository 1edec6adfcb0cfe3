//! Local key/value store for client-side preferences.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Keys of the locally persisted preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSideKey {
    /// Hashes of the folders expanded in the folder tree.
    ExpandedFolders,
    /// Width of the folder panel.
    FolderListSize,
    /// Height of the message list panel.
    MessageListSize,
}

impl ClientSideKey {
    /// Storage key name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExpandedFolders => "ExpandedFolders",
            Self::FolderListSize => "FolderListSize",
            Self::MessageListSize => "MessageListSize",
        }
    }
}

/// JSON values persisted to a single file, or kept in memory only.
///
/// Reads happen once in [`LocalStore::open`]. Every change queues a snapshot
/// for a background task that writes them in order with `tokio::fs`.
#[derive(Debug, Default)]
pub struct LocalStore {
    values: BTreeMap<String, Value>,
    writer: Option<Writer>,
}

#[derive(Debug)]
struct Writer {
    tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl Writer {
    fn spawn(path: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let task = tokio::spawn(async move {
            while let Some(contents) = rx.recv().await {
                if let Err(e) = write_file(&path, &contents).await {
                    warn!(path = %path.display(), error = %e, "Failed to write local store");
                }
            }
        });
        Self { tx, task }
    }
}

async fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}

impl LocalStore {
    /// Creates a store that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store backed by `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = values.len(), "Opened local store");
        Ok(Self {
            values,
            writer: Some(Writer::spawn(path)),
        })
    }

    /// Waits until every queued write has reached the file.
    pub async fn close(self) {
        let Some(Writer { tx, task }) = self.writer else {
            return;
        };
        drop(tx);
        if let Err(e) = task.await {
            warn!(error = %e, "Local store writer stopped abnormally");
        }
    }

    /// Reads a value. Missing or mistyped values yield `None`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: ClientSideKey) -> Option<T> {
        let value = self.values.get(key.as_str())?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Writes a value and queues the store for persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or the writer is
    /// gone.
    pub fn set<T: Serialize>(&mut self, key: ClientSideKey, value: &T) -> Result<()> {
        self.values
            .insert(key.as_str().to_string(), serde_json::to_value(value)?);
        self.persist()
    }

    /// Hashes of the expanded folders.
    #[must_use]
    pub fn expanded_folders(&self) -> Vec<String> {
        self.get(ClientSideKey::ExpandedFolders).unwrap_or_default()
    }

    /// Adds or removes a folder hash from the expanded list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be persisted.
    pub fn set_expanded_folder(&mut self, full_name_hash: &str, expanded: bool) -> Result<()> {
        let mut list = self.expanded_folders();
        if expanded {
            if !list.iter().any(|h| h == full_name_hash) {
                list.push(full_name_hash.to_string());
            }
        } else {
            list.retain(|h| h != full_name_hash);
        }
        self.set(ClientSideKey::ExpandedFolders, &list)
    }

    fn persist(&self) -> Result<()> {
        let Some(writer) = &self.writer else {
            return Ok(());
        };
        let contents = serde_json::to_string_pretty(&self.values)?;
        writer.tx.send(contents).map_err(|_| Error::StoreClosed)
    }
}
