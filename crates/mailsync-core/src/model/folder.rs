//! Folder (mailbox) models and the folder list store.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::Uid;

/// Marker the server uses for a system folder that was deliberately disabled.
pub const UNUSED_OPTION_VALUE: &str = "__UNUSE__";

/// A mail folder as known to the client.
///
/// The folder's content hash is not stored here; see
/// [`FolderHashRegistry`](crate::cache::FolderHashRegistry).
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Folder {
    /// Stable, server-addressable name. Unique key.
    pub full_name_raw: String,
    /// URL-safe identifier derived from the raw name.
    pub full_name_hash: String,
    /// Display name (last path segment).
    pub name: String,
    /// Hierarchy delimiter, if the server reported one.
    pub delimiter: Option<char>,
    /// Whether the folder can be opened.
    pub selectable: bool,
    /// Whether the user is subscribed to the folder.
    pub subscribed: bool,
    /// Whether the folder has children.
    pub has_children: bool,
    /// Total number of messages.
    pub message_count_all: u32,
    /// Number of unread messages.
    pub message_count_unread: u32,
    /// Next UID the server will assign, when known.
    pub uid_next: Option<Uid>,
    /// When the folder metadata was last refreshed.
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Collapsed in the folder tree (UI state, persisted locally).
    pub collapsed: bool,
}

impl Folder {
    /// Creates a selectable, subscribed folder with the given raw name.
    #[must_use]
    pub fn new(full_name_raw: impl Into<String>) -> Self {
        let full_name_raw = full_name_raw.into();
        let name = full_name_raw
            .rsplit_once(['/', '.'])
            .map_or_else(|| full_name_raw.clone(), |(_, n)| n.to_string());
        Self {
            full_name_hash: folder_name_hash(&full_name_raw),
            name,
            full_name_raw,
            delimiter: Some('/'),
            selectable: true,
            subscribed: true,
            ..Self::default()
        }
    }

    /// Returns the raw name of the parent folder, if any.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        let delimiter = self.delimiter?;
        self.full_name_raw
            .rsplit_once(delimiter)
            .map(|(parent, _)| parent)
            .filter(|parent| !parent.is_empty())
    }
}

/// Derives the URL-safe identifier of a folder from its raw name.
///
/// Names made only of `[A-Za-z0-9._-]` are used as-is, anything else is
/// base64url-encoded.
#[must_use]
pub fn folder_name_hash(full_name_raw: &str) -> String {
    let plain = full_name_raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if plain && !full_name_raw.is_empty() {
        full_name_raw.to_string()
    } else {
        URL_SAFE_NO_PAD.encode(full_name_raw.as_bytes())
    }
}

/// Configuration of one system folder role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SystemFolder {
    /// Not configured yet.
    #[default]
    NotSet,
    /// Deliberately disabled by the user.
    Unused,
    /// Mapped to the named folder.
    Named(String),
}

impl SystemFolder {
    /// Returns the folder name when one is configured.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::NotSet | Self::Unused => None,
        }
    }

    /// Returns true if the role was disabled.
    #[must_use]
    pub const fn is_unused(&self) -> bool {
        matches!(self, Self::Unused)
    }

    /// Returns true if the role maps to `folder`.
    #[must_use]
    pub fn is(&self, folder: &str) -> bool {
        self.name() == Some(folder)
    }
}

impl From<String> for SystemFolder {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => Self::NotSet,
            UNUSED_OPTION_VALUE => Self::Unused,
            _ => Self::Named(value),
        }
    }
}

impl From<SystemFolder> for String {
    fn from(value: SystemFolder) -> Self {
        match value {
            SystemFolder::NotSet => Self::new(),
            SystemFolder::Unused => UNUSED_OPTION_VALUE.to_string(),
            SystemFolder::Named(name) => name,
        }
    }
}

/// The folders playing a system role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemFolders {
    /// Inbox raw name.
    pub inbox: String,
    /// Sent messages.
    pub sent: SystemFolder,
    /// Drafts.
    pub drafts: SystemFolder,
    /// Spam/junk.
    pub spam: SystemFolder,
    /// Trash.
    pub trash: SystemFolder,
    /// Archive.
    pub archive: SystemFolder,
}

impl Default for SystemFolders {
    fn default() -> Self {
        Self {
            inbox: "INBOX".to_string(),
            sent: SystemFolder::NotSet,
            drafts: SystemFolder::NotSet,
            spam: SystemFolder::NotSet,
            trash: SystemFolder::NotSet,
            archive: SystemFolder::NotSet,
        }
    }
}

impl SystemFolders {
    /// Fills roles that are not set locally from `other`.
    pub fn fill_from(&mut self, other: &Self) {
        for (mine, theirs) in [
            (&mut self.sent, &other.sent),
            (&mut self.drafts, &other.drafts),
            (&mut self.spam, &other.spam),
            (&mut self.trash, &other.trash),
            (&mut self.archive, &other.archive),
        ] {
            if *mine == SystemFolder::NotSet {
                mine.clone_from(theirs);
            }
        }
    }

    /// Returns true if `folder` is the inbox or one of the configured roles.
    #[must_use]
    pub fn is_system(&self, folder: &str) -> bool {
        self.inbox == folder
            || [
                &self.sent,
                &self.drafts,
                &self.spam,
                &self.trash,
                &self.archive,
            ]
            .iter()
            .any(|role| role.is(folder))
    }
}

/// The loaded folder list plus the current-folder selection.
#[derive(Debug, Clone, Default)]
pub struct FolderStore {
    folders: Vec<Folder>,
    index: HashMap<String, usize>,
    current: String,
    system: SystemFolders,
}

impl FolderStore {
    /// Creates an empty store with the given system folder configuration.
    #[must_use]
    pub fn new(system: SystemFolders) -> Self {
        Self {
            current: system.inbox.clone(),
            system,
            ..Self::default()
        }
    }

    /// Replaces the whole folder list.
    ///
    /// Folders whose hash appears in `expanded` are shown expanded, all others
    /// with children start collapsed.
    pub fn replace_all(&mut self, folders: Vec<Folder>, expanded: &[String]) {
        self.folders = folders;
        for folder in &mut self.folders {
            folder.collapsed = folder.has_children && !expanded.contains(&folder.full_name_hash);
        }
        self.index = self
            .folders
            .iter()
            .enumerate()
            .map(|(i, f)| (f.full_name_raw.clone(), i))
            .collect();
    }

    /// Returns the folder with the given raw name.
    #[must_use]
    pub fn get(&self, full_name_raw: &str) -> Option<&Folder> {
        self.index.get(full_name_raw).map(|&i| &self.folders[i])
    }

    /// Returns the folder with the given raw name, mutably.
    pub fn get_mut(&mut self, full_name_raw: &str) -> Option<&mut Folder> {
        self.index
            .get(full_name_raw)
            .copied()
            .map(move |i| &mut self.folders[i])
    }

    /// Iterates over all folders in server order.
    pub fn iter(&self) -> impl Iterator<Item = &Folder> {
        self.folders.iter()
    }

    /// Number of loaded folders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Returns true if no folder list has been loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Raw name of the currently displayed folder.
    #[must_use]
    pub fn current_name(&self) -> &str {
        &self.current
    }

    /// Sets the currently displayed folder.
    pub fn set_current(&mut self, full_name_raw: impl Into<String>) {
        self.current = full_name_raw.into();
    }

    /// Returns the currently displayed folder, if it is loaded.
    #[must_use]
    pub fn current(&self) -> Option<&Folder> {
        self.get(&self.current)
    }

    /// Raw name of the inbox.
    #[must_use]
    pub fn inbox_name(&self) -> &str {
        &self.system.inbox
    }

    /// System folder configuration.
    #[must_use]
    pub const fn system(&self) -> &SystemFolders {
        &self.system
    }

    /// System folder configuration, mutably.
    pub const fn system_mut(&mut self) -> &mut SystemFolders {
        &mut self.system
    }

    /// Sets the collapsed state of the folder with the given hash.
    pub fn set_collapsed_by_hash(&mut self, full_name_hash: &str, collapsed: bool) {
        if let Some(folder) = self
            .folders
            .iter_mut()
            .find(|f| f.full_name_hash == full_name_hash)
        {
            folder.collapsed = collapsed;
        }
    }

    /// Returns true if no ancestor of the folder is collapsed.
    #[must_use]
    pub fn is_visible(&self, folder: &Folder) -> bool {
        let mut parent = folder.parent_name();
        while let Some(name) = parent {
            match self.get(name) {
                Some(p) if p.collapsed => return false,
                Some(p) => parent = p.parent_name(),
                None => break,
            }
        }
        true
    }

    /// Picks the folders to refresh in the next batched metadata poll.
    ///
    /// Candidates are selectable folders other than the inbox that were not
    /// polled within `stale_after` and are either system folders or
    /// subscribed and visible. The oldest-polled come first; at most `limit`
    /// are returned and each is marked as polled at `now`.
    pub fn next_folder_names(
        &mut self,
        now: DateTime<Utc>,
        limit: usize,
        stale_after: TimeDelta,
    ) -> Vec<String> {
        let threshold = now - stale_after;
        let mut candidates: Vec<(Option<DateTime<Utc>>, String)> = self
            .folders
            .iter()
            .filter(|f| {
                f.full_name_raw != self.system.inbox
                    && f.selectable
                    && f.last_polled_at.is_none_or(|at| at < threshold)
                    && (self.system.is_system(&f.full_name_raw)
                        || (f.subscribed && self.is_visible(f)))
            })
            .map(|f| (f.last_polled_at, f.full_name_raw.clone()))
            .collect();

        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        candidates.truncate(limit);

        let names: Vec<String> = candidates.into_iter().map(|(_, name)| name).collect();
        for name in &names {
            if let Some(folder) = self.get_mut(name) {
                folder.last_polled_at = Some(now);
            }
        }
        names
    }
}
