//! Folder content hash registry.

use std::collections::HashMap;

/// Last content hash the server reported for each folder.
///
/// A missing or empty hash means the folder must be treated as changed.
#[derive(Debug, Clone, Default)]
pub struct FolderHashRegistry {
    hashes: HashMap<String, String>,
}

impl FolderHashRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored hash, or `""` when none is known.
    #[must_use]
    pub fn get(&self, folder: &str) -> &str {
        self.hashes.get(folder).map_or("", String::as_str)
    }

    /// Stores a hash, replacing the previous one.
    pub fn set(&mut self, folder: &str, hash: impl Into<String>) {
        self.hashes.insert(folder.to_string(), hash.into());
    }

    /// Forgets the hash, forcing the next check to report a change.
    pub fn invalidate(&mut self, folder: &str) {
        self.set(folder, "");
    }

    /// Returns true if `fresh` differs from the stored hash or none is stored.
    #[must_use]
    pub fn is_changed(&self, folder: &str, fresh: &str) -> bool {
        let stored = self.get(folder);
        stored.is_empty() || stored != fresh
    }
}
