//! Coalescing queue for message moves.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{SystemFolders, Uid, unique_uids};
use crate::remote::{MoveMarker, MoveRequest};

/// Moves queued for one `(from, to)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    /// Source folder raw name.
    pub from: String,
    /// Destination folder raw name.
    pub to: String,
    /// UIDs to move, deduplicated, in first-requested order.
    pub uids: Vec<Uid>,
}

impl PendingMove {
    /// Builds the remote request, deriving the learning marker and the
    /// permanent flag from the system folder roles.
    #[must_use]
    pub fn into_request(self, system: &SystemFolders) -> MoveRequest {
        let is_spam = system.spam.is(&self.to);
        let is_trash = system.trash.is(&self.to);
        let is_ham = !is_spam && system.spam.is(&self.from) && system.inbox == self.to;

        let marker = if is_spam {
            MoveMarker::Spam
        } else if is_ham {
            MoveMarker::Ham
        } else {
            MoveMarker::None
        };

        MoveRequest {
            from: self.from,
            to: self.to,
            uids: self.uids,
            marker,
            permanent: is_spam || is_trash,
        }
    }
}

/// Pending moves keyed by folder pair.
///
/// The engine owns the debounce timer; this type only holds the table.
#[derive(Debug, Default)]
pub struct MoveBatcher {
    pending: BTreeMap<String, PendingMove>,
}

impl MoveBatcher {
    /// Creates an empty batcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the `(from, to)` pair.
    #[must_use]
    pub fn pair_key(from: &str, to: &str) -> String {
        format!("$${from}$${to}$$")
    }

    /// Queues a move, merging it into an existing entry for the same pair.
    pub fn request_move(&mut self, from: &str, to: &str, uids: &[Uid]) {
        let key = Self::pair_key(from, to);
        match self.pending.get_mut(&key) {
            Some(entry) => {
                let merged = unique_uids(entry.uids.iter().chain(uids).copied());
                entry.uids = merged;
            }
            None => {
                self.pending.insert(
                    key,
                    PendingMove {
                        from: from.to_string(),
                        to: to.to_string(),
                        uids: unique_uids(uids.iter().copied()),
                    },
                );
            }
        }
        debug!(from, to, count = uids.len(), "Queued move");
    }

    /// Takes every pending move, leaving the table empty.
    pub fn drain(&mut self) -> Vec<PendingMove> {
        std::mem::take(&mut self.pending).into_values().collect()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of queued folder pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
