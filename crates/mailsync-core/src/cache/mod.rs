//! Client-side caches consulted during reconciliation.

mod flags;
mod hashes;

pub use flags::FlagCache;
pub use hashes::FolderHashRegistry;
