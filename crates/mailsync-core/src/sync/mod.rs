//! Sync components: the move queue, the message list and the folder poller.

mod batcher;
mod debounce;
mod poller;
mod reconciler;

pub use batcher::{MoveBatcher, PendingMove};
pub use debounce::Debounce;
pub use poller::{
    FolderPoller, PollDecision, PollMode, PollOutcome, init_uid_next_and_new_messages,
};
pub use reconciler::{
    AppliedPage, ListOutcome, ListRequest, ListState, MessageListReconciler, Paging, Removal,
};
