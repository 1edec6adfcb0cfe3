//! Domain models shared by the sync components.

mod account;
mod folder;
mod message;
mod route;

pub use account::{Account, AccountsAndIdentities, Identity, Quota};
pub use folder::{
    Folder, FolderStore, SystemFolder, SystemFolders, UNUSED_OPTION_VALUE, folder_name_hash,
};
pub use message::{Message, MessageFlags, MessageKey, NewMessage, SetAction, Uid, unique_uids};
pub use route::MailboxRoute;
