//! Sync settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::SystemFolders;

/// Settings that drive the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SyncSettings {
    /// Messages per list page.
    pub messages_per_page: u32,
    /// Group the message list into threads.
    pub use_threads: bool,
    /// Allow deleting messages without moving them to trash.
    pub dangerous_actions: bool,
    /// The user enabled contacts sync.
    pub contacts_sync_enabled: bool,
    /// The server allows contacts sync.
    pub contacts_sync_allowed: bool,
    /// Contacts sync interval in minutes; zero means the default.
    pub contacts_sync_interval: u32,
    /// System folder roles.
    pub system_folders: SystemFolders,
    /// Timer intervals and delays.
    pub timing: Timing,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            messages_per_page: 20,
            use_threads: false,
            dangerous_actions: false,
            contacts_sync_enabled: false,
            contacts_sync_allowed: false,
            contacts_sync_interval: 0,
            system_folders: SystemFolders::default(),
            timing: Timing::default(),
        }
    }
}

impl SyncSettings {
    /// Period of the recurring contacts sync.
    ///
    /// The interval is clamped to 5..=320 minutes (unset means 20) and padded
    /// by five seconds.
    #[must_use]
    pub fn contacts_sync_period(&self) -> Duration {
        let minutes = match self.contacts_sync_interval {
            0 => 20,
            m => m.clamp(5, 320),
        };
        Duration::from_secs(u64::from(minutes) * 60 + 5)
    }
}

/// Timer intervals and delays, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Quiet period before queued moves are sent.
    pub move_debounce_ms: u64,
    /// Quiet period before a quota refresh after a mutation.
    pub quota_debounce_ms: u64,
    /// Recurring folder poll.
    pub poll_interval_ms: u64,
    /// Recurring quota refresh.
    pub quota_interval_ms: u64,
    /// Recurring folder list reload.
    pub folders_reload_interval_ms: u64,
    /// First contacts sync after boot.
    pub contacts_initial_delay_ms: u64,
    /// First poll after boot.
    pub initial_poll_delay_ms: u64,
    /// First quota fetch after boot.
    pub initial_quota_delay_ms: u64,
    /// Delay between batched boot polls.
    pub boot_repoll_delay_ms: u64,
    /// Suspend watchdog period.
    pub wake_check_interval_ms: u64,
    /// Slack allowed on top of the watchdog period.
    pub wake_grace_ms: u64,
    /// Folders not polled for this long are eligible for the batched poll.
    pub folder_stale_after_ms: u64,
    /// Folders per batched poll.
    pub poll_batch_size: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            move_debounce_ms: 500,
            quota_debounce_ms: 30_000,
            poll_interval_ms: 300_000,
            quota_interval_ms: 900_000,
            folders_reload_interval_ms: 1_200_000,
            contacts_initial_delay_ms: 10_000,
            initial_poll_delay_ms: 1_000,
            initial_quota_delay_ms: 5_000,
            boot_repoll_delay_ms: 2_000,
            wake_check_interval_ms: 3_600_000,
            wake_grace_ms: 1_000,
            folder_stale_after_ms: 300_000,
            poll_batch_size: 5,
        }
    }
}

impl Timing {
    /// Converts a millisecond setting into a duration.
    #[must_use]
    pub const fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}
