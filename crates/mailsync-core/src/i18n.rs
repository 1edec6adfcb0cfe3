//! Localized strings and server notification codes.

/// Looks up a localized string.
///
/// Parameters replace `%NAME%` placeholders in the looked-up text.
pub trait Translate: Send + Sync {
    /// Returns the text for `key`, or the key itself when unknown.
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String;
}

/// Server notification codes the client reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    /// The CSRF token was rejected.
    InvalidToken,
    /// Authentication failed.
    AuthError,
    /// The message list could not be fetched.
    CantGetMessageList,
    /// A message could not be fetched.
    CantGetMessage,
    /// Messages could not be deleted.
    CantDeleteMessage,
    /// Messages could not be moved.
    CantMoveMessage,
    /// Messages could not be copied.
    CantCopyMessage,
    /// Anything else.
    UnknownError,
}

impl Notification {
    const ALL: [Self; 8] = [
        Self::InvalidToken,
        Self::AuthError,
        Self::CantGetMessageList,
        Self::CantGetMessage,
        Self::CantDeleteMessage,
        Self::CantMoveMessage,
        Self::CantCopyMessage,
        Self::UnknownError,
    ];

    /// Numeric code used on the wire.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::InvalidToken => 101,
            Self::AuthError => 102,
            Self::CantGetMessageList => 201,
            Self::CantGetMessage => 202,
            Self::CantDeleteMessage => 203,
            Self::CantMoveMessage => 204,
            Self::CantCopyMessage => 205,
            Self::UnknownError => 999,
        }
    }

    /// Looks up a notification by its wire code.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.code() == code)
    }

    /// Translation key of the notification text.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::InvalidToken => "NOTIFICATIONS/INVALID_TOKEN",
            Self::AuthError => "NOTIFICATIONS/AUTH_ERROR",
            Self::CantGetMessageList => "NOTIFICATIONS/CANT_GET_MESSAGE_LIST",
            Self::CantGetMessage => "NOTIFICATIONS/CANT_GET_MESSAGE",
            Self::CantDeleteMessage => "NOTIFICATIONS/CANT_DELETE_MESSAGE",
            Self::CantMoveMessage => "NOTIFICATIONS/CANT_MOVE_MESSAGE",
            Self::CantCopyMessage => "NOTIFICATIONS/CANT_COPY_MESSAGE",
            Self::UnknownError => "NOTIFICATIONS/UNKNOWN_ERROR",
        }
    }
}

/// Text for a server error code, falling back to `default` for unknown codes.
#[must_use]
pub fn notification_text(
    tr: &dyn Translate,
    code: Option<u32>,
    server_message: Option<&str>,
    default: Notification,
) -> String {
    match code.and_then(Notification::from_code) {
        Some(known) => tr.translate(known.key(), &[]),
        None => match server_message {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => tr.translate(default.key(), &[]),
        },
    }
}

/// Built-in English strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishCatalog;

impl EnglishCatalog {
    fn lookup(key: &str) -> Option<&'static str> {
        let text = match key {
            "NOTIFICATIONS/INVALID_TOKEN" => "Invalid token",
            "NOTIFICATIONS/AUTH_ERROR" => "Authentication failed",
            "NOTIFICATIONS/CANT_GET_MESSAGE_LIST" => "Can't get message list",
            "NOTIFICATIONS/CANT_GET_MESSAGE" => "Can't get message",
            "NOTIFICATIONS/CANT_DELETE_MESSAGE" => "Can't delete message",
            "NOTIFICATIONS/CANT_MOVE_MESSAGE" => "Can't move message",
            "NOTIFICATIONS/CANT_COPY_MESSAGE" => "Can't copy message",
            "NOTIFICATIONS/UNKNOWN_ERROR" => "Unknown error",
            "POPUPS_ASK/DESC_WANT_DELETE_MESSAGES" => {
                "Are you sure you want to delete the message(s)?"
            }
            "POPUPS_SYSTEM_FOLDERS/NOTIFICATION_SPAM" => {
                "Choose the folder to receive spam, or disable it"
            }
            "POPUPS_SYSTEM_FOLDERS/NOTIFICATION_TRASH" => {
                "Choose the folder to receive deleted messages, or disable it"
            }
            "POPUPS_SYSTEM_FOLDERS/NOTIFICATION_ARCHIVE" => {
                "Choose the folder to receive archived messages, or disable it"
            }
            "MESSAGE_LIST/NEW_MESSAGE_NOTIFICATION" => "You have %COUNT% new message(s)",
            "GLOBAL/LOADING" => "Loading",
            _ => return None,
        };
        Some(text)
    }
}

impl Translate for EnglishCatalog {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        let mut text = Self::lookup(key).unwrap_or(key).to_string();
        for (name, value) in params {
            text = text.replace(&format!("%{name}%"), value);
        }
        text
    }
}
