//! Collaborator traits
//!
//! The coordinator and the outcome handler never store sessions, render
//! notices or route the user themselves. They hand that work to the
//! embedding application through these traits.

use crate::errors::PopupAuthError;
use crate::models::LoginRequest;
use async_trait::async_trait;
use std::fmt;

/// Stores an authenticated session
#[async_trait]
pub trait LoginDispatcher: Send + Sync {
    /// Persist the session described by `request`
    ///
    /// # Errors
    /// Returns an error if the session could not be stored; the user is then
    /// told sign-in failed and is not navigated anywhere.
    async fn dispatch_login(&self, request: LoginRequest) -> Result<(), PopupAuthError>;
}

/// Shows user-facing feedback
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Routes the user to another page
pub trait Navigator: Send + Sync {
    /// Go to `path`; `replace` swaps the current history entry instead of
    /// pushing a new one
    fn navigate(&self, path: &str, replace: bool);
}

/// Tone of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }
}

/// Notifier that only writes notices to the log
///
/// Handy for headless hosts that have nowhere to show a notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => log::error!("{}", notification.message),
            NotificationLevel::Warning => log::warn!("{}", notification.message),
            NotificationLevel::Success | NotificationLevel::Info => {
                log::info!("{}", notification.message);
            }
        }
    }
}
