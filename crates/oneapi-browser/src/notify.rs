//! Transient user notifications
//!
//! The controller never rethrows a failed request; it turns the error into a
//! [`Notification`] and hands it to whatever [`Notifier`] the presentation
//! layer injected.

use std::fmt;

use oneapi_client::OneApiError;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Error,
    Warning,
    Info,
    Success,
}

/// Short message shown to the user once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    /// Console wording for a failed request
    pub fn from_error(error: &OneApiError) -> Self {
        match error {
            OneApiError::RateLimited => Self::error("Too many requests, please try again later"),
            OneApiError::DemoMode => {
                Self::info("This site is for demonstration only, there is no server")
            }
            OneApiError::ServerError { status: 500, .. } => {
                Self::error("Internal server error, please contact the administrator")
            }
            OneApiError::ServerError { message, .. } => Self::error(format!("Error: {}", message)),
            other => Self::error(format!("Error: {}", other)),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Sink for notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default notifier: writes notifications to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Error | Level::Warning => warn!("{}", notification.message),
            Level::Info | Level::Success => info!("{}", notification.message),
        }
    }
}

/// Keeps every notification in memory, in delivery order
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.lock())
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}
