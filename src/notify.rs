//! User-visible notification center.
//!
//! Holds the set of active notifications for the console shell. Transient
//! notifications auto-dismiss; persistent ones stay until dismissed and are
//! de-duplicated by a fixed identifier, so repeated triggers of the same
//! condition never stack.

use std::sync::Mutex;

use crate::api::SENDER_IN_USE;
use crate::error::Error;

/// Fixed identifier used to de-duplicate the sender-in-use warning.
pub const SENDER_IN_USE_NOTIFICATION: &str = "sender-in-use";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// De-duplication key. `None` for transient notifications.
    pub id: Option<String>,
    pub severity: Severity,
    pub message: String,
    pub auto_dismiss: bool,
}

/// Process-wide notification sink.
#[derive(Debug, Default)]
pub struct Notifier {
    active: Mutex<Vec<Notification>>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transient informational notification.
    pub fn info(&self, message: impl Into<String>) {
        self.push(Notification {
            id: None,
            severity: Severity::Info,
            message: message.into(),
            auto_dismiss: true,
        });
    }

    /// Transient error notification.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "user-visible error notification");
        self.push(Notification {
            id: None,
            severity: Severity::Error,
            message,
            auto_dismiss: true,
        });
    }

    /// Persistent warning, de-duplicated by `id`.
    ///
    /// If a notification with the same id is already active, the trigger is
    /// dropped — exactly one warning per id is ever shown.
    pub fn warn_persistent(&self, id: impl Into<String>, message: impl Into<String>) {
        let id = id.into();
        let mut active = self.active.lock().expect("notifier poisoned");
        if active.iter().any(|n| n.id.as_deref() == Some(id.as_str())) {
            return;
        }
        active.push(Notification {
            id: Some(id),
            severity: Severity::Warning,
            message: message.into(),
            auto_dismiss: false,
        });
    }

    /// Surface a request error with the right notification shape.
    ///
    /// A recognized `SENDER_IN_USE` error body becomes a persistent,
    /// de-duplicated warning; everything else becomes a transient error
    /// carrying the server-provided message when available.
    pub fn report_request_error(&self, error: &Error) {
        if error.api_code() == Some(SENDER_IN_USE) {
            let message = error
                .server_message()
                .unwrap_or("sender is still in use")
                .to_string();
            self.warn_persistent(SENDER_IN_USE_NOTIFICATION, message);
            return;
        }
        let message = error
            .server_message()
            .map_or_else(|| error.to_string(), ToString::to_string);
        self.error(message);
    }

    /// Dismiss the notification with the given id, if active.
    pub fn dismiss(&self, id: &str) {
        self.active
            .lock()
            .expect("notifier poisoned")
            .retain(|n| n.id.as_deref() != Some(id));
    }

    /// Snapshot of the currently active notifications.
    #[must_use]
    pub fn active(&self) -> Vec<Notification> {
        self.active.lock().expect("notifier poisoned").clone()
    }

    fn push(&self, notification: Notification) {
        self.active
            .lock()
            .expect("notifier poisoned")
            .push(notification);
    }
}
