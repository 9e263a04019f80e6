//! User-visible notifications (toasts)

use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: Option<String>,
}

impl Notification {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            description: None,
        }
    }

    /// Failed post or toggle mutation
    pub fn mutation_failed(message: &str) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: format!("Oops! There's an error: {}", message),
            description: None,
        }
    }

    /// Failed sign-in or sign-up; the message goes in the description
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: "Uh oh! Something went wrong.".to_string(),
            description: Some(message.into()),
        }
    }
}

/// Presentation-layer sink for notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => info!(title = %notification.title, "Notification"),
            NotificationKind::Error => warn!(
                title = %notification.title,
                description = notification.description.as_deref(),
                "Error notification"
            ),
        }
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn errors(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .iter()
            .filter(|n| n.kind == NotificationKind::Error)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}
