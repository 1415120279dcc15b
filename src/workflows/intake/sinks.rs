use std::sync::{Arc, Mutex};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationVariant {
    #[default]
    Default,
    Destructive,
}

/// Transient message shown to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Destructive,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Sink that keeps everything it receives, for surfaces that report state back
/// instead of rendering it (HTTP sessions, the CLI).
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

#[derive(Debug, Default)]
struct Recorded {
    notifications: Vec<Notification>,
    routes: Vec<String>,
}

impl RecordingSink {
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .expect("sink mutex poisoned")
            .notifications
            .clone()
    }

    pub fn routes(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("sink mutex poisoned")
            .routes
            .clone()
    }

    pub fn last_route(&self) -> Option<String> {
        self.inner
            .lock()
            .expect("sink mutex poisoned")
            .routes
            .last()
            .cloned()
    }
}

impl Notifier for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.inner
            .lock()
            .expect("sink mutex poisoned")
            .notifications
            .push(notification);
    }
}

impl Navigator for RecordingSink {
    fn navigate(&self, route: &str) {
        self.inner
            .lock()
            .expect("sink mutex poisoned")
            .routes
            .push(route.to_string());
    }
}
