//! User-facing notifications.
//!
//! The store reports outcomes through a [`Notifier`] so it can run behind a
//! terminal, a GUI shell or a test harness without knowing which.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Sink for user-visible messages and navigation requests.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    /// Leave the current view for `path`.
    fn redirect(&self, path: &str);
}

pub type NotifierRef = Arc<dyn Notifier>;

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => tracing::info!("{}", notification.message),
            Level::Warning => tracing::warn!("{}", notification.message),
            Level::Error => tracing::error!("{}", notification.message),
        }
    }

    fn redirect(&self, path: &str) {
        tracing::info!("redirecting to {}", path);
    }
}

/// Captures everything for later inspection.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    notifications: Mutex<Vec<Notification>>,
    redirects: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn with_level(&self, level: Level) -> Vec<String> {
        lock(&self.notifications)
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn redirects(&self) -> Vec<String> {
        lock(&self.redirects).clone()
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }

    fn redirect(&self, path: &str) {
        lock(&self.redirects).push(path.to_string());
    }
}
