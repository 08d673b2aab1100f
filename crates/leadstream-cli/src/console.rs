//! Terminal notifier.

use leadstream_client::{Level, Notification, Notifier};

/// Prints notifications to stderr so command output on stdout stays clean.
pub struct ConsoleNotifier;

fn prefix(level: Level) -> &'static str {
    match level {
        Level::Success => "ok",
        Level::Warning => "warning",
        Level::Error => "error",
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("{}: {}", prefix(notification.level), notification.message);
    }

    fn redirect(&self, path: &str) {
        eprintln!("-> {}", path);
    }
}
