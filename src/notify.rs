//! User-facing notifications, drained by the shell into the renderer's toast

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

/// A short message to show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification(pub String);

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sending half; never fails even when nobody is listening
#[derive(Clone)]
pub struct Notifier {
    tx: Sender<Notification>,
}

impl Notifier {
    /// Create a notifier and the receiver the shell drains
    pub fn channel() -> (Self, Receiver<Notification>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    pub fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("Notification: {}", message);
        let _ = self.tx.send(Notification(message));
    }
}
