//! One-shot watch notifications
//!
//! A watch is registered together with an existence check and fires at most
//! once. The waiting side is a future, so a task blocked on a watch is parked
//! rather than polling the service.

use tokio::sync::oneshot;

use crate::error::{CoordError, Result};

/// What happened to a watched node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    /// The session that registered the watch ended before the node changed
    SessionInvalidated,
}

/// Notification delivered to a watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: String,
}

/// Create a connected trigger/watch pair for `path`.
pub fn watch_pair(path: impl Into<String>) -> (WatchTrigger, Watch) {
    let (tx, rx) = oneshot::channel();
    let path = path.into();
    (
        WatchTrigger {
            path: path.clone(),
            tx,
        },
        Watch { path, rx },
    )
}

/// Service side of a watch registration
#[derive(Debug)]
pub struct WatchTrigger {
    path: String,
    tx: oneshot::Sender<WatchEvent>,
}

impl WatchTrigger {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The waiting side was dropped; firing would be a no-op.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }

    /// Deliver the single notification for this registration.
    pub fn fire(self, kind: WatchEventKind) {
        let event = WatchEvent {
            kind,
            path: self.path,
        };
        // A dropped receiver means nobody is waiting anymore.
        let _ = self.tx.send(event);
    }
}

/// Client side of a watch registration
#[derive(Debug)]
pub struct Watch {
    path: String,
    rx: oneshot::Receiver<WatchEvent>,
}

impl Watch {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the notification.
    ///
    /// Fails with [`CoordError::ConnectionLost`] if the service dropped the
    /// registration without firing it.
    pub async fn wait(self) -> Result<WatchEvent> {
        self.rx.await.map_err(|_| CoordError::ConnectionLost)
    }
}
