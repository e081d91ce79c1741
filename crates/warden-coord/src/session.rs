//! Session lifecycle events
//!
//! Session-level failures are reported as [`CoordError`] values to whoever is
//! consuming the event stream. Deciding whether a lost session is fatal to
//! the process is left to the caller.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{CoordError, Result};
use crate::node::SessionId;

/// State of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Expired,
    AuthFailed,
    Closed,
}

impl SessionState {
    /// The error a consumer should surface for this state, if it is a failure.
    pub fn as_error(self) -> Option<CoordError> {
        match self {
            SessionState::Connecting | SessionState::Connected => None,
            SessionState::Expired => Some(CoordError::SessionExpired),
            SessionState::AuthFailed => Some(CoordError::AuthFailed),
            SessionState::Closed => Some(CoordError::ConnectionLost),
        }
    }

    /// No further events follow a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Expired | SessionState::AuthFailed | SessionState::Closed
        )
    }
}

/// A state transition of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub state: SessionState,
}

/// Create a connected publisher/stream pair for `session`.
pub fn session_channel(session: SessionId) -> (SessionEventSender, SessionEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        SessionEventSender { session, tx },
        SessionEvents { session, rx },
    )
}

/// Service side of a session event stream
#[derive(Debug, Clone)]
pub struct SessionEventSender {
    session: SessionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionEventSender {
    pub fn publish(&self, state: SessionState) {
        let event = SessionEvent {
            session: self.session,
            state,
        };
        // Nobody listening is fine; events are advisory.
        let _ = self.tx.send(event);
    }
}

/// Stream of session state transitions
#[derive(Debug)]
pub struct SessionEvents {
    session: SessionId,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Next event, or `None` once the service side is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

/// Wait until the session reports `Connected`.
///
/// Returns the matching error for a terminal state, `ConnectionLost` if the
/// stream ends and `ConnectTimeout` if `timeout` elapses first.
pub async fn wait_on_connect(events: &mut SessionEvents, timeout: Duration) -> Result<()> {
    let session = events.session();
    let wait = async {
        loop {
            let Some(event) = events.recv().await else {
                return Err(CoordError::ConnectionLost);
            };
            debug!(session = %session, state = ?event.state, "Session event");
            match event.state {
                SessionState::Connected => return Ok(()),
                SessionState::Connecting => continue,
                state => {
                    return Err(state.as_error().unwrap_or(CoordError::ConnectionLost));
                }
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(CoordError::ConnectTimeout(timeout)),
    }
}

/// Watch a session in the background.
///
/// The task resolves with the error describing why the session stopped being
/// usable. `Connecting` events before the first `Connected` are the initial
/// handshake and are skipped; a transition back to `Connecting` afterwards
/// counts as loss, since the locks held by this session can no longer be
/// trusted once the connection drops.
pub fn monitor_session(mut events: SessionEvents) -> JoinHandle<CoordError> {
    tokio::spawn(async move {
        let session = events.session();
        info!(session = %session, "Monitoring session");
        let mut connected = false;
        loop {
            let Some(event) = events.recv().await else {
                error!(session = %session, "Session event stream ended");
                return CoordError::ConnectionLost;
            };
            match event.state {
                SessionState::Connected => connected = true,
                SessionState::Connecting if !connected => continue,
                SessionState::Connecting => {
                    error!(session = %session, "Session is reconnecting");
                    return CoordError::ConnectionLost;
                }
                state => {
                    let err = state.as_error().unwrap_or(CoordError::ConnectionLost);
                    error!(session = %session, state = ?state, error = %err, "Session lost");
                    return err;
                }
            }
        }
    })
}
