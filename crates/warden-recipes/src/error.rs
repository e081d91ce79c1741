//! Lock error types

use std::time::Duration;

use warden_coord::CoordError;

use crate::model::LockMode;

/// Error type for lock acquisition and release
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("failed to create lock candidate under {path}: {source}")]
    CreateFailed {
        path: String,
        #[source]
        source: CoordError,
    },

    #[error("lock path does not exist: {0}")]
    PathMissing(String),

    #[error("connection lost: {0}")]
    ConnectionLost(#[source] CoordError),

    #[error("protocol invariant violated: {0}")]
    ProtocolInvariantViolated(String),

    #[error("lock handle already holds candidate {0}")]
    AlreadyHeld(String),

    #[error("cannot release a {requested} lock while holding a {held} lock")]
    ModeMismatch { held: LockMode, requested: LockMode },

    #[error("timed out after {waited:?} waiting for lock {path}")]
    Timeout { path: String, waited: Duration },

    #[error("coordination error: {0}")]
    Coordination(#[source] CoordError),
}

impl LockError {
    /// The base path (or a node under it) was missing.
    pub fn is_path_missing(&self) -> bool {
        match self {
            LockError::PathMissing(_) => true,
            LockError::CreateFailed { source, .. } => matches!(source, CoordError::NoNode(_)),
            _ => false,
        }
    }

    /// The session became unusable during the operation.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            LockError::ConnectionLost(_) => true,
            LockError::CreateFailed { source, .. } => source.is_session_fatal(),
            _ => false,
        }
    }
}

impl From<CoordError> for LockError {
    fn from(err: CoordError) -> Self {
        match err {
            CoordError::NoNode(path) => LockError::PathMissing(path),
            CoordError::NodeExists(path) => {
                LockError::ProtocolInvariantViolated(format!("node name collision at {}", path))
            }
            err if err.is_session_fatal() => LockError::ConnectionLost(err),
            err => LockError::Coordination(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
