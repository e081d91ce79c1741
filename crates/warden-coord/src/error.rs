//! Error types for coordination service operations

use std::time::Duration;

/// Error type returned by every [`Coordinator`](crate::Coordinator) operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordError {
    #[error("node does not exist: {0}")]
    NoNode(String),

    #[error("node already exists: {0}")]
    NodeExists(String),

    #[error("node has children: {0}")]
    NotEmpty(String),

    #[error("version mismatch on {path}: expected {expected}, found {actual}")]
    BadVersion {
        path: String,
        expected: i32,
        actual: i32,
    },

    #[error("ephemeral node cannot have children: {0}")]
    NoChildrenForEphemerals(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("sequence counter exhausted under {0}")]
    SequenceOverflow(String),

    #[error("connection lost")]
    ConnectionLost,

    #[error("session expired")]
    SessionExpired,

    #[error("authentication failed")]
    AuthFailed,

    #[error("not connected after {0:?}")]
    ConnectTimeout(Duration),
}

impl CoordError {
    /// Whether the error means the session can no longer be used.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            CoordError::ConnectionLost | CoordError::SessionExpired | CoordError::AuthFailed
        )
    }
}

pub type Result<T> = std::result::Result<T, CoordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoordError::ConnectionLost;
        assert_eq!(err.to_string(), "connection lost");

        let err = CoordError::NoNode("/locks/a".to_string());
        assert_eq!(err.to_string(), "node does not exist: /locks/a");

        let err = CoordError::BadVersion {
            path: "/cfg".to_string(),
            expected: 1,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "version mismatch on /cfg: expected 1, found 3"
        );
    }

    #[test]
    fn test_session_fatal() {
        assert!(CoordError::ConnectionLost.is_session_fatal());
        assert!(CoordError::SessionExpired.is_session_fatal());
        assert!(CoordError::AuthFailed.is_session_fatal());
        assert!(!CoordError::NoNode("/a".to_string()).is_session_fatal());
        assert!(!CoordError::NotEmpty("/a".to_string()).is_session_fatal());
    }
}
