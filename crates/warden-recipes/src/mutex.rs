//! Exclusive distributed lock
//!
//! Clients wishing to obtain the lock create a sequential ephemeral
//! `<path>/lock-` node and wait until no `lock-` node with a lower sequence
//! remains. Releasing deletes that node.
//!
//! The base path must exist before `lock` is called. Children of the base path
//! that do not start with `lock-` are ignored.

use std::time::Duration;

use warden_coord::Coordinator;

use crate::acquire;
use crate::error::{LockError, Result};
use crate::model::LockMode;

/// Exclusive lock over a base path in the coordination service.
///
/// A handle owns at most one candidate at a time. Calling [`Mutex::lock`]
/// while a candidate is held fails with [`LockError::AlreadyHeld`] instead of
/// creating a second candidate; the lock is not reentrant.
///
/// Lock state is not revalidated after the session is lost: once the service
/// drops the ephemeral candidate, `is_held` still reports `true` until
/// `unlock` is attempted.
#[derive(Debug)]
pub struct Mutex<C> {
    coord: C,
    path: String,
    candidate: Option<String>,
}

impl<C: Coordinator> Mutex<C> {
    pub fn new(coord: C, path: impl Into<String>) -> Self {
        Self {
            coord,
            path: path.into(),
            candidate: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full path of the held candidate node.
    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    pub fn is_held(&self) -> bool {
        self.candidate.is_some()
    }

    /// Block until the lock is acquired.
    ///
    /// Dropping the returned future before it resolves (for example under an
    /// outer `tokio::time::timeout`) leaves the candidate node behind until
    /// the session ends, and this handle has no record of it. Use
    /// [`Mutex::lock_timeout`] to bound the wait instead.
    pub async fn lock(&mut self) -> Result<()> {
        self.ensure_not_held()?;
        let candidate = acquire::acquire(&self.coord, &self.path, LockMode::Exclusive).await?;
        self.candidate = Some(candidate);
        Ok(())
    }

    /// Like [`Mutex::lock`], giving up after `timeout`.
    ///
    /// On timeout the candidate is deleted and [`LockError::Timeout`] is
    /// returned.
    pub async fn lock_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.ensure_not_held()?;
        let candidate =
            acquire::acquire_timeout(&self.coord, &self.path, LockMode::Exclusive, timeout).await?;
        self.candidate = Some(candidate);
        Ok(())
    }

    /// Release the lock. Does nothing if it is not held.
    ///
    /// If the delete fails the candidate is kept, so `unlock` can be retried.
    pub async fn unlock(&mut self) -> Result<()> {
        let Some(candidate) = self.candidate.as_deref() else {
            return Ok(());
        };
        acquire::release(&self.coord, candidate, LockMode::Exclusive).await?;
        self.candidate = None;
        Ok(())
    }

    fn ensure_not_held(&self) -> Result<()> {
        match &self.candidate {
            Some(candidate) => Err(LockError::AlreadyHeld(candidate.clone())),
            None => Ok(()),
        }
    }
}
