//! Fair read/write distributed lock
//!
//! Readers create `<path>/read-` candidates and wait only for writers created
//! before them. Writers create `<path>/write-` candidates and wait for every
//! earlier reader or writer. Since all candidates share one sequence counter,
//! a reader arriving after a queued writer waits for that writer, so writers
//! are not starved.

use std::time::Duration;

use warden_coord::Coordinator;

use crate::acquire;
use crate::error::{LockError, Result};
use crate::model::{Held, LockMode};

/// Read/write lock over a base path in the coordination service.
///
/// A handle holds at most one of the two modes at a time. Acquiring while
/// either mode is held fails with [`LockError::AlreadyHeld`]; releasing the
/// mode that is not held fails with [`LockError::ModeMismatch`] and leaves
/// the held lock in place.
#[derive(Debug)]
pub struct RwMutex<C> {
    coord: C,
    path: String,
    held: Option<Held>,
}

impl<C: Coordinator> RwMutex<C> {
    pub fn new(coord: C, path: impl Into<String>) -> Self {
        Self {
            coord,
            path: path.into(),
            held: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn candidate(&self) -> Option<&str> {
        self.held.as_ref().map(|held| held.candidate.as_str())
    }

    /// Mode currently held, if any.
    pub fn held_mode(&self) -> Option<LockMode> {
        self.held.as_ref().map(|held| held.mode)
    }

    /// Acquire a shared lock.
    ///
    /// Dropping the returned future before it resolves leaves the candidate
    /// node behind until the session ends; use
    /// [`RwMutex::read_lock_timeout`] to bound the wait instead.
    pub async fn read_lock(&mut self) -> Result<()> {
        self.acquire(LockMode::Read, None).await
    }

    pub async fn read_lock_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.acquire(LockMode::Read, Some(timeout)).await
    }

    /// Release a shared lock. Does nothing if no lock is held.
    ///
    /// Only releases a lock taken with `read_lock`; if the write lock is held
    /// this returns [`LockError::ModeMismatch`] and deletes nothing.
    pub async fn read_unlock(&mut self) -> Result<()> {
        self.release(LockMode::Read).await
    }

    /// Acquire the exclusive (write) lock.
    ///
    /// As with [`RwMutex::read_lock`], bound the wait with
    /// [`RwMutex::lock_timeout`] rather than by dropping the future.
    pub async fn lock(&mut self) -> Result<()> {
        self.acquire(LockMode::Write, None).await
    }

    pub async fn lock_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.acquire(LockMode::Write, Some(timeout)).await
    }

    /// Release the exclusive lock. Does nothing if no lock is held.
    ///
    /// Only releases a lock taken with `lock`; if a read lock is held this
    /// returns [`LockError::ModeMismatch`] and deletes nothing.
    pub async fn unlock(&mut self) -> Result<()> {
        self.release(LockMode::Write).await
    }

    async fn acquire(&mut self, mode: LockMode, timeout: Option<Duration>) -> Result<()> {
        if let Some(held) = &self.held {
            return Err(LockError::AlreadyHeld(held.candidate.clone()));
        }
        let candidate = match timeout {
            Some(timeout) => acquire::acquire_timeout(&self.coord, &self.path, mode, timeout).await?,
            None => acquire::acquire(&self.coord, &self.path, mode).await?,
        };
        self.held = Some(Held { candidate, mode });
        Ok(())
    }

    async fn release(&mut self, requested: LockMode) -> Result<()> {
        let Some(held) = &self.held else {
            return Ok(());
        };
        if held.mode != requested {
            return Err(LockError::ModeMismatch {
                held: held.mode,
                requested,
            });
        }
        acquire::release(&self.coord, &held.candidate, held.mode).await?;
        self.held = None;
        Ok(())
    }
}
