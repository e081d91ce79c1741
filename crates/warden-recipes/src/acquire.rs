//! Lock acquisition loop
//!
//! 1. Create a sequential ephemeral candidate `<base>/<prefix>`.
//! 2. List the base path's children without a watch, so waiters are not all
//!    woken by every change.
//! 3. Rank the candidate. If nothing of a blocking class precedes it, the
//!    lock is held.
//! 4. Otherwise check the immediate predecessor for existence, registering a
//!    watch in the same call. If it is already gone, go back to 2.
//! 5. Park until the watch fires, then go back to 2.
//!
//! Each waiter watches exactly one node, so a release wakes one waiter and
//! acquisitions proceed in creation order.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use warden_coord::{CoordError, Coordinator, CreateMode, node};

use crate::error::{LockError, Result};
use crate::metrics;
use crate::model::LockMode;
use crate::ranking::{self, Ranking};

/// Step 1: create the candidate node and return its full path.
pub async fn create_candidate<C: Coordinator + ?Sized>(
    coord: &C,
    base_path: &str,
    mode: LockMode,
) -> Result<String> {
    let path = node::join(base_path, mode.prefix());
    match coord
        .create(&path, &[], CreateMode::EphemeralSequential)
        .await
    {
        Ok(candidate) => {
            debug!(candidate = %candidate, mode = %mode, "Created lock candidate");
            Ok(candidate)
        }
        Err(CoordError::NodeExists(existing)) => Err(LockError::ProtocolInvariantViolated(
            format!("sequential candidate collided with existing node {}", existing),
        )),
        Err(source) => Err(LockError::CreateFailed {
            path: base_path.to_string(),
            source,
        }),
    }
}

/// Steps 2 to 5: wait until `candidate` is first among its blocking class.
///
/// Never times out; callers that need a bound race this future against a
/// timer and clean up the candidate themselves.
pub async fn wait_until_first<C: Coordinator + ?Sized>(
    coord: &C,
    base_path: &str,
    candidate: &str,
    mode: LockMode,
) -> Result<()> {
    let own_name = node::base_name(candidate);
    loop {
        let siblings = coord.children(base_path).await?;
        let predecessor =
            match ranking::rank(own_name, mode.prefix(), &siblings, mode.blocking_prefixes())? {
                Ranking::First => return Ok(()),
                Ranking::Behind { predecessor } => node::join(base_path, &predecessor),
            };

        let (stat, watch) = coord.exists_watch(&predecessor).await?;
        if stat.is_none() {
            debug!(candidate = %candidate, predecessor = %predecessor, "Predecessor already gone");
            continue;
        }

        debug!(candidate = %candidate, predecessor = %predecessor, "Waiting on predecessor");
        metrics::record_watch_wait(mode);
        let event = watch.wait().await?;
        debug!(candidate = %candidate, event = ?event.kind, "Predecessor watch fired");
    }
}

/// Run the full loop and return the held candidate's path.
///
/// If anything fails after the candidate was created, the candidate is
/// deleted before the error is returned.
pub async fn acquire<C: Coordinator + ?Sized>(
    coord: &C,
    base_path: &str,
    mode: LockMode,
) -> Result<String> {
    let started = Instant::now();
    let candidate = match create_candidate(coord, base_path, mode).await {
        Ok(candidate) => candidate,
        Err(e) => {
            metrics::record_failed(mode);
            return Err(e);
        }
    };

    match wait_until_first(coord, base_path, &candidate, mode).await {
        Ok(()) => {
            acquired(&candidate, mode, started);
            Ok(candidate)
        }
        Err(e) => {
            abandon(coord, &candidate, mode).await;
            Err(e)
        }
    }
}

/// Like [`acquire`], but give up after `timeout` and remove the candidate.
pub async fn acquire_timeout<C: Coordinator + ?Sized>(
    coord: &C,
    base_path: &str,
    mode: LockMode,
    timeout: Duration,
) -> Result<String> {
    let started = Instant::now();
    let candidate = match create_candidate(coord, base_path, mode).await {
        Ok(candidate) => candidate,
        Err(e) => {
            metrics::record_failed(mode);
            return Err(e);
        }
    };

    let waited = tokio::time::timeout(
        timeout,
        wait_until_first(coord, base_path, &candidate, mode),
    )
    .await;
    match waited {
        Ok(Ok(())) => {
            acquired(&candidate, mode, started);
            Ok(candidate)
        }
        Ok(Err(e)) => {
            abandon(coord, &candidate, mode).await;
            Err(e)
        }
        Err(_) => {
            abandon(coord, &candidate, mode).await;
            Err(LockError::Timeout {
                path: base_path.to_string(),
                waited: timeout,
            })
        }
    }
}

/// Delete a held candidate.
pub async fn release<C: Coordinator + ?Sized>(coord: &C, candidate: &str, mode: LockMode) -> Result<()> {
    coord.delete(candidate, None).await?;
    metrics::record_released(mode);
    info!(candidate = %candidate, mode = %mode, "Lock released");
    Ok(())
}

fn acquired(candidate: &str, mode: LockMode, started: Instant) {
    let wait_secs = started.elapsed().as_secs_f64();
    metrics::record_acquired(mode, wait_secs);
    info!(candidate = %candidate, mode = %mode, wait_secs, "Lock acquired");
}

async fn abandon<C: Coordinator + ?Sized>(coord: &C, candidate: &str, mode: LockMode) {
    metrics::record_failed(mode);
    match coord.delete(candidate, None).await {
        Ok(()) | Err(CoordError::NoNode(_)) => {
            debug!(candidate = %candidate, "Abandoned lock candidate");
        }
        Err(e) => {
            // The service drops the node with the session if it is dead.
            warn!(candidate = %candidate, error = %e, "Failed to delete abandoned lock candidate");
        }
    }
}

#[cfg(test)]
mod tests {
    use warden_coord::{MemoryCoordinator, helpers};

    use super::*;

    #[tokio::test]
    async fn test_acquire_uncontended() {
        let service = MemoryCoordinator::default();
        let (session, _events) = service.connect();
        helpers::touch(&session, "/locks/a").await.unwrap();

        let candidate = acquire(&session, "/locks/a", LockMode::Exclusive)
            .await
            .unwrap();
        assert_eq!(candidate, "/locks/a/lock-0000000000");

        release(&session, &candidate, LockMode::Exclusive)
            .await
            .unwrap();
        assert!(session.children("/locks/a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_base_path_is_create_failure() {
        let service = MemoryCoordinator::default();
        let (session, _events) = service.connect();

        let err = acquire(&session, "/locks/missing", LockMode::Exclusive)
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::CreateFailed { .. }));
        assert!(err.is_path_missing());
    }

    #[tokio::test]
    async fn test_closed_session_is_connection_lost() {
        let service = MemoryCoordinator::default();
        let (session, _events) = service.connect();
        helpers::touch(&session, "/locks/a").await.unwrap();
        session.close();

        let err = acquire(&session, "/locks/a", LockMode::Read)
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());
    }

    #[tokio::test]
    async fn test_predecessor_gone_before_watch() {
        let service = MemoryCoordinator::default();
        let (holder, _e1) = service.connect();
        let (waiter, _e2) = service.connect();
        helpers::touch(&holder, "/locks/race").await.unwrap();

        let held = acquire(&holder, "/locks/race", LockMode::Exclusive)
            .await
            .unwrap();
        let candidate = create_candidate(&waiter, "/locks/race", LockMode::Exclusive)
            .await
            .unwrap();
        release(&holder, &held, LockMode::Exclusive).await.unwrap();

        wait_until_first(&waiter, "/locks/race", &candidate, LockMode::Exclusive)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_timeout_removes_candidate() {
        let service = MemoryCoordinator::default();
        let (holder, _e1) = service.connect();
        let (waiter, _e2) = service.connect();
        helpers::touch(&holder, "/locks/t").await.unwrap();

        let held = acquire(&holder, "/locks/t", LockMode::Write).await.unwrap();
        let err = acquire_timeout(&waiter, "/locks/t", LockMode::Read, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::Timeout { .. }));

        let children = holder.children("/locks/t").await.unwrap();
        assert_eq!(children, vec![node::base_name(&held).to_string()]);
    }

    #[tokio::test]
    async fn test_foreign_children_are_ignored() {
        let service = MemoryCoordinator::default();
        let (session, _events) = service.connect();
        helpers::touch(&session, "/locks/mixed/.config").await.unwrap();

        let candidate = acquire(&session, "/locks/mixed", LockMode::Write)
            .await
            .unwrap();
        assert!(candidate.starts_with("/locks/mixed/write-"));
    }
}
