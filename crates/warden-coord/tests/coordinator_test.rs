//! Warden Coord integration tests
//!
//! Exercise the in-process service through the public API only.

use std::sync::Arc;
use std::time::Duration;

use warden_coord::{
    Coordinator, CoordError, CoordinatorConfig, CreateMode, MemoryCoordinator, SessionState,
    WatchEventKind, helpers, monitor_session, wait_on_connect,
};

#[tokio::test]
async fn test_connect_and_wait() {
    let config = CoordinatorConfig::default().with_connect_timeout(Duration::from_secs(2));
    let service = MemoryCoordinator::new(config);
    let (session, mut events) = service.connect();

    wait_on_connect(&mut events, service.config().connect_timeout())
        .await
        .unwrap();
    assert!(session.exists("/").await.unwrap().is_some());
}

#[tokio::test]
async fn test_shared_handle_through_dyn() {
    let service = MemoryCoordinator::default();
    let (session, _events) = service.connect();
    let coord: Arc<dyn Coordinator> = Arc::new(session);

    helpers::touch(&coord, "/locks/shared").await.unwrap();
    let created = coord
        .create("/locks/shared/lock-", &[], CreateMode::EphemeralSequential)
        .await
        .unwrap();
    assert!(created.starts_with("/locks/shared/lock-"));
    assert_eq!(coord.children("/locks/shared").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_close_wakes_other_session_watch() {
    let service = MemoryCoordinator::default();
    let (holder, mut holder_events) = service.connect();
    let (waiter, _events) = service.connect();
    wait_on_connect(&mut holder_events, Duration::from_secs(1))
        .await
        .unwrap();

    helpers::touch(&waiter, "/locks/a").await.unwrap();
    let candidate = holder
        .create("/locks/a/lock-", &[], CreateMode::EphemeralSequential)
        .await
        .unwrap();

    let (stat, watch) = waiter.exists_watch(&candidate).await.unwrap();
    assert_eq!(stat.unwrap().ephemeral_owner, Some(holder.id()));

    let waiting = tokio::spawn(watch.wait());
    holder.close();

    let event = tokio::time::timeout(Duration::from_secs(1), waiting)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(event.kind, WatchEventKind::NodeDeleted);

    let terminal = holder_events.recv().await.unwrap();
    assert_eq!(terminal.state, SessionState::Closed);
    assert_eq!(
        holder.create("/locks/a/lock-", &[], CreateMode::EphemeralSequential).await,
        Err(CoordError::ConnectionLost)
    );
}

#[tokio::test]
async fn test_fixture_reset() {
    let service = MemoryCoordinator::default();
    let (session, _events) = service.connect();

    helpers::touch(&session, "/test/testmutex").await.unwrap();
    session
        .create("/test/testmutex/lock-", &[], CreateMode::EphemeralSequential)
        .await
        .unwrap();

    helpers::recursive_delete(&session, "/test").await.unwrap();
    helpers::touch(&session, "/test/testmutex").await.unwrap();
    assert!(session.children("/test/testmutex").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_monitor_healthy_session_until_expiry() {
    let service = MemoryCoordinator::default();
    let (session, events) = service.connect();
    let mut monitor = monitor_session(events);

    // A freshly connected session is healthy
    assert!(
        tokio::time::timeout(Duration::from_millis(100), &mut monitor)
            .await
            .is_err()
    );
    assert!(session.exists("/").await.unwrap().is_some());

    assert!(service.expire_session(session.id()));
    let err = tokio::time::timeout(Duration::from_secs(1), monitor)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(err, CoordError::SessionExpired);
}
