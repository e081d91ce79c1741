//! Node utilities built on the [`Coordinator`] surface
//!
//! Used to prepare and tear down lock base paths; none of this takes part in
//! lock acquisition.

use tracing::debug;

use crate::error::{CoordError, Result};
use crate::handle::Coordinator;
use crate::node::{self, CreateMode, ROOT, Stat};

/// Prefix marking a child as hidden
pub const HIDDEN_PREFIX: char = '.';

/// Create `path` and any missing ancestors as empty persistent nodes.
///
/// Succeeds if the node already exists, including when another client
/// creates it concurrently. Returns `path`.
pub async fn touch<C: Coordinator + ?Sized>(coord: &C, path: &str) -> Result<String> {
    node::validate_path(path)?;
    if coord.exists(path).await?.is_some() {
        return Ok(path.to_string());
    }

    let mut current = String::new();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        current = node::join(if current.is_empty() { ROOT } else { &current }, segment);
        match coord.create(&current, &[], CreateMode::Persistent).await {
            Ok(_) => debug!(path = %current, "Touched node"),
            Err(CoordError::NodeExists(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(path.to_string())
}

/// [`touch`] the node, then overwrite its data regardless of version.
pub async fn touch_and_set<C: Coordinator + ?Sized>(
    coord: &C,
    path: &str,
    data: &[u8],
) -> Result<Stat> {
    touch(coord, path).await?;
    coord.set_data(path, data, None).await
}

/// Delete `path` and everything below it, children first.
///
/// Fails with [`CoordError::NoNode`] if `path` does not exist. Nodes that
/// disappear while the walk is in progress are skipped.
pub async fn recursive_delete<C: Coordinator + ?Sized>(coord: &C, path: &str) -> Result<()> {
    node::validate_path(path)?;
    if coord.exists(path).await?.is_none() {
        return Err(CoordError::NoNode(path.to_string()));
    }

    // Depth-first pre-order walk; deleting in reverse yields children first.
    let mut pending = vec![path.to_string()];
    let mut ordered = Vec::new();
    while let Some(current) = pending.pop() {
        match coord.children(&current).await {
            Ok(children) => {
                pending.extend(children.iter().map(|child| node::join(&current, child)));
            }
            Err(CoordError::NoNode(_)) => continue,
            Err(e) => return Err(e),
        }
        ordered.push(current);
    }

    for current in ordered.iter().rev() {
        match coord.delete(current, None).await {
            Ok(()) | Err(CoordError::NoNode(_)) => {}
            Err(e) => return Err(e),
        }
    }
    debug!(path = %path, removed = ordered.len(), "Deleted subtree");
    Ok(())
}

/// Drop names starting with [`HIDDEN_PREFIX`].
pub fn filter_hidden(nodes: Vec<String>) -> Vec<String> {
    nodes
        .into_iter()
        .filter(|name| !name.starts_with(HIDDEN_PREFIX))
        .collect()
}

/// Children of `path` without hidden names.
pub async fn visible_children<C: Coordinator + ?Sized>(coord: &C, path: &str) -> Result<Vec<String>> {
    Ok(filter_hidden(coord.children(path).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCoordinator;

    #[test]
    fn test_filter_hidden() {
        let nodes = vec![
            ".meta".to_string(),
            "lock-0000000001".to_string(),
            "read-0000000002".to_string(),
            "..".to_string(),
        ];
        assert_eq!(
            filter_hidden(nodes),
            vec!["lock-0000000001".to_string(), "read-0000000002".to_string()]
        );
        assert!(filter_hidden(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_touch_creates_ancestors() {
        let service = MemoryCoordinator::default();
        let (session, _events) = service.connect();

        assert_eq!(touch(&session, "/test/a/b").await.unwrap(), "/test/a/b");
        assert!(session.exists("/test").await.unwrap().is_some());
        assert!(session.exists("/test/a").await.unwrap().is_some());
        assert!(session.exists("/test/a/b").await.unwrap().is_some());

        // Idempotent
        touch(&session, "/test/a/b").await.unwrap();
        touch(&session, "/test/a").await.unwrap();
        assert!(touch(&session, "/").await.is_ok());
        assert!(touch(&session, "no-slash").await.is_err());
    }

    #[tokio::test]
    async fn test_touch_and_set() {
        let service = MemoryCoordinator::default();
        let (session, _events) = service.connect();

        let stat = touch_and_set(&session, "/cfg/value", b"one").await.unwrap();
        assert_eq!(stat.version, 1);
        let stat = touch_and_set(&session, "/cfg/value", b"two").await.unwrap();
        assert_eq!(stat.version, 2);

        let (data, _) = session.get_data("/cfg/value").await.unwrap();
        assert_eq!(data, b"two");
    }

    #[tokio::test]
    async fn test_recursive_delete() {
        let service = MemoryCoordinator::default();
        let (session, _events) = service.connect();
        touch(&session, "/test/a/b").await.unwrap();
        touch(&session, "/test/a/c").await.unwrap();
        touch(&session, "/test/d").await.unwrap();
        session
            .create("/test/a/lock-", &[], CreateMode::EphemeralSequential)
            .await
            .unwrap();
        touch(&session, "/keep").await.unwrap();

        recursive_delete(&session, "/test").await.unwrap();
        assert!(session.exists("/test").await.unwrap().is_none());
        assert!(session.exists("/keep").await.unwrap().is_some());

        let err = recursive_delete(&session, "/test").await.unwrap_err();
        assert_eq!(err, CoordError::NoNode("/test".to_string()));
    }

    #[tokio::test]
    async fn test_visible_children() {
        let service = MemoryCoordinator::default();
        let (session, _events) = service.connect();
        touch(&session, "/dir/.hidden").await.unwrap();
        touch(&session, "/dir/shown").await.unwrap();

        assert_eq!(
            visible_children(&session, "/dir").await.unwrap(),
            vec!["shown".to_string()]
        );
        assert!(visible_children(&session, "/nope").await.is_err());
    }
}
