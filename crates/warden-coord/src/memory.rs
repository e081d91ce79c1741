//! In-process coordination service
//!
//! Implements the namespace, sequential and ephemeral nodes, one-shot exists
//! watches and session lifecycle behind the [`Coordinator`] trait, so lock
//! recipes can run against it exactly as they would against a remote service.
//! All state lives behind a single mutex; every operation is atomic with
//! respect to every other operation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::CoordinatorConfig;
use crate::error::{CoordError, Result};
use crate::handle::Coordinator;
use crate::node::{self, CreateMode, ROOT, SessionId, Stat};
use crate::session::{SessionEventSender, SessionEvents, SessionState, session_channel};
use crate::watch::{Watch, WatchEventKind, WatchTrigger, watch_pair};

struct Node {
    data: Vec<u8>,
    version: i32,
    ephemeral_owner: Option<SessionId>,
    children: BTreeSet<String>,
    /// Next suffix handed out to a sequential child
    next_sequence: u64,
    created_txn: u64,
    modified_txn: u64,
}

impl Node {
    fn new(data: Vec<u8>, ephemeral_owner: Option<SessionId>, txn: u64) -> Self {
        Self {
            data,
            version: 0,
            ephemeral_owner,
            children: BTreeSet::new(),
            next_sequence: 0,
            created_txn: txn,
            modified_txn: txn,
        }
    }

    fn stat(&self) -> Stat {
        Stat {
            version: self.version,
            ephemeral_owner: self.ephemeral_owner,
            num_children: self.children.len(),
            created_txn: self.created_txn,
            modified_txn: self.modified_txn,
        }
    }

    fn check_version(&self, path: &str, expected: Option<i32>) -> Result<()> {
        match expected {
            Some(expected) if expected != self.version => Err(CoordError::BadVersion {
                path: path.to_string(),
                expected,
                actual: self.version,
            }),
            _ => Ok(()),
        }
    }
}

struct Tree {
    nodes: HashMap<String, Node>,
    watches: HashMap<String, Vec<(SessionId, WatchTrigger)>>,
    sessions: HashMap<SessionId, SessionState>,
    ephemerals: HashMap<SessionId, HashSet<String>>,
    txn: u64,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT.to_string(), Node::new(Vec::new(), None, 0));
        Self {
            nodes,
            watches: HashMap::new(),
            sessions: HashMap::new(),
            ephemerals: HashMap::new(),
            txn: 0,
        }
    }

    fn check_session(&self, session: SessionId) -> Result<()> {
        match self.sessions.get(&session) {
            Some(SessionState::Connected) => Ok(()),
            Some(state) => Err(state.as_error().unwrap_or(CoordError::ConnectionLost)),
            None => Err(CoordError::ConnectionLost),
        }
    }

    fn next_txn(&mut self) -> u64 {
        self.txn += 1;
        self.txn
    }

    fn node(&self, path: &str) -> Result<&Node> {
        self.nodes
            .get(path)
            .ok_or_else(|| CoordError::NoNode(path.to_string()))
    }

    fn fire(&mut self, path: &str, kind: WatchEventKind) {
        if let Some(registrations) = self.watches.remove(path) {
            for (_, trigger) in registrations {
                trigger.fire(kind);
            }
        }
    }

    fn register_watch(&mut self, session: SessionId, path: &str) -> Watch {
        let (trigger, watch) = watch_pair(path);
        let registrations = self.watches.entry(path.to_string()).or_default();
        registrations.retain(|(_, existing)| !existing.is_abandoned());
        registrations.push((session, trigger));
        watch
    }

    fn create(
        &mut self,
        session: SessionId,
        path: &str,
        data: &[u8],
        mode: CreateMode,
        sequence_width: usize,
    ) -> Result<String> {
        if path == ROOT {
            return Err(CoordError::NodeExists(path.to_string()));
        }
        let parent_path = node::parent(path).to_string();
        let sequence = {
            let parent = self
                .nodes
                .get_mut(&parent_path)
                .ok_or_else(|| CoordError::NoNode(parent_path.clone()))?;
            if parent.ephemeral_owner.is_some() {
                return Err(CoordError::NoChildrenForEphemerals(parent_path));
            }
            if mode.is_sequential() {
                let sequence = parent.next_sequence;
                if !node::sequence_fits(sequence, sequence_width) {
                    return Err(CoordError::SequenceOverflow(parent_path));
                }
                parent.next_sequence += 1;
                Some(sequence)
            } else {
                None
            }
        };

        let full_path = match sequence {
            Some(sequence) => format!("{}{}", path, node::format_sequence(sequence, sequence_width)),
            None => path.to_string(),
        };
        if self.nodes.contains_key(&full_path) {
            return Err(CoordError::NodeExists(full_path));
        }

        let txn = self.next_txn();
        let owner = mode.is_ephemeral().then_some(session);
        self.nodes
            .insert(full_path.clone(), Node::new(data.to_vec(), owner, txn));
        if let Some(parent) = self.nodes.get_mut(&parent_path) {
            parent.children.insert(node::base_name(&full_path).to_string());
            parent.modified_txn = txn;
        }
        if let Some(owner) = owner {
            self.ephemerals
                .entry(owner)
                .or_default()
                .insert(full_path.clone());
        }
        self.fire(&full_path, WatchEventKind::NodeCreated);
        Ok(full_path)
    }

    fn delete(&mut self, path: &str, version: Option<i32>) -> Result<()> {
        if path == ROOT {
            return Err(CoordError::InvalidPath(path.to_string()));
        }
        let node = self.node(path)?;
        node.check_version(path, version)?;
        if !node.children.is_empty() {
            return Err(CoordError::NotEmpty(path.to_string()));
        }
        self.unlink(path);
        Ok(())
    }

    fn unlink(&mut self, path: &str) {
        let Some(node) = self.nodes.remove(path) else {
            return;
        };
        if let Some(owner) = node.ephemeral_owner
            && let Some(owned) = self.ephemerals.get_mut(&owner)
        {
            owned.remove(path);
        }
        let txn = self.next_txn();
        if let Some(parent) = self.nodes.get_mut(node::parent(path)) {
            parent.children.remove(node::base_name(path));
            parent.modified_txn = txn;
        }
        self.fire(path, WatchEventKind::NodeDeleted);
    }

    fn set_data(&mut self, path: &str, data: &[u8], version: Option<i32>) -> Result<Stat> {
        self.node(path)?.check_version(path, version)?;
        let txn = self.next_txn();
        let stat = match self.nodes.get_mut(path) {
            Some(node) => {
                node.data = data.to_vec();
                node.version += 1;
                node.modified_txn = txn;
                node.stat()
            }
            None => return Err(CoordError::NoNode(path.to_string())),
        };
        self.fire(path, WatchEventKind::NodeDataChanged);
        Ok(stat)
    }

    /// Move a connected session to a terminal state, removing its ephemeral
    /// nodes and invalidating its outstanding watches. Returns the number of
    /// ephemeral nodes removed, or `None` if the session was not connected.
    fn end_session(&mut self, session: SessionId, state: SessionState) -> Option<usize> {
        match self.sessions.get_mut(&session) {
            Some(current) if *current == SessionState::Connected => *current = state,
            _ => return None,
        }

        let owned = self.ephemerals.remove(&session).unwrap_or_default();
        for path in &owned {
            self.unlink(path);
        }

        let mut invalidated = Vec::new();
        for registrations in self.watches.values_mut() {
            let (mine, others): (Vec<_>, Vec<_>) = std::mem::take(registrations)
                .into_iter()
                .partition(|(owner, _)| *owner == session);
            *registrations = others;
            invalidated.extend(mine.into_iter().map(|(_, trigger)| trigger));
        }
        self.watches.retain(|_, registrations| !registrations.is_empty());
        for trigger in invalidated {
            trigger.fire(WatchEventKind::SessionInvalidated);
        }

        Some(owned.len())
    }
}

struct Inner {
    config: CoordinatorConfig,
    tree: Mutex<Tree>,
    events: DashMap<SessionId, SessionEventSender>,
    next_session: AtomicU64,
}

impl Inner {
    fn end_session(&self, session: SessionId, state: SessionState) -> bool {
        let removed = self.tree.lock().end_session(session, state);
        let Some(removed) = removed else {
            return false;
        };
        if let Some((_, events)) = self.events.remove(&session) {
            events.publish(state);
        }
        info!(
            session = %session,
            state = ?state,
            ephemerals_removed = removed,
            "Session ended"
        );
        true
    }
}

/// In-process coordination service.
///
/// Cloning is cheap; clones share the same namespace.
#[derive(Clone)]
pub struct MemoryCoordinator {
    inner: Arc<Inner>,
}

impl MemoryCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                tree: Mutex::new(Tree::new()),
                events: DashMap::new(),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Open a new session. The returned stream has already seen
    /// `Connecting` followed by `Connected`.
    pub fn connect(&self) -> (Session, SessionEvents) {
        let id = SessionId(self.inner.next_session.fetch_add(1, Ordering::Relaxed));
        let (sender, events) = session_channel(id);
        sender.publish(SessionState::Connecting);
        self.inner
            .tree
            .lock()
            .sessions
            .insert(id, SessionState::Connected);
        sender.publish(SessionState::Connected);
        self.inner.events.insert(id, sender);

        info!(session = %id, "Session established");
        (
            Session {
                id,
                inner: self.inner.clone(),
            },
            events,
        )
    }

    /// Expire a session as the service would after a missed heartbeat.
    /// Returns `false` if the session was not connected.
    pub fn expire_session(&self, session: SessionId) -> bool {
        self.inner.end_session(session, SessionState::Expired)
    }

    /// Number of sessions currently connected.
    pub fn session_count(&self) -> usize {
        self.inner
            .tree
            .lock()
            .sessions
            .values()
            .filter(|state| **state == SessionState::Connected)
            .count()
    }

    /// Paths with a pending watch, once per live registration, sorted.
    pub fn watched_paths(&self) -> Vec<String> {
        let tree = self.inner.tree.lock();
        let mut paths: Vec<String> = tree
            .watches
            .iter()
            .flat_map(|(path, registrations)| {
                registrations
                    .iter()
                    .filter(|(_, trigger)| !trigger.is_abandoned())
                    .map(move |_| path.clone())
            })
            .collect();
        paths.sort();
        paths
    }
}

impl Default for MemoryCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl fmt::Debug for MemoryCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCoordinator")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// A client session on a [`MemoryCoordinator`].
///
/// Clones share the session; ephemeral nodes live until [`Session::close`]
/// or expiry.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    inner: Arc<Inner>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// End the session. Returns `false` if it had already ended.
    pub fn close(&self) -> bool {
        self.inner.end_session(self.id, SessionState::Closed)
    }

    fn with_tree<T>(&self, path: &str, op: impl FnOnce(&mut Tree) -> Result<T>) -> Result<T> {
        node::validate_path(path)?;
        let mut tree = self.inner.tree.lock();
        tree.check_session(self.id)?;
        op(&mut *tree)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

#[async_trait]
impl Coordinator for Session {
    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        let width = self.inner.config.sequence_width;
        let created = self.with_tree(path, |tree| tree.create(self.id, path, data, mode, width))?;
        debug!(session = %self.id, path = %created, mode = ?mode, "Node created");
        Ok(created)
    }

    async fn children(&self, path: &str) -> Result<Vec<String>> {
        self.with_tree(path, |tree| {
            Ok(tree.node(path)?.children.iter().cloned().collect())
        })
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>> {
        self.with_tree(path, |tree| Ok(tree.nodes.get(path).map(Node::stat)))
    }

    async fn exists_watch(&self, path: &str) -> Result<(Option<Stat>, Watch)> {
        self.with_tree(path, |tree| {
            let stat = tree.nodes.get(path).map(Node::stat);
            let watch = tree.register_watch(self.id, path);
            Ok((stat, watch))
        })
    }

    async fn get_data(&self, path: &str) -> Result<(Vec<u8>, Stat)> {
        self.with_tree(path, |tree| {
            let node = tree.node(path)?;
            Ok((node.data.clone(), node.stat()))
        })
    }

    async fn set_data(&self, path: &str, data: &[u8], version: Option<i32>) -> Result<Stat> {
        self.with_tree(path, |tree| tree.set_data(path, data, version))
    }

    async fn delete(&self, path: &str, version: Option<i32>) -> Result<()> {
        self.with_tree(path, |tree| tree.delete(path, version))?;
        debug!(session = %self.id, path = %path, "Node deleted");
        Ok(())
    }
}
