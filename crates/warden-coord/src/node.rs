//! Node and path model for the hierarchical namespace

use std::fmt;

use crate::error::{CoordError, Result};

/// Default zero-padded width of sequential node suffixes
pub const DEFAULT_SEQUENCE_WIDTH: usize = 10;

/// Path of the namespace root
pub const ROOT: &str = "/";

/// Identifier of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// How a node is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateMode {
    #[default]
    Persistent,
    Ephemeral,
    PersistentSequential,
    EphemeralSequential,
}

impl CreateMode {
    /// Node is removed when the creating session ends
    pub fn is_ephemeral(self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }

    /// Service appends a sequence suffix to the requested name
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            CreateMode::PersistentSequential | CreateMode::EphemeralSequential
        )
    }
}

/// Node metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stat {
    /// Data version, bumped on every `set_data`
    pub version: i32,
    /// Owning session for ephemeral nodes
    pub ephemeral_owner: Option<SessionId>,
    /// Number of direct children
    pub num_children: usize,
    /// Transaction id of the creation
    pub created_txn: u64,
    /// Transaction id of the last modification
    pub modified_txn: u64,
}

impl Stat {
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral_owner.is_some()
    }
}

/// Check that `path` is absolute, has no trailing slash and no empty segments.
pub fn validate_path(path: &str) -> Result<()> {
    if path == ROOT {
        return Ok(());
    }
    if !path.starts_with('/') || path.ends_with('/') {
        return Err(CoordError::InvalidPath(path.to_string()));
    }
    if path[1..].split('/').any(|segment| segment.is_empty()) {
        return Err(CoordError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Join a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent of a path; the root is its own parent.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// Last segment of a path.
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Render a sequence number as a fixed-width decimal suffix.
pub fn format_sequence(sequence: u64, width: usize) -> String {
    format!("{:0width$}", sequence, width = width)
}

/// Whether `sequence` renders in exactly `width` digits.
///
/// Suffixes are ordered as strings, so a longer one would sort before
/// shorter, larger-valued ones.
pub fn sequence_fits(sequence: u64, width: usize) -> bool {
    match u32::try_from(width).ok().and_then(|w| 10u64.checked_pow(w)) {
        Some(limit) => sequence < limit,
        None => true,
    }
}
