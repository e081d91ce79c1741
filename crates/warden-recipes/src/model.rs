//! Lock modes and candidate naming

use std::fmt;

/// Candidate prefix for exclusive locks
pub const LOCK_PREFIX: &str = "lock-";
/// Candidate prefix for shared (read) locks
pub const READ_PREFIX: &str = "read-";
/// Candidate prefix for exclusive (write) side of a read/write lock
pub const WRITE_PREFIX: &str = "write-";

/// Contention class of a lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// [`Mutex`](crate::Mutex): waits behind every earlier `lock-` candidate
    Exclusive,
    /// [`RwMutex::read_lock`](crate::RwMutex::read_lock): waits only behind earlier writers
    Read,
    /// [`RwMutex::lock`](crate::RwMutex::lock): waits behind every earlier reader or writer
    Write,
}

impl LockMode {
    /// Prefix of the candidate node this mode creates.
    pub fn prefix(self) -> &'static str {
        match self {
            LockMode::Exclusive => LOCK_PREFIX,
            LockMode::Read => READ_PREFIX,
            LockMode::Write => WRITE_PREFIX,
        }
    }

    /// Prefixes of the siblings this mode has to wait for.
    pub fn blocking_prefixes(self) -> &'static [&'static str] {
        match self {
            LockMode::Exclusive => &[LOCK_PREFIX],
            LockMode::Read => &[WRITE_PREFIX],
            LockMode::Write => &[READ_PREFIX, WRITE_PREFIX],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LockMode::Exclusive => "exclusive",
            LockMode::Read => "read",
            LockMode::Write => "write",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate node currently owned by a lock handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Held {
    /// Full path of the candidate node
    pub candidate: String,
    pub mode: LockMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_classes() {
        assert_eq!(LockMode::Exclusive.prefix(), "lock-");
        assert_eq!(LockMode::Exclusive.blocking_prefixes(), &["lock-"]);

        assert_eq!(LockMode::Read.prefix(), "read-");
        assert_eq!(LockMode::Read.blocking_prefixes(), &["write-"]);

        assert_eq!(LockMode::Write.prefix(), "write-");
        assert_eq!(LockMode::Write.blocking_prefixes(), &["read-", "write-"]);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(LockMode::Read.to_string(), "read");
        assert_eq!(LockMode::Exclusive.to_string(), "exclusive");
    }
}
