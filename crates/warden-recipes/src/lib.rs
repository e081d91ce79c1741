//! Warden Recipes - distributed locks over a coordination service
//!
//! This crate provides:
//! - `Mutex`: exclusive lock with FIFO hand-off between waiters
//! - `RwMutex`: fair read/write lock; readers share, writers exclude
//! - Pure candidate ranking used by both
//! - Lock metrics through the `metrics` facade
//!
//! Both locks work against any [`warden_coord::Coordinator`]. Every waiter
//! watches only its immediate predecessor, so a release wakes a single
//! waiter.

pub mod acquire;
pub mod error;
pub mod metrics;
pub mod model;
pub mod mutex;
pub mod ranking;
pub mod rwmutex;

// Re-exports for convenience
pub use error::{LockError, Result};
pub use model::{Held, LockMode};
pub use mutex::Mutex;
pub use ranking::Ranking;
pub use rwmutex::RwMutex;
