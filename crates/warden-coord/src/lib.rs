//! Warden Coord - coordination service handle for lock recipes
//!
//! This crate provides:
//! - The `Coordinator` trait: create, list children, exists-with-watch, delete
//! - Node/path model and one-shot watches
//! - Session lifecycle events surfaced as explicit errors
//! - `MemoryCoordinator`, an in-process coordination service
//! - Node utilities (touch, recursive delete, hidden-child filtering)
//! - Configuration

pub mod config;
pub mod error;
pub mod handle;
pub mod helpers;
pub mod memory;
pub mod node;
pub mod session;
pub mod watch;

// Re-exports for convenience
pub use config::CoordinatorConfig;
pub use error::{CoordError, Result};
pub use handle::Coordinator;
pub use memory::{MemoryCoordinator, Session};
pub use node::{CreateMode, SessionId, Stat};
pub use session::{SessionEvent, SessionEvents, SessionState, monitor_session, wait_on_connect};
pub use watch::{Watch, WatchEvent, WatchEventKind};
