//! Persistence for monitored targets
//!
//! This module provides a trait-based abstraction over the store that keeps
//! targets (configuration plus rolling history) across restarts.
//!
//! ## Design
//!
//! - **Trait-based**: `TargetStore` lets the monitor run against any backend
//! - **Async**: All operations are async for compatibility with the Tokio actors
//! - **Keyed by target id**: the monitor treats the store as a key-value store
//!   with an explicit ordering
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database, one row per target
//! - **In-Memory** (fallback): No persistence, for testing or ephemeral runs
//!
//! ## Usage
//!
//! ```no_run
//! use uptime_monitoring::storage::{TargetStore, sqlite::SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::new("./targets.db").await?;
//!     let targets = store.list_targets().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, TargetDelta, TargetStore};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use schema::TargetRow;
