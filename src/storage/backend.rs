//! Storage backend trait definition
//!
//! This module defines the core `TargetStore` trait that all
//! storage implementations must implement.

use async_trait::async_trait;

use super::error::StorageResult;
use crate::target::{Target, TargetId};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// A change made to the store by someone other than this monitor
///
/// Deltas arrive on the monitor's inbound feed and are merged into the
/// in-memory state by the monitor actor.
#[derive(Debug, Clone)]
pub enum TargetDelta {
    /// A target was created or its configuration changed
    Upserted(Target),

    /// A target was removed
    Deleted(TargetId),

    /// The target order changed
    Reordered(Vec<TargetId>),
}

/// Trait for persistent target stores
///
/// All backends must implement this trait. The monitor is the single writer;
/// implementations must provide read-after-write consistency for it.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared with the monitor
/// actor task.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>` which wraps `StorageError`.
/// Implementations should convert backend-specific errors to
/// `StorageError` variants.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// All stored targets, in display order
    async fn list_targets(&self) -> StorageResult<Vec<Target>>;

    /// Insert or replace a target
    ///
    /// New targets are appended after the existing ones; replacing keeps the
    /// target's position.
    async fn upsert_target(&self, target: &Target) -> StorageResult<()>;

    /// Delete a target and its history
    ///
    /// Returns whether a target was removed.
    async fn delete_target(&self, id: TargetId) -> StorageResult<bool>;

    /// Persist a new display order
    ///
    /// Ids missing from `ids` keep their relative order after the listed ones.
    async fn reorder(&self, ids: &[TargetId]) -> StorageResult<()>;

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Get backend-specific statistics
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
