//! In-memory target store (no persistence)
//!
//! Useful for:
//! - Testing without database dependencies
//! - Ephemeral runs (default if no storage configured)
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, TargetStore};
use super::error::StorageResult;
use crate::target::{Target, TargetId};

/// In-memory target store
///
/// Keeps targets in display order behind a lock.
#[derive(Default)]
pub struct MemoryStore {
    targets: RwLock<Vec<Target>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with targets (in the given order)
    pub fn with_targets(targets: Vec<Target>) -> Self {
        Self {
            targets: RwLock::new(targets),
        }
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn list_targets(&self) -> StorageResult<Vec<Target>> {
        Ok(self.targets.read().await.clone())
    }

    async fn upsert_target(&self, target: &Target) -> StorageResult<()> {
        let mut targets = self.targets.write().await;

        match targets.iter_mut().find(|existing| existing.id == target.id) {
            Some(existing) => *existing = target.clone(),
            None => targets.push(target.clone()),
        }
        Ok(())
    }

    async fn delete_target(&self, id: TargetId) -> StorageResult<bool> {
        let mut targets = self.targets.write().await;
        let before = targets.len();
        targets.retain(|target| target.id != id);
        Ok(targets.len() != before)
    }

    async fn reorder(&self, ids: &[TargetId]) -> StorageResult<()> {
        let rank: HashMap<TargetId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        // Stable sort keeps unlisted targets in their relative order at the end
        self.targets
            .write()
            .await
            .sort_by_key(|target| rank.get(&target.id).copied().unwrap_or(usize::MAX));
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                (
                    "total_targets".to_string(),
                    self.targets.read().await.len().to_string(),
                ),
            ]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        Ok(format!(
            "In-Memory: {} targets",
            self.targets.read().await.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory store (no-op)");
        Ok(())
    }
}
