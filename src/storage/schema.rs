//! Database row definition for stored targets
//!
//! ## Design
//!
//! Like most monitoring stores, we use a **hybrid approach**:
//!
//! ### Columns
//! Identity, ordering and the fields an operator filters on:
//! - `id`, `position` - key and display order
//! - `name`, `address`, `kind`, `paused`, `status` - quick inspection
//!
//! ### JSON document
//! The complete [`Target`] (configuration plus rolling histories) is stored
//! as one JSON document, so the history layout can evolve without migrations.

use chrono::{DateTime, Utc};

use super::error::StorageResult;
use crate::target::Target;

/// One stored target
#[derive(Debug, Clone)]
pub struct TargetRow {
    pub id: String,
    pub position: i64,
    pub name: String,
    pub address: String,
    pub kind: String,
    pub paused: bool,
    pub status: String,
    pub updated_at: DateTime<Utc>,

    /// Complete serialized target
    pub document: String,
}

impl TargetRow {
    /// Build a row for `target` at the given display position
    pub fn from_target(target: &Target, position: i64) -> StorageResult<Self> {
        Ok(Self {
            id: target.id.to_string(),
            position,
            name: target.name.clone(),
            address: target.address.clone(),
            kind: target.check.label().to_string(),
            paused: target.paused,
            status: serde_json::to_value(target.status)?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            updated_at: Utc::now(),
            document: serde_json::to_string(target)?,
        })
    }

    /// Decode the stored document back into a target
    pub fn into_target(self) -> StorageResult<Target> {
        Ok(serde_json::from_str(&self.document)?)
    }
}
