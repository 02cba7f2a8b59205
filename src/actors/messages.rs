//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to the monitor via mpsc
//! 2. **Events**: Broadcast notifications published to any number of subscribers
//! 3. **Snapshots**: The latest full state, published through a watch channel

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use super::error::MonitorError;
use crate::probe::ProbeResult;
use crate::target::{Status, Target, TargetId, TargetSpec};

pub type Reply<T> = oneshot::Sender<Result<T, MonitorError>>;

/// Direction for reordering a target among its non-paused peers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Commands that can be sent to the MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Create a target and probe it immediately
    AddTarget {
        spec: TargetSpec,
        respond_to: Reply<TargetId>,
    },

    /// Replace a target's configuration, reset its history and re-probe
    EditTarget {
        id: TargetId,
        spec: TargetSpec,
        respond_to: Reply<()>,
    },

    /// Remove a target and all of its history
    DeleteTarget { id: TargetId, respond_to: Reply<()> },

    /// Move a target one slot among its non-paused peers
    ///
    /// Responds `false` when the target is paused or already at the boundary.
    MoveTarget {
        id: TargetId,
        direction: Direction,
        respond_to: Reply<bool>,
    },

    /// Pause or resume a target; responds with the resulting status
    TogglePause {
        id: TargetId,
        respond_to: Reply<Status>,
    },

    /// Probe out of band, leaving the timer cycle untouched
    ///
    /// Responds `false` when a probe for the target is already in flight.
    CheckNow { id: TargetId, respond_to: Reply<bool> },

    /// Ask the diagnosis service to explain the last response
    ///
    /// Responds `None` when the target has no response text yet.
    RequestDiagnosis {
        id: TargetId,
        respond_to: Reply<Option<String>>,
    },

    /// Change the global polling interval and re-arm every timer
    SetInterval { interval_secs: u64 },

    /// Gracefully shut down the monitor
    ///
    /// In-flight probes are left to finish; their results are dropped.
    Shutdown,
}

/// Why a probe was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOrigin {
    /// The target's timer fired
    Timer,
    /// Target was added, edited, resumed or loaded
    Immediate,
    /// Out-of-band `CheckNow`
    Manual,
}

/// A finished probe, sent from the probe task back to the monitor
#[derive(Debug)]
pub(crate) struct ProbeCompleted {
    pub id: TargetId,
    pub generation: u64,
    pub origin: ProbeOrigin,
    pub result: ProbeResult,
}

/// A finished diagnosis request
#[derive(Debug)]
pub(crate) struct DiagnosisCompleted {
    pub id: TargetId,
    pub generation: u64,
    pub text: String,
    pub respond_to: Reply<Option<String>>,
}

/// Events published by the monitor to all subscribers
///
/// The broadcast channel may lag or drop events for slow subscribers; the
/// snapshot channel always carries the complete state.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A probe result was folded into a target
    ProbeRecorded {
        id: TargetId,
        name: String,
        status: Status,
        result: ProbeResult,
    },

    /// Up → Down transition
    WentDown {
        id: TargetId,
        name: String,
        reason: String,
    },

    /// Down → Up transition
    Recovered { id: TargetId, name: String },

    /// A collaborator failed and a fallback was used
    Advisory { message: String },
}

/// Read-only view of every target, refreshed on every state change
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub targets: Vec<Target>,

    /// Global polling interval in seconds
    pub interval: u64,

    pub taken_at: DateTime<Utc>,
}

impl Default for MonitorSnapshot {
    fn default() -> Self {
        Self {
            targets: vec![],
            interval: 0,
            taken_at: Utc::now(),
        }
    }
}

impl MonitorSnapshot {
    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.iter().find(|target| target.id == id)
    }
}
