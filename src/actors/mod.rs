//! Actor-based monitoring core
//!
//! One [`monitor::MonitorActor`] owns every target. Everything that needs to
//! change target state sends it a message; everything that needs to read it
//! watches the published snapshot.
//!
//! ## Architecture Overview
//!
//! ```text
//!   MonitorHandle ──commands (mpsc)──┐        ┌── store deltas (mpsc, optional)
//!                                    ▼        ▼
//!                              ┌──────────────────┐
//!   Scheduler timers ─fired──→ │   MonitorActor   │ ←── ProbeCompleted / DiagnosisCompleted
//!                              └────────┬─────────┘
//!                                       │
//!                 ┌─────────────────────┼──────────────────────┐
//!                 ▼                     ▼                      ▼
//!          TargetStore          snapshot (watch)       MonitorEvent (broadcast)
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: mpsc channel with oneshot `respond_to` for results
//! 2. **Snapshots**: watch channel holding the latest full target list
//! 3. **Events**: broadcast channel for results, transitions and advisories
//! 4. **Work reports**: timers, probes and diagnoses report back over mpsc so
//!    that only the actor ever mutates a target

pub mod error;
pub mod messages;
pub mod monitor;
pub mod scheduler;

pub use error::MonitorError;
pub use messages::{Direction, MonitorEvent, MonitorSnapshot, ProbeOrigin};
pub use monitor::{Collaborators, MonitorHandle, MonitorSettings};
