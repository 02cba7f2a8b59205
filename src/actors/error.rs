//! Errors returned by monitor operations

use std::fmt;

use crate::target::TargetId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// Another target already watches the same address (and port)
    DuplicateTarget { address: String, port: Option<u16> },

    /// No target with this id
    NotFound(TargetId),

    /// The monitor actor is no longer running
    ActorStopped,
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::DuplicateTarget {
                address,
                port: Some(port),
            } => write!(f, "a target for {address} on port {port} already exists"),
            MonitorError::DuplicateTarget { address, port: None } => {
                write!(f, "a target for {address} already exists")
            }
            MonitorError::NotFound(id) => write!(f, "no target with id {id}"),
            MonitorError::ActorStopped => write!(f, "monitor is not running"),
        }
    }
}

impl std::error::Error for MonitorError {}
