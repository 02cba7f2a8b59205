//! Per-target one-shot timers
//!
//! The [`Scheduler`] owns one timer task per armed target. A timer sleeps for
//! the target's interval and then reports a [`TimerFired`] back to the monitor
//! actor; it never probes by itself. Re-arming a target always aborts the
//! previous timer first, so a target has at most one pending timer.
//!
//! Each armed timer carries a token. A firing whose token no longer matches
//! the armed timer (it was cancelled or replaced after it had already sent) is
//! reported as stale by [`Scheduler::take_fired`] and must be ignored.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, trace};

use crate::probe::{Probe, ProbeResult};
use crate::target::{Target, TargetId};

/// A timer reached its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub id: TargetId,
    pub token: u64,
}

struct Timer {
    token: u64,
    handle: JoinHandle<()>,
}

pub struct Scheduler {
    timers: HashMap<TargetId, Timer>,
    fired_tx: mpsc::Sender<TimerFired>,
    next_token: u64,
}

impl Scheduler {
    pub fn new(fired_tx: mpsc::Sender<TimerFired>) -> Self {
        Self {
            timers: HashMap::new(),
            fired_tx,
            next_token: 0,
        }
    }

    /// Arm a one-shot timer for `id`, replacing any pending one
    pub fn arm(&mut self, id: TargetId, after: Duration) {
        self.cancel(id);

        self.next_token += 1;
        let token = self.next_token;
        let fired_tx = self.fired_tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = fired_tx.send(TimerFired { id, token }).await;
        });

        trace!(target_id = %id, ?after, "armed timer");
        self.timers.insert(id, Timer { token, handle });
    }

    /// Abort the pending timer for `id`, if any
    pub fn cancel(&mut self, id: TargetId) -> bool {
        match self.timers.remove(&id) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.handle.abort();
        }
    }

    /// Tear down every timer and arm one per non-paused target
    pub fn schedule<'a>(&mut self, targets: impl IntoIterator<Item = &'a Target>, global: u64) {
        self.cancel_all();
        for target in targets {
            if !target.paused {
                self.arm(target.id, Duration::from_secs(target.interval_or(global)));
            }
        }
    }

    /// Consume a firing; returns false if it belongs to a cancelled or replaced timer
    pub fn take_fired(&mut self, fired: &TimerFired) -> bool {
        match self.timers.get(&fired.id) {
            Some(timer) if timer.token == fired.token => {
                self.timers.remove(&fired.id);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, id: TargetId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Run a probe on its own task and turn a panic into a `Down` result
pub async fn guarded_probe(probe: Arc<dyn Probe>, target: Target) -> ProbeResult {
    let name = target.name.clone();
    match tokio::spawn(async move { probe.probe(&target).await }).await {
        Ok(result) => result,
        Err(e) => {
            let reason = join_error_message(e);
            error!(target = %name, "probe task failed: {reason}");
            ProbeResult::down(format!("poll failed: {reason}"))
        }
    }
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    panic_message(err.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "probe panicked".to_string()
    }
}
