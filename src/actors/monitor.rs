//! MonitorActor - Owns every target and orchestrates probing
//!
//! The actor is the single writer of target state. Probes, timers, store
//! deltas and diagnosis requests all report back to it through channels, and
//! it applies each report as one atomic replace of the affected target.
//!
//! ## Message Flow
//!
//! ```text
//! Timer fired ──┐
//! CheckNow ─────┼─→ dispatch ─→ spawned probe ─→ ProbeCompleted ─→ history::record
//! Add / Edit ───┘                                                   │
//!                                                                   ├─→ store.upsert_target
//!                                                                   ├─→ snapshot (watch) + MonitorEvent (broadcast)
//!                                                                   ├─→ notifier (Up → Down only)
//!                                                                   └─→ re-arm timer
//! ```
//!
//! ## Invariants
//!
//! - At most one probe per target is in flight; a timer that fires while one
//!   is running is skipped and the running probe re-arms the timer when done.
//! - Results carry the target's generation at dispatch time. Editing a target
//!   bumps its generation, so results from the old configuration are dropped.
//! - Results for deleted targets are dropped.
//! - Editing a target while its probe runs does not start a second probe.
//!   The new configuration is probed once the old result has come back.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, instrument, trace, warn};

use super::error::MonitorError;
use super::messages::{
    DiagnosisCompleted, Direction, MonitorCommand, MonitorEvent, MonitorSnapshot, ProbeCompleted,
    ProbeOrigin, Reply,
};
use super::scheduler::{Scheduler, TimerFired, guarded_probe};
use crate::config::{Config, HistoryLimits};
use crate::diagnosis::{DIAGNOSIS_FAILED, Diagnoser, Unavailable};
use crate::history;
use crate::notify::{NoopNotifier, Notifier};
use crate::probe::address::identity_key;
use crate::probe::Probe;
use crate::storage::{MemoryStore, TargetDelta, TargetStore};
use crate::target::{Status, Target, TargetId, TargetSpec};

/// Runtime settings of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Global polling interval in seconds
    pub interval: u64,
    pub history: HistoryLimits,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: 60,
            history: HistoryLimits::default(),
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.interval.max(1),
            history: config.history,
        }
    }
}

/// Everything the monitor talks to
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn Probe>,
    pub store: Arc<dyn TargetStore>,
    pub notifier: Arc<dyn Notifier>,
    pub diagnoser: Arc<dyn Diagnoser>,
}

impl Collaborators {
    /// In-memory store, no notifications, no diagnosis
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            store: Arc::new(MemoryStore::new()),
            notifier: Arc::new(NoopNotifier),
            diagnoser: Arc::new(Unavailable),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn TargetStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_diagnoser(mut self, diagnoser: Arc<dyn Diagnoser>) -> Self {
        self.diagnoser = diagnoser;
        self
    }
}

/// Actor that owns the target list
pub struct MonitorActor {
    settings: MonitorSettings,
    collaborators: Collaborators,

    /// Targets in display order
    targets: Vec<Target>,

    /// Current generation per target
    generations: HashMap<TargetId, u64>,
    next_generation: u64,

    /// Targets with a running probe, keyed to the generation it was dispatched with
    in_flight: HashMap<TargetId, u64>,

    /// Targets to probe again as soon as their running probe completes
    reprobe_pending: HashSet<TargetId>,

    scheduler: Scheduler,

    command_rx: mpsc::Receiver<MonitorCommand>,
    fired_rx: mpsc::Receiver<TimerFired>,
    completed_tx: mpsc::Sender<ProbeCompleted>,
    completed_rx: mpsc::Receiver<ProbeCompleted>,
    diagnosed_tx: mpsc::Sender<DiagnosisCompleted>,
    diagnosed_rx: mpsc::Receiver<DiagnosisCompleted>,

    /// Changes made to the store by other writers
    feed_rx: Option<mpsc::Receiver<TargetDelta>>,

    snapshot_tx: watch::Sender<MonitorSnapshot>,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl MonitorActor {
    pub fn new(
        settings: MonitorSettings,
        collaborators: Collaborators,
        command_rx: mpsc::Receiver<MonitorCommand>,
        feed_rx: Option<mpsc::Receiver<TargetDelta>>,
        snapshot_tx: watch::Sender<MonitorSnapshot>,
        event_tx: broadcast::Sender<MonitorEvent>,
    ) -> Self {
        let (fired_tx, fired_rx) = mpsc::channel(256);
        let (completed_tx, completed_rx) = mpsc::channel(256);
        let (diagnosed_tx, diagnosed_rx) = mpsc::channel(32);

        Self {
            settings,
            collaborators,
            targets: Vec::new(),
            generations: HashMap::new(),
            next_generation: 0,
            in_flight: HashMap::new(),
            reprobe_pending: HashSet::new(),
            scheduler: Scheduler::new(fired_tx),
            command_rx,
            fired_rx,
            completed_tx,
            completed_rx,
            diagnosed_tx,
            diagnosed_rx,
            feed_rx,
            snapshot_tx,
            event_tx,
        }
    }

    /// Run the actor's main loop
    ///
    /// Loads the stored targets, probes them once, then runs until a Shutdown
    /// command arrives or every handle is dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting monitor actor");
        self.load().await;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(fired) = self.fired_rx.recv() => {
                    self.handle_timer(fired);
                }

                Some(done) = self.completed_rx.recv() => {
                    self.handle_completion(done).await;
                }

                Some(done) = self.diagnosed_rx.recv() => {
                    self.handle_diagnosis(done).await;
                }

                Some(delta) = next_delta(&mut self.feed_rx) => {
                    self.apply_delta(delta).await;
                }
            }
        }

        self.scheduler.cancel_all();
        debug!("monitor actor stopped");
    }

    async fn load(&mut self) {
        let stored = match self.collaborators.store.list_targets().await {
            Ok(targets) => targets,
            Err(e) => {
                error!("failed to load targets: {e}");
                self.advise(format!("failed to load stored targets: {e}"));
                Vec::new()
            }
        };

        debug!("loaded {} targets", stored.len());
        for mut target in stored {
            target.status = if target.paused {
                Status::Paused
            } else {
                Status::Idle
            };
            self.bump_generation(target.id);
            self.targets.push(target);
        }

        for index in 0..self.targets.len() {
            if !self.targets[index].paused {
                self.dispatch(index, ProbeOrigin::Immediate);
            }
        }
        self.publish_snapshot();
    }

    async fn handle_command(&mut self, cmd: MonitorCommand) {
        match cmd {
            MonitorCommand::AddTarget { spec, respond_to } => {
                let result = self.add_target(spec).await;
                let _ = respond_to.send(result);
            }
            MonitorCommand::EditTarget {
                id,
                spec,
                respond_to,
            } => {
                let result = self.edit_target(id, spec).await;
                let _ = respond_to.send(result);
            }
            MonitorCommand::DeleteTarget { id, respond_to } => {
                let result = self.delete_target(id).await;
                let _ = respond_to.send(result);
            }
            MonitorCommand::MoveTarget {
                id,
                direction,
                respond_to,
            } => {
                let result = self.move_target(id, direction).await;
                let _ = respond_to.send(result);
            }
            MonitorCommand::TogglePause { id, respond_to } => {
                let result = self.toggle_pause(id).await;
                let _ = respond_to.send(result);
            }
            MonitorCommand::CheckNow { id, respond_to } => {
                let result = self.check_now(id);
                let _ = respond_to.send(result);
            }
            MonitorCommand::RequestDiagnosis { id, respond_to } => {
                self.request_diagnosis(id, respond_to);
            }
            MonitorCommand::SetInterval { interval_secs } => {
                self.set_interval(interval_secs);
            }
            MonitorCommand::Shutdown => {}
        }
    }

    // Commands

    async fn add_target(&mut self, spec: TargetSpec) -> Result<TargetId, MonitorError> {
        self.ensure_unique(&spec, None)?;

        let target = Target::new(spec);
        let id = target.id;
        debug!(target_id = %id, "adding target {}", target.name);

        self.bump_generation(id);
        self.targets.push(target);
        let index = self.targets.len() - 1;

        self.persist(index).await;
        self.dispatch(index, ProbeOrigin::Immediate);
        self.publish_snapshot();
        Ok(id)
    }

    async fn edit_target(&mut self, id: TargetId, spec: TargetSpec) -> Result<(), MonitorError> {
        let index = self.index_of(id).ok_or(MonitorError::NotFound(id))?;
        self.ensure_unique(&spec, Some(id))?;

        self.reconfigure(index, spec);
        self.persist(index).await;
        if !self.targets[index].paused {
            self.probe_when_idle(index);
        }
        self.publish_snapshot();
        Ok(())
    }

    async fn delete_target(&mut self, id: TargetId) -> Result<(), MonitorError> {
        if !self.remove(id) {
            return Err(MonitorError::NotFound(id));
        }

        if let Err(e) = self.collaborators.store.delete_target(id).await {
            error!(target_id = %id, "failed to delete stored target: {e}");
            self.advise(format!("failed to delete stored target: {e}"));
        }
        self.publish_snapshot();
        Ok(())
    }

    async fn move_target(&mut self, id: TargetId, direction: Direction) -> Result<bool, MonitorError> {
        let index = self.index_of(id).ok_or(MonitorError::NotFound(id))?;
        if self.targets[index].paused {
            return Ok(false);
        }

        let active: Vec<usize> = self
            .targets
            .iter()
            .enumerate()
            .filter(|(_, target)| !target.paused)
            .map(|(i, _)| i)
            .collect();

        let Some(slot) = active.iter().position(|&i| i == index) else {
            return Ok(false);
        };

        let neighbor = match direction {
            Direction::Up => slot.checked_sub(1),
            Direction::Down => (slot + 1 < active.len()).then_some(slot + 1),
        };
        let Some(neighbor) = neighbor else {
            return Ok(false);
        };

        self.targets.swap(index, active[neighbor]);

        let ids: Vec<TargetId> = self.targets.iter().map(|target| target.id).collect();
        if let Err(e) = self.collaborators.store.reorder(&ids).await {
            error!("failed to persist target order: {e}");
            self.advise(format!("failed to persist target order: {e}"));
        }
        self.publish_snapshot();
        Ok(true)
    }

    async fn toggle_pause(&mut self, id: TargetId) -> Result<Status, MonitorError> {
        let index = self.index_of(id).ok_or(MonitorError::NotFound(id))?;
        let pause = !self.targets[index].paused;

        self.set_paused(index, pause);
        let status = self.targets[index].status;

        self.persist(index).await;
        if !pause {
            self.probe_when_idle(index);
        }
        self.publish_snapshot();
        Ok(status)
    }

    fn check_now(&mut self, id: TargetId) -> Result<bool, MonitorError> {
        let index = self.index_of(id).ok_or(MonitorError::NotFound(id))?;
        if self.in_flight.contains_key(&id) {
            debug!(target_id = %id, "probe already in flight, ignoring manual check");
            return Ok(false);
        }

        self.dispatch(index, ProbeOrigin::Manual);
        self.publish_snapshot();
        Ok(true)
    }

    fn request_diagnosis(&mut self, id: TargetId, respond_to: Reply<Option<String>>) {
        let Some(index) = self.index_of(id) else {
            let _ = respond_to.send(Err(MonitorError::NotFound(id)));
            return;
        };

        let target = &self.targets[index];
        let Some(last_response) = target.last_response.clone() else {
            let _ = respond_to.send(Ok(None));
            return;
        };

        let diagnoser = Arc::clone(&self.collaborators.diagnoser);
        let diagnosed_tx = self.diagnosed_tx.clone();
        let generation = self.generation_of(id);
        let address = target.address.clone();

        tokio::spawn(async move {
            let text = match diagnoser.diagnose(&address, &last_response).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(target_id = %id, "diagnosis failed: {e:#}");
                    DIAGNOSIS_FAILED.to_string()
                }
            };

            let _ = diagnosed_tx
                .send(DiagnosisCompleted {
                    id,
                    generation,
                    text,
                    respond_to,
                })
                .await;
        });
    }

    fn set_interval(&mut self, interval_secs: u64) {
        self.settings.interval = interval_secs.max(1);
        debug!("global interval set to {}s", self.settings.interval);

        // Targets with a running probe are re-armed when it completes
        let in_flight = &self.in_flight;
        self.scheduler.schedule(
            self.targets
                .iter()
                .filter(|target| !in_flight.contains_key(&target.id)),
            self.settings.interval,
        );
        self.publish_snapshot();
    }

    // Probe lifecycle

    fn dispatch(&mut self, index: usize, origin: ProbeOrigin) {
        let id = self.targets[index].id;
        let generation = self.generation_of(id);

        self.in_flight.insert(id, generation);
        let target = &mut self.targets[index];
        if !target.paused {
            target.status = Status::Checking;
        }

        trace!(target_id = %id, ?origin, "dispatching probe");

        let probe = Arc::clone(&self.collaborators.probe);
        let snapshot = target.clone();
        let completed_tx = self.completed_tx.clone();

        tokio::spawn(async move {
            let result = guarded_probe(probe, snapshot).await;
            let _ = completed_tx
                .send(ProbeCompleted {
                    id,
                    generation,
                    origin,
                    result,
                })
                .await;
        });
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        if !self.scheduler.take_fired(&fired) {
            trace!(target_id = %fired.id, "ignoring stale timer");
            return;
        }

        let Some(index) = self.index_of(fired.id) else {
            return;
        };
        if self.targets[index].paused {
            return;
        }
        if self.in_flight.contains_key(&fired.id) {
            debug!(target_id = %fired.id, "probe still running, skipping timer");
            return;
        }

        self.dispatch(index, ProbeOrigin::Timer);
        self.publish_snapshot();
    }

    async fn handle_completion(&mut self, done: ProbeCompleted) {
        if self.in_flight.get(&done.id) == Some(&done.generation) {
            self.in_flight.remove(&done.id);
        }

        let Some(index) = self.index_of(done.id) else {
            trace!(target_id = %done.id, "dropping result for deleted target");
            self.reprobe_pending.remove(&done.id);
            return;
        };
        if self.generation_of(done.id) != done.generation {
            trace!(target_id = %done.id, "dropping result from superseded configuration");
            if self.reprobe_pending.remove(&done.id) && !self.targets[index].paused {
                self.dispatch(index, ProbeOrigin::Immediate);
                self.publish_snapshot();
            }
            return;
        }

        trace!(target_id = %done.id, origin = ?done.origin, "recording probe result");

        let recorded = history::record(
            self.targets[index].clone(),
            &done.result,
            &self.settings.history,
        );
        self.targets[index] = recorded.target;
        self.persist(index).await;

        let target = &self.targets[index];
        let _ = self.event_tx.send(MonitorEvent::ProbeRecorded {
            id: target.id,
            name: target.name.clone(),
            status: target.status,
            result: done.result.clone(),
        });

        if recorded.transitioned_down {
            warn!(target = %target.name, "target went down: {}", done.result.message);
            let _ = self.event_tx.send(MonitorEvent::WentDown {
                id: target.id,
                name: target.name.clone(),
                reason: done.result.message.clone(),
            });

            let notifier = Arc::clone(&self.collaborators.notifier);
            let down = target.clone();
            tokio::spawn(async move {
                notifier.notify_down(&down).await;
            });
        }

        if recorded.recovered {
            debug!(target = %target.name, "target recovered");
            let _ = self.event_tx.send(MonitorEvent::Recovered {
                id: target.id,
                name: target.name.clone(),
            });
        }

        let paused = target.paused;
        let after = Duration::from_secs(target.interval_or(self.settings.interval));

        if self.reprobe_pending.remove(&done.id) && !paused {
            self.dispatch(index, ProbeOrigin::Immediate);
        } else if !paused && !self.scheduler.is_armed(done.id) {
            self.scheduler.arm(done.id, after);
        }

        self.publish_snapshot();
    }

    async fn handle_diagnosis(&mut self, done: DiagnosisCompleted) {
        if done.text == DIAGNOSIS_FAILED {
            self.advise(format!("diagnosis failed for target {}", done.id));
        }

        if let Some(index) = self.index_of(done.id)
            && self.generation_of(done.id) == done.generation
        {
            self.targets[index].diagnosis = Some(done.text.clone());
            self.persist(index).await;
            self.publish_snapshot();
        }

        let _ = done.respond_to.send(Ok(Some(done.text)));
    }

    // External store changes

    async fn apply_delta(&mut self, delta: TargetDelta) {
        match delta {
            TargetDelta::Upserted(incoming) => self.merge_upsert(incoming),
            TargetDelta::Deleted(id) => {
                if self.remove(id) {
                    debug!(target_id = %id, "target removed externally");
                }
            }
            TargetDelta::Reordered(ids) => {
                let rank: HashMap<TargetId, usize> =
                    ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
                self.targets
                    .sort_by_key(|target| rank.get(&target.id).copied().unwrap_or(usize::MAX));
            }
        }
        self.publish_snapshot();
    }

    fn merge_upsert(&mut self, incoming: Target) {
        let spec = incoming.spec();

        let Some(index) = self.index_of(incoming.id) else {
            if let Err(e) = self.ensure_unique(&spec, None) {
                warn!("ignoring external target: {e}");
                self.advise(format!("ignoring external target: {e}"));
                return;
            }

            debug!(target_id = %incoming.id, "target added externally");
            let mut target = incoming;
            target.status = if target.paused {
                Status::Paused
            } else {
                Status::Idle
            };
            self.bump_generation(target.id);
            self.targets.push(target);

            let index = self.targets.len() - 1;
            if !self.targets[index].paused {
                self.probe_when_idle(index);
            }
            return;
        };

        let mut reprobe = false;

        if self.targets[index].spec() != spec {
            if let Err(e) = self.ensure_unique(&spec, Some(incoming.id)) {
                warn!("ignoring external edit: {e}");
                self.advise(format!("ignoring external edit: {e}"));
                return;
            }
            debug!(target_id = %incoming.id, "target edited externally");
            self.reconfigure(index, spec);
            reprobe = true;
        }

        if self.targets[index].paused != incoming.paused {
            self.set_paused(index, incoming.paused);
            reprobe = !incoming.paused;
        }

        if reprobe && !self.targets[index].paused {
            self.probe_when_idle(index);
        }
    }

    // Helpers

    fn reconfigure(&mut self, index: usize, spec: TargetSpec) {
        let id = self.targets[index].id;
        self.scheduler.cancel(id);
        self.reprobe_pending.remove(&id);
        self.bump_generation(id);
        self.targets[index].reconfigure(spec);
    }

    /// Probe now, or right after the probe that is already running
    fn probe_when_idle(&mut self, index: usize) {
        let id = self.targets[index].id;
        if self.in_flight.contains_key(&id) {
            trace!(target_id = %id, "probe in flight, deferring reprobe");
            self.reprobe_pending.insert(id);
        } else {
            self.dispatch(index, ProbeOrigin::Immediate);
        }
    }

    fn set_paused(&mut self, index: usize, paused: bool) {
        let target = &mut self.targets[index];
        target.paused = paused;
        if paused {
            target.status = Status::Paused;
            self.scheduler.cancel(target.id);
        } else {
            target.status = Status::Idle;
        }
    }

    fn remove(&mut self, id: TargetId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        // A running probe keeps its in-flight entry until its result is dropped
        self.targets.remove(index);
        self.scheduler.cancel(id);
        self.reprobe_pending.remove(&id);
        self.generations.remove(&id);
        true
    }

    fn ensure_unique(&self, spec: &TargetSpec, except: Option<TargetId>) -> Result<(), MonitorError> {
        let key = identity_key(&spec.address, spec.check.port());
        let taken = self
            .targets
            .iter()
            .filter(|target| Some(target.id) != except)
            .any(|target| identity_key(&target.address, target.check.port()) == key);

        if taken {
            return Err(MonitorError::DuplicateTarget {
                address: spec.address.clone(),
                port: spec.check.port(),
            });
        }
        Ok(())
    }

    async fn persist(&self, index: usize) {
        let target = &self.targets[index];
        if let Err(e) = self.collaborators.store.upsert_target(target).await {
            error!(target = %target.name, "failed to persist target: {e}");
            let message = format!("failed to persist target {}: {e}", target.name);
            self.advise(message);
        }
    }

    fn advise(&self, message: String) {
        let _ = self.event_tx.send(MonitorEvent::Advisory { message });
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(MonitorSnapshot {
            targets: self.targets.clone(),
            interval: self.settings.interval,
            taken_at: chrono::Utc::now(),
        });
    }

    fn index_of(&self, id: TargetId) -> Option<usize> {
        self.targets.iter().position(|target| target.id == id)
    }

    fn generation_of(&self, id: TargetId) -> u64 {
        self.generations.get(&id).copied().unwrap_or_default()
    }

    fn bump_generation(&mut self, id: TargetId) {
        self.next_generation += 1;
        self.generations.insert(id, self.next_generation);
    }
}

async fn next_delta(feed: &mut Option<mpsc::Receiver<TargetDelta>>) -> Option<TargetDelta> {
    match feed {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Handle for controlling the MonitorActor
///
/// Cheap to clone. Queries read the latest snapshot without a round trip to
/// the actor.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
    snapshot_rx: watch::Receiver<MonitorSnapshot>,
    event_tx: broadcast::Sender<MonitorEvent>,
}

impl MonitorHandle {
    /// Spawn the monitor with no external change feed
    pub fn spawn(settings: MonitorSettings, collaborators: Collaborators) -> Self {
        Self::spawn_with_feed(settings, collaborators, None)
    }

    /// Spawn the monitor, merging deltas from `feed` into its state
    pub fn spawn_with_feed(
        settings: MonitorSettings,
        collaborators: Collaborators,
        feed: Option<mpsc::Receiver<TargetDelta>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(MonitorSnapshot {
            interval: settings.interval,
            ..MonitorSnapshot::default()
        });
        let (event_tx, _) = broadcast::channel(256);

        let actor = MonitorActor::new(
            settings,
            collaborators,
            cmd_rx,
            feed,
            snapshot_tx,
            event_tx.clone(),
        );
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            snapshot_rx,
            event_tx,
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> MonitorCommand,
    ) -> Result<T, MonitorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| MonitorError::ActorStopped)?;
        rx.await.map_err(|_| MonitorError::ActorStopped)?
    }

    pub async fn add_target(&self, spec: TargetSpec) -> Result<TargetId, MonitorError> {
        self.request(|respond_to| MonitorCommand::AddTarget { spec, respond_to })
            .await
    }

    pub async fn edit_target(&self, id: TargetId, spec: TargetSpec) -> Result<(), MonitorError> {
        self.request(|respond_to| MonitorCommand::EditTarget {
            id,
            spec,
            respond_to,
        })
        .await
    }

    pub async fn delete_target(&self, id: TargetId) -> Result<(), MonitorError> {
        self.request(|respond_to| MonitorCommand::DeleteTarget { id, respond_to })
            .await
    }

    /// Returns false when nothing moved
    pub async fn move_target(&self, id: TargetId, direction: Direction) -> Result<bool, MonitorError> {
        self.request(|respond_to| MonitorCommand::MoveTarget {
            id,
            direction,
            respond_to,
        })
        .await
    }

    /// Returns the status after the toggle: `Paused` or `Idle`
    pub async fn toggle_pause(&self, id: TargetId) -> Result<Status, MonitorError> {
        self.request(|respond_to| MonitorCommand::TogglePause { id, respond_to })
            .await
    }

    /// Returns false when a probe for the target is already running
    pub async fn check_now(&self, id: TargetId) -> Result<bool, MonitorError> {
        self.request(|respond_to| MonitorCommand::CheckNow { id, respond_to })
            .await
    }

    pub async fn request_diagnosis(&self, id: TargetId) -> Result<Option<String>, MonitorError> {
        self.request(|respond_to| MonitorCommand::RequestDiagnosis { id, respond_to })
            .await
    }

    pub async fn set_global_interval(&self, interval_secs: u64) -> Result<(), MonitorError> {
        self.sender
            .send(MonitorCommand::SetInterval { interval_secs })
            .await
            .map_err(|_| MonitorError::ActorStopped)
    }

    /// Latest published state
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that is notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    /// Shutdown the actor gracefully
    pub async fn shutdown(&self) {
        let _ = self.sender.send(MonitorCommand::Shutdown).await;
    }
}
