//! Target lifecycle through the monitor handle
//!
//! These tests verify that:
//! - Adding, editing, deleting, pausing and reordering update the snapshot and the store
//! - Timers drive periodic probes at the configured interval
//! - Down notifications fire exactly once per Up → Down transition
//! - Diagnosis results (and failures) are recorded on the target
//! - External store changes are merged into the running monitor

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use uptime_monitoring::{
    actors::{Collaborators, Direction, MonitorError, MonitorEvent, MonitorHandle, MonitorSettings},
    diagnosis::DIAGNOSIS_FAILED,
    probe::ProbeResult,
    storage::{MemoryStore, StorageError, StorageResult, HealthStatus, TargetDelta, TargetStore},
    target::{CheckKind, ProbeStatus, Status, Target, TargetId},
};

use crate::helpers::*;

fn settings(interval: u64) -> MonitorSettings {
    MonitorSettings {
        interval,
        ..MonitorSettings::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_edit_resets_history_and_reprobes() {
    let probe = ScriptedProbe::new(vec![
        ProbeResult::up(10, "HTTP 200 OK"),
        ProbeResult::down("HTTP 503 Service Unavailable"),
        ProbeResult::up(20, "HTTP 200 OK"),
    ]);
    let store = Arc::new(MemoryStore::new());
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(probe.clone()).with_store(store.clone()),
    );

    let id = handle.add_target(http_spec("old.example.com")).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;

    handle.check_now(id).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Down)).await;

    handle
        .edit_target(id, http_spec("new.example.com"))
        .await
        .unwrap();
    let snapshot = wait_for(&handle, |s| {
        s.target(id).is_some_and(|t| t.status == Status::Up)
    })
    .await;

    let target = snapshot.target(id).unwrap();
    assert_eq!(target.address, "new.example.com");
    assert_eq!(target.status_history.len(), 1);
    assert_eq!(target.latency_history.len(), 1);
    assert_eq!(target.last_down_time, None);
    assert_eq!(probe.calls(), 3);

    let stored = store.list_targets().await.unwrap();
    assert_eq!(stored[0].address, "new.example.com");
}

#[tokio::test]
async fn test_edit_rejects_duplicate() {
    let handle = MonitorHandle::spawn(settings(60), Collaborators::new(ScriptedProbe::always_up()));

    handle.add_target(http_spec("a.example.com")).await.unwrap();
    let b = handle.add_target(http_spec("b.example.com")).await.unwrap();

    let err = handle
        .edit_target(b, http_spec("A.example.com"))
        .await
        .unwrap_err();
    assert_matches!(err, MonitorError::DuplicateTarget { .. });

    // Same address on different ports is allowed for port checks
    let port_spec = |port| uptime_monitoring::target::TargetSpec {
        check: CheckKind::TcpPort { port: Some(port) },
        ..http_spec("db.example.com")
    };
    handle.add_target(port_spec(5432)).await.unwrap();
    handle.add_target(port_spec(6379)).await.unwrap();
    assert_matches!(
        handle.add_target(port_spec(5432)).await,
        Err(MonitorError::DuplicateTarget { port: Some(5432), .. })
    );
}

#[tokio::test]
async fn test_same_host_on_different_url_ports_is_not_duplicate() {
    let handle = MonitorHandle::spawn(settings(60), Collaborators::new(ScriptedProbe::always_up()));

    handle.add_target(http_spec("http://example.com:8080")).await.unwrap();
    handle.add_target(http_spec("http://example.com:9090")).await.unwrap();
    assert_eq!(handle.snapshot().targets.len(), 2);

    assert_matches!(
        handle.add_target(http_spec("http://EXAMPLE.com:8080/")).await,
        Err(MonitorError::DuplicateTarget { port: None, .. })
    );
}

#[tokio::test]
async fn test_delete_removes_from_snapshot_and_store() {
    let store = Arc::new(MemoryStore::new());
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(ScriptedProbe::always_up()).with_store(store.clone()),
    );

    let id = handle.add_target(http_spec("example.com")).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;

    handle.delete_target(id).await.unwrap();

    assert!(handle.snapshot().targets.is_empty());
    assert!(store.list_targets().await.unwrap().is_empty());
    assert_eq!(
        handle.delete_target(id).await,
        Err(MonitorError::NotFound(id))
    );
}

#[tokio::test(start_paused = true)]
async fn test_timer_probes_at_target_interval() {
    let probe = ScriptedProbe::always_up();
    let handle = MonitorHandle::spawn(settings(60), Collaborators::new(probe.clone()));

    let id = handle.add_target(timed_spec("example.com", 10)).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;

    tokio::time::sleep(Duration::from_secs(35)).await;

    // Immediate probe plus firings at 10s, 20s and 30s
    assert_eq!(probe.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_pause_stops_probing_and_resume_probes_immediately() {
    let probe = ScriptedProbe::always_up();
    let store = Arc::new(MemoryStore::new());
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(probe.clone()).with_store(store.clone()),
    );

    let id = handle.add_target(timed_spec("example.com", 5)).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;

    assert_eq!(handle.toggle_pause(id).await.unwrap(), Status::Paused);
    let calls = probe.calls();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(probe.calls(), calls);
    assert_eq!(handle.snapshot().target(id).unwrap().status, Status::Paused);
    assert!(store.list_targets().await.unwrap()[0].paused);

    assert_eq!(handle.toggle_pause(id).await.unwrap(), Status::Idle);
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;
    assert_eq!(probe.calls(), calls + 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_check_on_paused_target_keeps_paused_status() {
    let probe = ScriptedProbe::new(vec![
        ProbeResult::up(10, "HTTP 200 OK"),
        ProbeResult::down("HTTP 500 Internal Server Error"),
    ]);
    let handle = MonitorHandle::spawn(settings(60), Collaborators::new(probe.clone()));

    let id = handle.add_target(http_spec("example.com")).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;
    handle.toggle_pause(id).await.unwrap();

    assert!(handle.check_now(id).await.unwrap());
    let snapshot = wait_for(&handle, |s| {
        s.target(id).is_some_and(|t| t.status_history.len() == 2)
    })
    .await;

    let target = snapshot.target(id).unwrap();
    assert_eq!(target.status, Status::Paused);
    assert_eq!(target.last_event_status(), Some(ProbeStatus::Down));
}

#[tokio::test]
async fn test_move_skips_paused_targets() {
    let handle = MonitorHandle::spawn(settings(60), Collaborators::new(ScriptedProbe::always_up()));

    let a = handle.add_target(http_spec("a.example.com")).await.unwrap();
    let b = handle.add_target(http_spec("b.example.com")).await.unwrap();
    let c = handle.add_target(http_spec("c.example.com")).await.unwrap();
    handle.toggle_pause(b).await.unwrap();

    // Paused targets do not move
    assert!(!handle.move_target(b, Direction::Up).await.unwrap());
    // Boundaries are no-ops
    assert!(!handle.move_target(a, Direction::Up).await.unwrap());
    assert!(!handle.move_target(c, Direction::Down).await.unwrap());

    // c swaps with a, jumping over the paused b
    assert!(handle.move_target(c, Direction::Up).await.unwrap());

    let order: Vec<TargetId> = handle.snapshot().targets.iter().map(|t| t.id).collect();
    assert_eq!(order, vec![c, b, a]);
}

#[tokio::test(start_paused = true)]
async fn test_notification_once_per_down_transition() {
    let probe = ScriptedProbe::new(vec![
        ProbeResult::up(10, "HTTP 200 OK"),
        ProbeResult::down("HTTP 502 Bad Gateway"),
        ProbeResult::down("HTTP 502 Bad Gateway"),
        ProbeResult::up(12, "HTTP 200 OK"),
        ProbeResult::down("connection refused"),
    ]);
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(probe.clone()).with_notifier(notifier.clone()),
    );

    let id = handle.add_target(timed_spec("example.com", 1)).await.unwrap();
    // Script plus a few repeats of the final Down
    tokio::time::sleep(Duration::from_secs(8)).await;
    assert!(probe.calls() >= 7);

    assert_eq!(notifier.count(), 2);

    let snapshot = handle.snapshot();
    let target = snapshot.target(id).unwrap();
    let statuses: Vec<ProbeStatus> = target.status_history.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            ProbeStatus::Up,
            ProbeStatus::Down,
            ProbeStatus::Up,
            ProbeStatus::Down
        ]
    );
    assert_eq!(target.status_history.back().unwrap().reason, "connection refused");
}

#[tokio::test(start_paused = true)]
async fn test_initial_down_is_not_a_transition() {
    let probe = ScriptedProbe::new(vec![ProbeResult::down("HTTP 500 Internal Server Error")]);
    let notifier = Arc::new(RecordingNotifier::default());
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(probe.clone()).with_notifier(notifier.clone()),
    );

    let id = handle.add_target(timed_spec("example.com", 1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = handle.snapshot();
    let target = snapshot.target(id).unwrap();
    assert_eq!(target.status, Status::Down);
    assert_eq!(target.status_history.len(), 1);
    assert_eq!(target.last_down_time, None);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_went_down_and_recovered_events() {
    let probe = ScriptedProbe::new(vec![
        ProbeResult::up(10, "HTTP 200 OK"),
        ProbeResult::down("HTTP 503 Service Unavailable"),
        ProbeResult::up(10, "HTTP 200 OK"),
    ]);
    let handle = MonitorHandle::spawn(settings(60), Collaborators::new(probe.clone()));
    let mut events = handle.events();

    let id = handle.add_target(http_spec("example.com")).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;
    handle.check_now(id).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Down)).await;
    handle.check_now(id).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;

    let mut went_down = 0;
    let mut recovered = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            MonitorEvent::WentDown { reason, .. } => {
                assert_eq!(reason, "HTTP 503 Service Unavailable");
                went_down += 1;
            }
            MonitorEvent::Recovered { .. } => recovered += 1,
            _ => {}
        }
    }
    assert_eq!((went_down, recovered), (1, 1));
}

#[tokio::test]
async fn test_diagnosis_is_recorded() {
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(ScriptedProbe::new(vec![ProbeResult::down("HTTP 502 Bad Gateway")]))
            .with_diagnoser(Arc::new(FixedDiagnoser(Some("upstream crashed".to_string())))),
    );

    let id = handle.add_target(http_spec("example.com")).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Down)).await;

    let text = handle.request_diagnosis(id).await.unwrap();
    assert_eq!(text.as_deref(), Some("upstream crashed"));

    let snapshot = handle.snapshot();
    assert_eq!(
        snapshot.target(id).unwrap().diagnosis.as_deref(),
        Some("upstream crashed")
    );
}

#[tokio::test]
async fn test_failed_diagnosis_records_fallback() {
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(ScriptedProbe::new(vec![ProbeResult::down("HTTP 502 Bad Gateway")]))
            .with_diagnoser(Arc::new(FixedDiagnoser(None))),
    );
    let mut events = handle.events();

    let id = handle.add_target(http_spec("example.com")).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Down)).await;

    let text = handle.request_diagnosis(id).await.unwrap();
    assert_eq!(text.as_deref(), Some(DIAGNOSIS_FAILED));
    assert_eq!(
        handle.snapshot().target(id).unwrap().diagnosis.as_deref(),
        Some(DIAGNOSIS_FAILED)
    );

    let mut advised = false;
    while let Ok(event) = events.try_recv() {
        if let MonitorEvent::Advisory { .. } = event {
            advised = true;
        }
    }
    assert!(advised);
}

#[tokio::test]
async fn test_diagnosis_without_response_is_noop() {
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(SlowProbe::new(Duration::from_secs(30)))
            .with_diagnoser(Arc::new(FixedDiagnoser(Some("unused".to_string())))),
    );

    let id = handle.add_target(http_spec("example.com")).await.unwrap();
    assert_eq!(handle.request_diagnosis(id).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_global_interval_change_reschedules() {
    let probe = ScriptedProbe::always_up();
    let handle = MonitorHandle::spawn(settings(3600), Collaborators::new(probe.clone()));

    let id = handle.add_target(http_spec("example.com")).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(probe.calls(), 1);

    handle.set_global_interval(5).await.unwrap();
    tokio::time::sleep(Duration::from_secs(12)).await;

    assert_eq!(probe.calls(), 3);
    assert_eq!(handle.snapshot().interval, 5);
}

#[tokio::test]
async fn test_targets_loaded_from_store() {
    let mut paused = Target::new(http_spec("paused.example.com"));
    paused.paused = true;
    paused.status = Status::Paused;
    let mut stale = Target::new(http_spec("stale.example.com"));
    stale.status = Status::Checking;

    let store = Arc::new(MemoryStore::with_targets(vec![stale.clone(), paused.clone()]));
    let probe = ScriptedProbe::always_up();
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(probe.clone()).with_store(store),
    );

    let snapshot = wait_for(&handle, |s| {
        s.target(stale.id).is_some_and(|t| t.status == Status::Up)
    })
    .await;

    assert_eq!(snapshot.targets.len(), 2);
    assert_eq!(snapshot.targets[0].id, stale.id);
    assert_eq!(snapshot.target(paused.id).unwrap().status, Status::Paused);
    assert_eq!(probe.calls(), 1);
}

#[tokio::test]
async fn test_external_changes_are_merged() {
    let (feed_tx, feed_rx) = mpsc::channel(8);
    let probe = ScriptedProbe::always_up();
    let handle = MonitorHandle::spawn_with_feed(
        settings(60),
        Collaborators::new(probe.clone()),
        Some(feed_rx),
    );

    let local = handle.add_target(http_spec("local.example.com")).await.unwrap();

    let remote = Target::new(http_spec("remote.example.com"));
    feed_tx.send(TargetDelta::Upserted(remote.clone())).await.unwrap();
    wait_for(&handle, |s| {
        s.target(remote.id).is_some_and(|t| t.status == Status::Up)
    })
    .await;

    feed_tx
        .send(TargetDelta::Reordered(vec![remote.id, local]))
        .await
        .unwrap();
    wait_for(&handle, |s| s.targets.first().is_some_and(|t| t.id == remote.id)).await;

    let mut edited = remote.clone();
    edited.address = "moved.example.com".to_string();
    feed_tx.send(TargetDelta::Upserted(edited)).await.unwrap();
    let snapshot = wait_for(&handle, |s| {
        s.target(remote.id)
            .is_some_and(|t| t.address == "moved.example.com" && t.status == Status::Up)
    })
    .await;
    assert_eq!(snapshot.target(remote.id).unwrap().status_history.len(), 1);

    feed_tx.send(TargetDelta::Deleted(remote.id)).await.unwrap();
    let snapshot = wait_for(&handle, |s| s.targets.len() == 1).await;
    assert_eq!(snapshot.targets[0].id, local);
}

/// Store whose writes always fail
struct BrokenStore;

#[async_trait]
impl TargetStore for BrokenStore {
    async fn list_targets(&self) -> StorageResult<Vec<Target>> {
        Ok(vec![])
    }

    async fn upsert_target(&self, _target: &Target) -> StorageResult<()> {
        Err(StorageError::QueryFailed("disk full".to_string()))
    }

    async fn delete_target(&self, _id: TargetId) -> StorageResult<bool> {
        Err(StorageError::QueryFailed("disk full".to_string()))
    }

    async fn reorder(&self, _ids: &[TargetId]) -> StorageResult<()> {
        Err(StorageError::QueryFailed("disk full".to_string()))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Err(StorageError::UnhealthyBackend("disk full".to_string()))
    }

    async fn get_stats(&self) -> StorageResult<String> {
        Ok("broken".to_string())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_store_failure_is_advisory() {
    let handle = MonitorHandle::spawn(
        settings(60),
        Collaborators::new(ScriptedProbe::always_up()).with_store(Arc::new(BrokenStore)),
    );
    let mut events = handle.events();

    let id = handle.add_target(http_spec("example.com")).await.unwrap();
    wait_for(&handle, |s| s.target(id).is_some_and(|t| t.status == Status::Up)).await;

    let event = events.recv().await.unwrap();
    assert_matches!(event, MonitorEvent::Advisory { message } if message.contains("disk full"));
}
