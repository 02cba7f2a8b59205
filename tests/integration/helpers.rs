//! Helper types for integration tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uptime_monitoring::{
    actors::{MonitorHandle, MonitorSnapshot},
    diagnosis::Diagnoser,
    notify::Notifier,
    probe::{Probe, ProbeResult},
    target::{CheckKind, HttpMethod, Target, TargetSpec},
};

pub fn http_spec(address: &str) -> TargetSpec {
    TargetSpec {
        name: address.to_string(),
        address: address.to_string(),
        check: CheckKind::Http {
            method: HttpMethod::Get,
        },
        interval: None,
    }
}

pub fn keyword_spec(address: &str, keyword: &str) -> TargetSpec {
    TargetSpec {
        check: CheckKind::HttpKeyword {
            method: HttpMethod::Get,
            keyword: keyword.to_string(),
        },
        ..http_spec(address)
    }
}

pub fn timed_spec(address: &str, interval: u64) -> TargetSpec {
    TargetSpec {
        interval: Some(interval),
        ..http_spec(address)
    }
}

/// Wait until the published snapshot satisfies `condition`
pub async fn wait_for(
    handle: &MonitorHandle,
    condition: impl FnMut(&MonitorSnapshot) -> bool,
) -> MonitorSnapshot {
    let mut rx = handle.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(30), rx.wait_for(condition))
        .await
        .expect("timed out waiting for snapshot")
        .expect("monitor stopped");
    snapshot.clone()
}

/// Probe that replays a script of results; the last one repeats forever
pub struct ScriptedProbe {
    script: Mutex<VecDeque<ProbeResult>>,
    last: Mutex<ProbeResult>,
    pub calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(script: Vec<ProbeResult>) -> Arc<Self> {
        let last = script
            .last()
            .cloned()
            .unwrap_or_else(|| ProbeResult::up(10, "HTTP 200 OK"));
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always_up() -> Arc<Self> {
        Self::new(vec![ProbeResult::up(10, "HTTP 200 OK")])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, _target: &Target) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let mut result = match next {
            Some(result) => result,
            None => self.last.lock().unwrap().clone(),
        };
        result.observed_at = chrono::Utc::now();
        result
    }
}

/// Probe that takes `delay` and tracks how many probes overlap
pub struct SlowProbe {
    delay: Duration,
    running: AtomicUsize,
    pub max_running: AtomicUsize,
    pub calls: AtomicUsize,
}

impl SlowProbe {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Probe for SlowProbe {
    async fn probe(&self, target: &Target) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        // Echo the probed address so tests can tell configurations apart
        ProbeResult::up(self.delay.as_millis() as u64, target.address.clone())
    }
}

pub struct PanickingProbe;

#[async_trait]
impl Probe for PanickingProbe {
    async fn probe(&self, _target: &Target) -> ProbeResult {
        panic!("boom")
    }
}

/// Notifier that remembers which targets it was told about
#[derive(Default)]
pub struct RecordingNotifier {
    pub notified: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.notified.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_down(&self, target: &Target) {
        self.notified.lock().unwrap().push(target.name.clone());
    }
}

pub struct FixedDiagnoser(pub Option<String>);

#[async_trait]
impl Diagnoser for FixedDiagnoser {
    async fn diagnose(&self, _url: &str, _last_response: &str) -> anyhow::Result<String> {
        match &self.0 {
            Some(text) => Ok(text.clone()),
            None => anyhow::bail!("service unavailable"),
        }
    }
}
