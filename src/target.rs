//! Monitored targets and their rolling health state
//!
//! A [`Target`] bundles the user-facing configuration of one endpoint with
//! everything the monitor derives from probing it: current status, bounded
//! latency and status histories, and the uptime / latency aggregates computed
//! from those histories.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identity of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(Uuid);

impl TargetId {
    /// Generate a fresh, unique id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TargetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// HTTP method used for HTTP-kind checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Head,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// Which protocol check to run, together with its protocol-specific parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckKind {
    /// Plain HTTP(S) status check
    Http {
        #[serde(default)]
        method: HttpMethod,
    },

    /// HTTP(S) check classified by keyword presence in the body
    HttpKeyword {
        #[serde(default)]
        method: HttpMethod,
        keyword: String,
    },

    /// Raw TCP connect to `port`
    ///
    /// A missing port is a configuration error reported by the probe.
    TcpPort { port: Option<u16> },

    /// Reachability check approximated by a TCP connect to 443/80
    Ping,

    /// Intentional maintenance window, always reported down without I/O
    ScheduledDowntime,
}

impl CheckKind {
    /// Port participating in duplicate detection, if this kind carries one
    pub fn port(&self) -> Option<u16> {
        match self {
            CheckKind::TcpPort { port } => *port,
            _ => None,
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, CheckKind::Http { .. } | CheckKind::HttpKeyword { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CheckKind::Http { .. } => "HTTP",
            CheckKind::HttpKeyword { .. } => "HTTP-Keyword",
            CheckKind::TcpPort { .. } => "TCP-Port",
            CheckKind::Ping => "Ping",
            CheckKind::ScheduledDowntime => "Scheduled-Downtime",
        }
    }
}

/// Current status of a target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Never probed, or no probe has returned yet
    #[default]
    Idle,
    /// Probe in flight
    Checking,
    Up,
    Down,
    /// Excluded from scheduling
    Paused,
}

/// Terminal outcome of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl From<ProbeStatus> for Status {
    fn from(status: ProbeStatus) -> Self {
        match status {
            ProbeStatus::Up => Status::Up,
            ProbeStatus::Down => Status::Down,
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Up => f.write_str("up"),
            ProbeStatus::Down => f.write_str("down"),
        }
    }
}

/// One timed measurement; `latency_ms == 0` means no valid timing (down)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySample {
    pub timestamp: DateTime<Utc>,
    pub latency_ms: u64,
}

/// A recorded status-change point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub timestamp: DateTime<Utc>,
    pub status: ProbeStatus,
    pub latency_ms: u64,
    pub reason: String,
}

/// Uptime percentages and latency aggregates derived from the histories
///
/// Every field is `None` when its input window is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub uptime_1h: Option<f64>,
    pub uptime_24h: Option<f64>,
    pub uptime_30d: Option<f64>,
    pub uptime_all: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub min_latency_ms: Option<u64>,
    pub max_latency_ms: Option<u64>,
}

/// User-supplied configuration of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub address: String,
    pub check: CheckKind,

    /// Per-target polling interval in seconds (falls back to the global default)
    #[serde(default)]
    pub interval: Option<u64>,
}

/// A monitored endpoint plus its configuration and rolling health state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub name: String,
    pub address: String,
    pub check: CheckKind,
    pub interval: Option<u64>,
    pub paused: bool,

    pub status: Status,
    /// Latency of the last completed probe
    pub latency_ms: u64,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_down_time: Option<DateTime<Utc>>,
    /// Response text of the last completed probe
    pub last_response: Option<String>,
    /// Time to first byte of the last HTTP `Up` probe (-1 when the measurement failed)
    pub ttfb_ms: Option<i64>,
    pub diagnosis: Option<String>,

    pub latency_history: VecDeque<LatencySample>,
    pub status_history: VecDeque<StatusEvent>,
    pub metrics: DerivedMetrics,
}

impl Target {
    /// Create a fresh target in `Idle` state with empty histories
    pub fn new(spec: TargetSpec) -> Self {
        let TargetSpec {
            name,
            address,
            check,
            interval,
        } = spec;

        Self {
            id: TargetId::new(),
            name,
            address,
            check,
            interval,
            paused: false,
            status: Status::Idle,
            latency_ms: 0,
            last_checked: None,
            last_down_time: None,
            last_response: None,
            ttfb_ms: None,
            diagnosis: None,
            latency_history: VecDeque::new(),
            status_history: VecDeque::new(),
            metrics: DerivedMetrics::default(),
        }
    }

    /// Replace the configuration and forget everything derived from the old one
    ///
    /// The id and the position in the target list are kept.
    pub fn reconfigure(&mut self, spec: TargetSpec) {
        let id = self.id;
        let paused = self.paused;
        *self = Target::new(spec);
        self.id = id;
        self.paused = paused;
        if paused {
            self.status = Status::Paused;
        }
    }

    pub fn spec(&self) -> TargetSpec {
        TargetSpec {
            name: self.name.clone(),
            address: self.address.clone(),
            check: self.check.clone(),
            interval: self.interval,
        }
    }

    /// Effective polling interval in seconds
    pub fn interval_or(&self, global: u64) -> u64 {
        self.interval.unwrap_or(global).max(1)
    }

    /// Status of the most recent status-change event, if any
    pub fn last_event_status(&self) -> Option<ProbeStatus> {
        self.status_history.back().map(|event| event.status)
    }
}
