//! Protocol-specific health checks
//!
//! A probe runs exactly one check against one target and always produces a
//! [`ProbeResult`]. Every failure path (bad address, DNS, refused connection,
//! timeouts, protocol failures) is mapped to a `Down` result carrying a
//! diagnostic message instead of an error.
//!
//! ## Dispatch
//!
//! ```text
//! CheckKind::Http / HttpKeyword → HttpCheck
//! CheckKind::TcpPort            → TcpCheck
//! CheckKind::Ping               → PingCheck (TCP connect to 443/80)
//! CheckKind::ScheduledDowntime  → DowntimeCheck (no I/O)
//! ```
//!
//! New protocols are added as a new `CheckKind` variant plus a [`Check`]
//! implementation.

pub mod address;
pub mod http;
pub mod tcp;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::target::{CheckKind, ProbeStatus, Target};

pub use http::HttpCheck;
pub use tcp::{PingCheck, TcpCheck};

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status: ProbeStatus,

    /// Measured latency in milliseconds (`0` for down results)
    pub latency_ms: u64,

    /// Human-readable outcome or diagnostic
    pub message: String,

    pub observed_at: DateTime<Utc>,

    /// Final HTTP status code, for HTTP-kind checks that got a response
    pub http_status: Option<u16>,

    /// Time to first byte, measured after successful HTTP checks (-1 on failure)
    pub ttfb_ms: Option<i64>,
}

impl ProbeResult {
    /// Successful result; a measured latency never collapses onto the `0` down sentinel
    pub fn up(latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Up,
            latency_ms: latency_ms.max(1),
            message: message.into(),
            observed_at: Utc::now(),
            http_status: None,
            ttfb_ms: None,
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Down,
            latency_ms: 0,
            message: message.into(),
            observed_at: Utc::now(),
            http_status: None,
            ttfb_ms: None,
        }
    }

    pub fn with_http_status(mut self, code: u16) -> Self {
        self.http_status = Some(code);
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }
}

/// Runs one health check against one target
///
/// Implementations must not fail: every error is reported as a `Down` result.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &Target) -> ProbeResult;
}

/// One protocol-specific check implementation
#[async_trait]
pub trait Check: Send + Sync {
    async fn run(&self, target: &Target) -> ProbeResult;
}

/// Maintenance window: reports down without touching the network
pub struct DowntimeCheck;

#[async_trait]
impl Check for DowntimeCheck {
    async fn run(&self, _target: &Target) -> ProbeResult {
        ProbeResult::down("in scheduled downtime")
    }
}

/// The production probe, dispatching on the target's check kind
pub struct NetworkProbe {
    http: HttpCheck,
    tcp: TcpCheck,
    ping: PingCheck,
    downtime: DowntimeCheck,
}

impl NetworkProbe {
    /// Create a probe whose HTTP requests give up after `http_timeout`
    pub fn new(http_timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: HttpCheck::new(http_timeout)?,
            tcp: TcpCheck::default(),
            ping: PingCheck::default(),
            downtime: DowntimeCheck,
        })
    }

    fn check_for(&self, kind: &CheckKind) -> &dyn Check {
        match kind {
            CheckKind::Http { .. } | CheckKind::HttpKeyword { .. } => &self.http,
            CheckKind::TcpPort { .. } => &self.tcp,
            CheckKind::Ping => &self.ping,
            CheckKind::ScheduledDowntime => &self.downtime,
        }
    }
}

#[async_trait]
impl Probe for NetworkProbe {
    #[instrument(skip_all, fields(target = %target.name, kind = target.check.label()))]
    async fn probe(&self, target: &Target) -> ProbeResult {
        trace!("probing {}", target.address);

        let result = self.check_for(&target.check).run(target).await;

        trace!(
            "probe finished: {} in {}ms ({})",
            result.status, result.latency_ms, result.message
        );
        result
    }
}

/// Render an error together with its source chain on one line
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
