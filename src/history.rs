//! History tracking and derived metrics
//!
//! [`record`] folds one probe result into a target's state:
//!
//! ```text
//! LatencySample  → always appended, capped (FIFO eviction)
//! StatusEvent    → appended only when the status differs from the last event, capped
//! last_down_time → set only on an Up → Down edge
//! metrics        → recomputed from the histories
//! ```
//!
//! The function is pure: it takes the prior target by value and returns the
//! updated one, so the orchestrator can apply it as a single atomic replace.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::config::HistoryLimits;
use crate::probe::ProbeResult;
use crate::target::{DerivedMetrics, LatencySample, ProbeStatus, Status, StatusEvent, Target};

/// Result of folding a probe into a target
#[derive(Debug, Clone)]
pub struct Recorded {
    pub target: Target,

    /// True exactly on an Up → Down transition
    pub transitioned_down: bool,

    /// True exactly on a Down → Up transition
    pub recovered: bool,
}

/// Fold a probe result into the target's history
pub fn record(mut target: Target, result: &ProbeResult, limits: &HistoryLimits) -> Recorded {
    let previous = target.last_event_status();
    let now = result.observed_at;

    push_capped(
        &mut target.latency_history,
        LatencySample {
            timestamp: now,
            latency_ms: result.latency_ms,
        },
        limits.latency_samples,
    );

    if previous != Some(result.status) {
        push_capped(
            &mut target.status_history,
            StatusEvent {
                timestamp: now,
                status: result.status,
                latency_ms: result.latency_ms,
                reason: result.message.clone(),
            },
            limits.status_events,
        );
    }

    let transitioned_down =
        previous == Some(ProbeStatus::Up) && result.status == ProbeStatus::Down;
    let recovered = previous == Some(ProbeStatus::Down) && result.status == ProbeStatus::Up;

    if transitioned_down {
        target.last_down_time = Some(now);
    }

    // Results landing on a paused target keep it paused
    if !target.paused {
        target.status = Status::from(result.status);
    }
    target.latency_ms = result.latency_ms;
    target.last_checked = Some(now);
    target.last_response = Some(result.message.clone());
    if let Some(ttfb) = result.ttfb_ms {
        target.ttfb_ms = Some(ttfb);
    }

    target.metrics = compute_metrics(&target.status_history, &target.latency_history, now);

    Recorded {
        target,
        transitioned_down,
        recovered,
    }
}

fn push_capped<T>(log: &mut VecDeque<T>, item: T, cap: usize) {
    log.push_back(item);
    while log.len() > cap {
        log.pop_front();
    }
}

/// Uptime over the events at or after `since` (all events when `None`)
pub fn uptime_percentage(
    events: &VecDeque<StatusEvent>,
    since: Option<DateTime<Utc>>,
) -> Option<f64> {
    let (total, up) = events
        .iter()
        .filter(|event| since.is_none_or(|since| event.timestamp >= since))
        .fold((0usize, 0usize), |(total, up), event| {
            (total + 1, up + usize::from(event.status == ProbeStatus::Up))
        });

    if total == 0 {
        None
    } else {
        Some(up as f64 / total as f64 * 100.0)
    }
}

/// Recompute all derived metrics relative to `now`
pub fn compute_metrics(
    events: &VecDeque<StatusEvent>,
    samples: &VecDeque<LatencySample>,
    now: DateTime<Utc>,
) -> DerivedMetrics {
    let measured: Vec<u64> = samples
        .iter()
        .map(|sample| sample.latency_ms)
        .filter(|latency| *latency > 0)
        .collect();

    let avg_latency_ms = if measured.is_empty() {
        None
    } else {
        Some(measured.iter().sum::<u64>() as f64 / measured.len() as f64)
    };

    DerivedMetrics {
        uptime_1h: uptime_percentage(events, Some(now - Duration::hours(1))),
        uptime_24h: uptime_percentage(events, Some(now - Duration::hours(24))),
        uptime_30d: uptime_percentage(events, Some(now - Duration::days(30))),
        uptime_all: uptime_percentage(events, None),
        avg_latency_ms,
        min_latency_ms: measured.iter().copied().min(),
        max_latency_ms: measured.iter().copied().max(),
    }
}
