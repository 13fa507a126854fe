use hilvan_engine::scheduler::millis;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide counters for requests, commands and match progress.
///
/// Cloning is cheap; every clone shares the same counters.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time_ms: AtomicU64,
    active_sessions: AtomicU64,
    commands_applied: AtomicU64,
    commands_rejected: AtomicU64,
    rounds_resolved: AtomicU64,
    matches_completed: AtomicU64,
    events_broadcast: AtomicU64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub fn record_request(&self, duration_ms: u64, failed: bool) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.inner.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.inner
            .total_response_time_ms
            .fetch_add(duration_ms, Ordering::Relaxed);

        tracing::trace!(duration_ms, failed, "recorded request");
    }

    pub fn increment_active_sessions(&self) {
        let count = self.inner.active_sessions.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(active_sessions = count, "session count increased");
    }

    pub fn decrement_active_sessions(&self) {
        let mut current = self.inner.active_sessions.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                tracing::warn!("attempted to decrement active_sessions below zero");
                return;
            }

            match self.inner.active_sessions.compare_exchange(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    tracing::debug!(active_sessions = current - 1, "session count decreased");
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn record_command(&self, applied: bool) {
        let counter = if applied {
            &self.inner.commands_applied
        } else {
            &self.inner.commands_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_round_resolved(&self) {
        self.inner.rounds_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match_completed(&self) {
        let total = self.inner.matches_completed.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(matches_completed = total, "match completed");
    }

    pub fn record_event_broadcast(&self) {
        self.inner.events_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: load(&self.inner.total_requests),
            failed_requests: load(&self.inner.failed_requests),
            total_response_time_ms: load(&self.inner.total_response_time_ms),
            active_sessions: load(&self.inner.active_sessions),
            commands_applied: load(&self.inner.commands_applied),
            commands_rejected: load(&self.inner.commands_rejected),
            rounds_resolved: load(&self.inner.rounds_resolved),
            matches_completed: load(&self.inner.matches_completed),
            events_broadcast: load(&self.inner.events_broadcast),
        }
    }

    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            total_requests = snapshot.total_requests,
            failed_requests = snapshot.failed_requests,
            avg_response_time_ms = snapshot.average_response_time_ms(),
            active_sessions = snapshot.active_sessions,
            commands_applied = snapshot.commands_applied,
            commands_rejected = snapshot.commands_rejected,
            rounds_resolved = snapshot.rounds_resolved,
            matches_completed = snapshot.matches_completed,
            events_broadcast = snapshot.events_broadcast,
            "server metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub total_response_time_ms: u64,
    pub active_sessions: u64,
    pub commands_applied: u64,
    pub commands_rejected: u64,
    pub rounds_resolved: u64,
    pub matches_completed: u64,
    pub events_broadcast: u64,
}

impl MetricsSnapshot {
    pub fn average_response_time_ms(&self) -> u64 {
        if self.total_requests > 0 {
            self.total_response_time_ms / self.total_requests
        } else {
            0
        }
    }

    /// Share of player commands the engine applied.
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.commands_applied + self.commands_rejected;
        if total > 0 {
            self.commands_applied as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Times a request from construction to `finish`.
pub struct RequestTimer {
    start: Instant,
    metrics: MetricsCollector,
}

impl RequestTimer {
    pub fn new(metrics: MetricsCollector) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, failed: bool) -> u64 {
        let duration = millis(self.start.elapsed());
        self.metrics.record_request(duration, failed);
        duration
    }
}
