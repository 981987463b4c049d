use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    failures_total: AtomicU64,
    upstream_calls_total: AtomicU64,
    degraded_total: AtomicU64,
    cancelled_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub failures_total: u64,
    pub upstream_calls_total: u64,
    pub degraded_total: u64,
    pub cancelled_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self, intent: &'static str) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("travelmind_requests_total", "intent" => intent).increment(1);
    }

    pub fn inc_failure(&self, kind: &'static str) {
        self.failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("travelmind_failures_total", "kind" => kind).increment(1);
    }

    pub fn add_upstream_calls(&self, calls: usize) {
        self.upstream_calls_total
            .fetch_add(calls as u64, Ordering::Relaxed);
        metrics::counter!("travelmind_upstream_calls_total").increment(calls as u64);
    }

    pub fn inc_degraded(&self) {
        self.degraded_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("travelmind_degraded_responses_total").increment(1);
    }

    pub fn inc_cancelled(&self) {
        self.cancelled_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("travelmind_cancelled_requests_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        metrics::histogram!("travelmind_request_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            failures_total: self.failures_total.load(Ordering::Relaxed),
            upstream_calls_total: self.upstream_calls_total.load(Ordering::Relaxed),
            degraded_total: self.degraded_total.load(Ordering::Relaxed),
            cancelled_total: self.cancelled_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,travelmind_agents=info,travelmind_sources=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
