//! Pipeline metrics (§4.10 step 17), adapted from the gateway's
//! `GatewayMetrics`: plain atomics instead of a single struct behind a
//! `RwLock`, since every counter here is independent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct GatewayMetrics {
    pub total_requests: AtomicU64,
    pub successful_requests: AtomicU64,
    pub failed_requests: AtomicU64,
    pub total_duration_ms: AtomicU64,
    pub auth_failures: AtomicU64,
    pub authz_failures: AtomicU64,
    pub rate_limit_hits: AtomicU64,
    pub upstream_timeouts: AtomicU64,
    pub retries: AtomicU64,
}

impl GatewayMetrics {
    pub fn record_request(&self, status: u16, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_duration_ms.fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        if (200..400).contains(&status) {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_authz_failure(&self) {
        self.authz_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit_hit(&self) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_timeout(&self) {
        self.upstream_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            authz_failures: self.authz_failures.load(Ordering::Relaxed),
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub auth_failures: u64,
    pub authz_failures: u64,
    pub rate_limit_hits: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_and_failed_requests_are_bucketed_separately() {
        let metrics = GatewayMetrics::default();
        metrics.record_request(200, Duration::from_millis(5));
        metrics.record_request(500, Duration::from_millis(5));
        let snap = metrics.snapshot();
        assert_eq!(snap.successful_requests, 1);
        assert_eq!(snap.failed_requests, 1);
    }
}
