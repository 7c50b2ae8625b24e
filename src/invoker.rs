//! Resilient HTTP Invoker (C8, §4.8), adapted from the gateway's own
//! `CircuitBreaker` (`security/circuit_breaker.rs`): per-`api_key`
//! three-state breaker with single-probe half-open gating, full-jitter
//! exponential backoff.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::metrics::GatewayMetrics;
use dashmap::DashMap;
use rand::Rng;
use reqwest::{Method, StatusCode};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Breaker {
    state: BreakerState,
    failures: u32,
    opened_at: Instant,
    /// Set when a half-open probe is in flight; cleared on the probe's
    /// success/failure. Gates every concurrent caller but the first one
    /// behind `Open` (§4.8 step 1: "allow exactly one probing request").
    half_open_probe_in_flight: bool,
}

impl Breaker {
    fn new() -> Self {
        Self { state: BreakerState::Closed, failures: 0, opened_at: Instant::now(), half_open_probe_in_flight: false }
    }
}

pub struct Invoker {
    client: reqwest::Client,
    breakers: DashMap<String, Breaker>,
    cfg_enabled: bool,
    threshold: u32,
    cooldown: Duration,
    retry_base: Duration,
    retry_cap: Duration,
}

pub struct CallParams<'a> {
    pub api_key: &'a str,
    pub method: Method,
    pub url: String,
    pub headers: reqwest::header::HeaderMap,
    pub body: Vec<u8>,
    pub retries: u32,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
}

impl Invoker {
    pub fn new(cfg: &GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            breakers: DashMap::new(),
            cfg_enabled: cfg.circuit_breaker_enabled,
            threshold: cfg.circuit_breaker_threshold,
            cooldown: cfg.circuit_breaker_timeout,
            retry_base: cfg.http_retry_base_delay,
            retry_cap: cfg.http_retry_max_delay,
        }
    }

    /// `entry()` holds the shard's write lock for the scope of this call, so
    /// the half-open check-and-claim below is race-free without a separate
    /// atomic (mirrors `CircuitBreaker::allow_request`'s half-open counter).
    fn check_circuit(&self, key: &str) -> Result<()> {
        if !self.cfg_enabled {
            return Ok(());
        }
        let mut breaker = self.breakers.entry(key.to_string()).or_insert_with(Breaker::new);
        match breaker.state {
            BreakerState::Open => {
                if breaker.opened_at.elapsed() >= self.cooldown {
                    breaker.state = BreakerState::HalfOpen;
                    breaker.failures = 0;
                    breaker.half_open_probe_in_flight = true;
                    Ok(())
                } else {
                    Err(GatewayError::CircuitOpen(key.to_string()))
                }
            }
            BreakerState::HalfOpen => {
                if breaker.half_open_probe_in_flight {
                    Err(GatewayError::CircuitOpen(key.to_string()))
                } else {
                    breaker.half_open_probe_in_flight = true;
                    Ok(())
                }
            }
            BreakerState::Closed => Ok(()),
        }
    }

    fn record_success(&self, key: &str) {
        if let Some(mut breaker) = self.breakers.get_mut(key) {
            breaker.failures = 0;
            breaker.state = BreakerState::Closed;
            breaker.half_open_probe_in_flight = false;
        }
    }

    fn record_failure(&self, key: &str) {
        let mut breaker = self.breakers.entry(key.to_string()).or_insert_with(Breaker::new);
        breaker.failures += 1;
        match breaker.state {
            BreakerState::HalfOpen => {
                breaker.state = BreakerState::Open;
                breaker.opened_at = Instant::now();
                breaker.half_open_probe_in_flight = false;
            }
            BreakerState::Closed if breaker.failures >= self.threshold.max(1) => {
                breaker.state = BreakerState::Open;
                breaker.opened_at = Instant::now();
            }
            _ => {}
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let cap = self.retry_cap.as_secs_f64();
        let base = self.retry_base.as_secs_f64();
        let upper = (base * 2f64.powi(attempt as i32 - 1)).min(cap);
        let jittered = rand::rng().random_range(0.0..=upper.max(0.0));
        Duration::from_secs_f64(jittered)
    }

    pub async fn call(&self, params: CallParams<'_>, metrics: &GatewayMetrics) -> Result<reqwest::Response> {
        self.check_circuit(params.api_key)?;

        let attempts = params.retries + 1;
        let mut last_err: Option<GatewayError> = None;
        for attempt in 1..=attempts {
            if attempt > 1 {
                metrics.record_retry();
                tokio::time::sleep(self.backoff(attempt)).await;
            }
            // reqwest exposes connect timeout only at the client-builder
            // level, not per-request; `total_timeout` is the one budget
            // enforceable per call here.
            let request = self
                .client
                .request(params.method.clone(), &params.url)
                .headers(params.headers.clone())
                .body(params.body.clone())
                .timeout(params.total_timeout);

            match request.send().await {
                Ok(resp) if is_transient(resp.status()) && attempt < attempts => {
                    self.record_failure(params.api_key);
                    last_err = Some(GatewayError::UpstreamStatus(resp.status().as_u16()));
                    continue;
                }
                Ok(resp) if is_transient(resp.status()) => {
                    self.record_failure(params.api_key);
                    return Err(GatewayError::UpstreamStatus(resp.status().as_u16()));
                }
                Ok(resp) => {
                    self.record_success(params.api_key);
                    return Ok(resp);
                }
                Err(e) => {
                    self.record_failure(params.api_key);
                    if e.is_timeout() {
                        metrics.record_upstream_timeout();
                    }
                    last_err = Some(GatewayError::UpstreamUnreachable(e.to_string()));
                    if attempt == attempts {
                        return Err(last_err.unwrap());
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| GatewayError::UpstreamUnreachable(params.api_key.to_string())))
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_opens_after_threshold_failures() {
        let cfg = GatewayConfig::from_env();
        let invoker = Invoker::new(&cfg);
        invoker.check_circuit("svc").unwrap();
        for _ in 0..cfg.circuit_breaker_threshold {
            invoker.record_failure("svc");
        }
        assert!(invoker.check_circuit("svc").is_err());
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let mut cfg = GatewayConfig::from_env();
        cfg.circuit_breaker_timeout = Duration::from_millis(1);
        cfg.circuit_breaker_threshold = 1;
        let invoker = Invoker::new(&cfg);
        invoker.record_failure("svc");
        std::thread::sleep(Duration::from_millis(5));
        invoker.check_circuit("svc").unwrap();
        invoker.record_failure("svc");
        assert!(invoker.check_circuit("svc").is_err());
    }

    #[test]
    fn half_open_allows_exactly_one_probe() {
        let mut cfg = GatewayConfig::from_env();
        cfg.circuit_breaker_timeout = Duration::from_millis(1);
        cfg.circuit_breaker_threshold = 1;
        let invoker = Invoker::new(&cfg);
        invoker.record_failure("svc");
        std::thread::sleep(Duration::from_millis(5));
        invoker.check_circuit("svc").unwrap();
        // Second concurrent caller must fail fast instead of also probing.
        assert!(invoker.check_circuit("svc").is_err());
        invoker.record_success("svc");
        invoker.check_circuit("svc").unwrap();
    }

    #[test]
    fn backoff_never_exceeds_the_configured_cap() {
        let mut cfg = GatewayConfig::from_env();
        cfg.http_retry_max_delay = Duration::from_millis(200);
        let invoker = Invoker::new(&cfg);
        for attempt in 1..10 {
            assert!(invoker.backoff(attempt) <= Duration::from_millis(200));
        }
    }
}
