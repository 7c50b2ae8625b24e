//! Environment-driven configuration (§6, §10.2). Resolved once at startup
//! into an immutable value shared behind an `Arc`; nothing re-reads the
//! environment after construction.

use std::time::Duration;

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub request_timeout_secs: u64,

    pub jwt_secret_key: String,
    pub cookie_samesite: String,
    pub https_only: bool,
    pub https_enabled: bool,

    pub allowed_origins: Vec<String>,
    pub cors_strict: bool,

    pub local_host_ip_bypass: Option<bool>,
    pub allow_localhost_bypass: bool,
    pub trust_x_forwarded_for: bool,
    pub xff_trusted_proxies: Vec<String>,

    pub mem_encryption_key: Option<String>,
    pub mem_dump_path: Option<String>,

    pub http_connect_timeout: Duration,
    pub http_read_timeout: Duration,
    pub http_write_timeout: Duration,
    pub http_timeout: Duration,
    pub http_retry_base_delay: Duration,
    pub http_retry_max_delay: Duration,

    pub circuit_breaker_enabled: bool,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout: Duration,

    pub strict_response_envelope: bool,
    pub strict_options_405: bool,

    pub in_docker_override: Option<bool>,
    pub docker_test_hostname: Option<String>,
    pub docker_host_gateway: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_str("GATEWAY_BIND_ADDR", "0.0.0.0:8080"),
            request_timeout_secs: env_u64("GATEWAY_REQUEST_TIMEOUT_SECS", 30),

            jwt_secret_key: env_str("JWT_SECRET_KEY", "change-me-in-production-minimum-32-bytes"),
            cookie_samesite: env_str("COOKIE_SAMESITE", "Strict"),
            https_only: env_bool("HTTPS_ONLY", false),
            https_enabled: env_bool("HTTPS_ENABLED", false),

            allowed_origins: {
                let v = env_list("ALLOWED_ORIGINS");
                if v.is_empty() { vec!["*".into()] } else { v }
            },
            cors_strict: env_bool("CORS_STRICT", true),

            local_host_ip_bypass: std::env::var("LOCAL_HOST_IP_BYPASS")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
            allow_localhost_bypass: env_bool("ALLOW_LOCALHOST_BYPASS", true),
            trust_x_forwarded_for: env_bool("TRUST_X_FORWARDED_FOR", true),
            xff_trusted_proxies: env_list("XFF_TRUSTED_PROXIES"),

            mem_encryption_key: std::env::var("MEM_ENCRYPTION_KEY").ok(),
            mem_dump_path: std::env::var("MEM_DUMP_PATH").ok(),

            http_connect_timeout: Duration::from_secs_f64(env_f64("HTTP_CONNECT_TIMEOUT", 5.0)),
            http_read_timeout: Duration::from_secs_f64(env_f64("HTTP_READ_TIMEOUT", 30.0)),
            http_write_timeout: Duration::from_secs_f64(env_f64("HTTP_WRITE_TIMEOUT", 30.0)),
            http_timeout: Duration::from_secs_f64(env_f64("HTTP_TIMEOUT", 30.0)),
            http_retry_base_delay: Duration::from_secs_f64(env_f64("HTTP_RETRY_BASE_DELAY", 0.25)),
            http_retry_max_delay: Duration::from_secs_f64(env_f64("HTTP_RETRY_MAX_DELAY", 2.0)),

            circuit_breaker_enabled: env_bool("CIRCUIT_BREAKER_ENABLED", true),
            circuit_breaker_threshold: env_u64("CIRCUIT_BREAKER_THRESHOLD", 5) as u32,
            circuit_breaker_timeout: Duration::from_secs_f64(env_f64("CIRCUIT_BREAKER_TIMEOUT", 30.0)),

            strict_response_envelope: env_bool("STRICT_RESPONSE_ENVELOPE", true),
            strict_options_405: env_bool("STRICT_OPTIONS_405", false),

            in_docker_override: std::env::var("DOORMAN_IN_DOCKER")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
            docker_test_hostname: std::env::var("DOORMAN_TEST_HOSTNAME")
                .ok()
                .or_else(|| std::env::var("DOORMAN_UPSTREAM_HOST").ok()),
            docker_host_gateway: env_str("DOORMAN_DOCKER_HOST_GATEWAY", "172.17.0.1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_without_any_env() {
        let cfg = GatewayConfig {
            bind_addr: "0.0.0.0:8080".into(),
            ..GatewayConfig::from_env()
        };
        assert_eq!(cfg.circuit_breaker_threshold, 5);
        assert!(cfg.circuit_breaker_timeout.as_secs_f64() > 0.0);
        assert!(cfg.strict_response_envelope);
    }
}
