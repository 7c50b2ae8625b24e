//! Upstream Router (C7, §4.7), grounded on the original `routing_util`:
//! client-routing > endpoint-level > API-level precedence, round-robin via
//! the cache's process-lifetime index, and docker-aware loopback rewriting.

use crate::cache::PolicyCache;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::models::{Api, Endpoint, Routing};
use crate::resolver::ConfigResolver;

/// Strip an inline trailing comment (`"http://a:1 # note"` -> `"http://a:1"`)
/// before a configured server URL is parsed.
pub fn strip_inline_comment(raw: &str) -> &str {
    match raw.find('#') {
        Some(idx) => raw[..idx].trim_end(),
        None => raw.trim(),
    }
}

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// `DOORMAN_IN_DOCKER` wins when set; otherwise fall back to the
/// `/.dockerenv` container marker file.
pub fn running_in_docker(cfg: &GatewayConfig) -> bool {
    cfg.in_docker_override.unwrap_or_else(|| std::path::Path::new("/.dockerenv").exists())
}

/// Rewrite a loopback host to the container's host-bridge address when the
/// process detects it is running inside a container, preserving scheme,
/// userinfo, port, and path/query. Hand-rolled authority split rather than
/// a URL-parsing crate, since the surface needed is this one substitution.
pub fn rewrite_for_docker(server_url: &str, cfg: &GatewayConfig) -> String {
    if !running_in_docker(cfg) {
        return server_url.to_string();
    }
    let Some(scheme_end) = server_url.find("://") else { return server_url.to_string() };
    let authority_start = scheme_end + 3;
    let rest = &server_url[authority_start..];
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let tail = &rest[authority_end..];

    let (userinfo, host_port) = match authority.rsplit_once('@') {
        Some((u, h)) => (Some(u), h),
        None => (None, authority),
    };
    let (host, port) = match host_port.rsplit_once(':') {
        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) => (h, Some(p)),
        _ => (host_port, None),
    };
    if !LOOPBACK_HOSTS.contains(&host) {
        return server_url.to_string();
    }
    let bridge = cfg
        .docker_test_hostname
        .clone()
        .unwrap_or_else(|| cfg.docker_host_gateway.clone());

    let mut rewritten = String::new();
    rewritten.push_str(&server_url[..authority_start]);
    if let Some(u) = userinfo {
        rewritten.push_str(u);
        rewritten.push('@');
    }
    rewritten.push_str(&bridge);
    if let Some(p) = port {
        rewritten.push(':');
        rewritten.push_str(p);
    }
    rewritten.push_str(tail);
    rewritten
}

pub struct ChosenServer {
    pub base_url: String,
}

pub struct Router<'a> {
    pub resolver: &'a ConfigResolver,
    pub cache: &'a PolicyCache,
}

impl<'a> Router<'a> {
    /// Select the upstream server per §4.7's three-tier precedence,
    /// advancing whichever round-robin counter was consulted.
    pub async fn choose(
        &self,
        api: &Api,
        endpoint: &Endpoint,
        client_key: Option<&str>,
    ) -> Result<ChosenServer> {
        if let Some(client_key) = client_key {
            if let Some(routing) = self.resolver.get_routing(client_key).await? {
                return self.round_robin_persisted(client_key, &routing).await;
            }
        }
        if !endpoint.endpoint_servers.is_empty() {
            let key = if endpoint.endpoint_id.is_empty() {
                format!("{}:{}:{}", api.api_id, endpoint.endpoint_method, endpoint.endpoint_uri)
            } else {
                endpoint.endpoint_id.clone()
            };
            return Ok(self.round_robin_in_process(&key, &endpoint.endpoint_servers));
        }
        if api.api_servers.is_empty() {
            return Err(GatewayError::Configuration(format!("api {} has no upstream servers", api.api_name)));
        }
        Ok(self.round_robin_in_process(&api.api_id, &api.api_servers))
    }

    async fn round_robin_persisted(&self, client_key: &str, routing: &Routing) -> Result<ChosenServer> {
        if routing.routing_servers.is_empty() {
            return Err(GatewayError::Configuration(format!("routing {client_key} has no servers")));
        }
        let index = routing.server_index % routing.routing_servers.len();
        let chosen = routing.routing_servers[index].clone();
        let next = (index + 1) % routing.routing_servers.len();
        self.resolver.save_routing_index(client_key, next).await?;
        Ok(ChosenServer { base_url: strip_inline_comment(&chosen).to_string() })
    }

    fn round_robin_in_process(&self, key: &str, servers: &[String]) -> ChosenServer {
        let index = self.cache.fetch_add_index_mod(key, servers.len());
        ChosenServer { base_url: strip_inline_comment(&servers[index]).to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_comment_is_stripped() {
        assert_eq!(strip_inline_comment("http://a:1 # note"), "http://a:1");
        assert_eq!(strip_inline_comment("http://a:1"), "http://a:1");
    }

    #[test]
    fn docker_rewrite_preserves_port_and_path() {
        let mut cfg = GatewayConfig::from_env();
        cfg.in_docker_override = Some(true);
        cfg.docker_host_gateway = "172.17.0.1".into();
        cfg.docker_test_hostname = None;
        let rewritten = rewrite_for_docker("http://localhost:8080/v1/echo?x=1", &cfg);
        assert_eq!(rewritten, "http://172.17.0.1:8080/v1/echo?x=1");
    }

    #[test]
    fn non_loopback_host_is_left_untouched() {
        let mut cfg = GatewayConfig::from_env();
        cfg.in_docker_override = Some(true);
        let rewritten = rewrite_for_docker("http://upstream.internal:8080/v1", &cfg);
        assert_eq!(rewritten, "http://upstream.internal:8080/v1");
    }

    #[test]
    fn round_robin_in_process_cycles_through_servers() {
        let cache = PolicyCache::new();
        let resolver_cache = std::sync::Arc::new(PolicyCache::new());
        let store: std::sync::Arc<dyn crate::store::DocumentStore> = std::sync::Arc::new(crate::store::InMemoryStore::new());
        let resolver = ConfigResolver::new(resolver_cache, store);
        let router = Router { resolver: &resolver, cache: &cache };
        let servers = vec!["http://a".to_string(), "http://b".to_string()];
        let first = router.round_robin_in_process("k", &servers);
        let second = router.round_robin_in_process("k", &servers);
        let third = router.round_robin_in_process("k", &servers);
        assert_eq!(first.base_url, "http://a");
        assert_eq!(second.base_url, "http://b");
        assert_eq!(third.base_url, "http://a");
    }
}
