// # Policy Cache
//
// Namespaced key-value cache sitting in front of the document store adapter
// (see `crate::store`). Every configuration read in the gateway tries this
// cache before falling back to the store; every write-path invalidates the
// cache entry for the same key, including on failure, so a repaired read
// never observes stale security-impacting data.
//
// ## Namespaces
//
// `api_cache`, `api_id_cache`, `api_endpoint_cache`, `endpoint_cache`,
// `user_cache`, `role_cache`, `group_cache`, `user_subscription_cache`,
// `client_routing_cache`, `endpoint_server_cache` (round-robin indices,
// process-lifetime, never TTL-swept), `graphql_schema_cache`,
// `mfa_setup_cache`, `trigger_cache`.
//
// Two backends could satisfy this contract (in-process or a remote
// key-value store); only the in-process one is implemented here, behind
// the same surface a distributed backend would need to expose
// (`get/set/delete/clear/incr`).

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    ApiCache,
    ApiIdCache,
    ApiEndpointCache,
    EndpointCache,
    UserCache,
    RoleCache,
    GroupCache,
    UserSubscriptionCache,
    ClientRoutingCache,
    EndpointServerCache,
    GraphqlSchemaCache,
    MfaSetupCache,
    TriggerCache,
}

impl Namespace {
    /// Default TTL per namespace. `EndpointServerCache` is process-lifetime
    /// and never swept regardless of this value (see `PolicyCache::set`).
    pub fn default_ttl(self) -> Duration {
        match self {
            Namespace::ApiCache | Namespace::ApiIdCache | Namespace::ApiEndpointCache => {
                Duration::from_secs(300)
            }
            Namespace::EndpointCache => Duration::from_secs(300),
            Namespace::UserCache | Namespace::RoleCache | Namespace::GroupCache => {
                Duration::from_secs(120)
            }
            Namespace::UserSubscriptionCache => Duration::from_secs(120),
            Namespace::ClientRoutingCache => Duration::from_secs(600),
            Namespace::EndpointServerCache => Duration::from_secs(u64::MAX / 2),
            Namespace::GraphqlSchemaCache => Duration::from_secs(3600),
            Namespace::MfaSetupCache => Duration::from_secs(300),
            Namespace::TriggerCache => Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
struct Entry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub enum CacheValue {
    Json(serde_json::Value),
    Int(i64),
}

impl CacheValue {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            CacheValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            CacheValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// In-process namespaced cache. Each (namespace, key) pair is its own
/// dashmap shard entry, so contention on one namespace (e.g.
/// `endpoint_server_cache`, touched on every request) never blocks reads
/// of another.
pub struct PolicyCache {
    shards: DashMap<(Namespace, String), Entry>,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self { shards: DashMap::new() }
    }

    pub fn get(&self, ns: Namespace, key: &str) -> Option<CacheValue> {
        let entry = self.shards.get(&(ns, key.to_string()))?;
        if let Some(exp) = entry.expires_at {
            if Instant::now() >= exp {
                drop(entry);
                self.shards.remove(&(ns, key.to_string()));
                return None;
            }
        }
        Some(entry.value.clone())
    }

    pub fn get_json(&self, ns: Namespace, key: &str) -> Option<serde_json::Value> {
        self.get(ns, key).and_then(|v| v.as_json().cloned())
    }

    pub fn set(&self, ns: Namespace, key: &str, value: CacheValue, ttl: Option<Duration>) {
        let ttl = if ns == Namespace::EndpointServerCache {
            None
        } else {
            ttl.or(Some(ns.default_ttl()))
        };
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.shards.insert((ns, key.to_string()), Entry { value, expires_at });
    }

    pub fn set_json(&self, ns: Namespace, key: &str, value: serde_json::Value, ttl: Option<Duration>) {
        self.set(ns, key, CacheValue::Json(value), ttl);
    }

    pub fn delete(&self, ns: Namespace, key: &str) {
        self.shards.remove(&(ns, key.to_string()));
    }

    pub fn clear(&self, ns: Namespace) {
        self.shards.retain(|(n, _), _| *n != ns);
    }

    /// Atomic `INCR` for the limiter paths (§4.5). Returns the post-increment
    /// value. Installs an expiry of `ttl` only when the key did not already
    /// exist or had already expired (mirrors `INCR` + `EXPIRE` on first-write
    /// of the distributed backend contract in §6).
    pub fn incr(&self, ns: Namespace, key: &str, ttl: Duration) -> i64 {
        let mut entry = self
            .shards
            .entry((ns, key.to_string()))
            .or_insert_with(|| Entry { value: CacheValue::Int(0), expires_at: Some(Instant::now() + ttl) });
        if let Some(exp) = entry.expires_at {
            if Instant::now() >= exp {
                entry.value = CacheValue::Int(0);
                entry.expires_at = Some(Instant::now() + ttl);
            }
        }
        let next = entry.value.as_int().unwrap_or(0) + 1;
        entry.value = CacheValue::Int(next);
        next
    }

    /// Atomic `INCRBY` for the bandwidth bucket.
    pub fn incrby(&self, ns: Namespace, key: &str, amount: i64, ttl: Duration) -> i64 {
        let mut entry = self
            .shards
            .entry((ns, key.to_string()))
            .or_insert_with(|| Entry { value: CacheValue::Int(0), expires_at: Some(Instant::now() + ttl) });
        if let Some(exp) = entry.expires_at {
            if Instant::now() >= exp {
                entry.value = CacheValue::Int(0);
                entry.expires_at = Some(Instant::now() + ttl);
            }
        }
        let next = entry.value.as_int().unwrap_or(0) + amount;
        entry.value = CacheValue::Int(next);
        next
    }

    /// Atomic fetch-and-increment-modulo for round-robin indices (§5
    /// invariant (b)): returns the index this caller should use and advances
    /// the counter under the same shard lock `entry()` already holds, so two
    /// concurrent callers for the same key never observe the same index.
    pub fn fetch_add_index_mod(&self, key: &str, modulus: usize) -> usize {
        let modulus = modulus.max(1);
        let mut entry = self
            .shards
            .entry((Namespace::EndpointServerCache, key.to_string()))
            .or_insert_with(|| Entry { value: CacheValue::Int(0), expires_at: None });
        let current = entry.value.as_int().unwrap_or(0) as usize % modulus;
        entry.value = CacheValue::Int(((current + 1) % modulus) as i64);
        current
    }

    /// Process-lifetime round-robin counter read (defaults to 0 on miss).
    pub fn get_index(&self, key: &str) -> usize {
        self.get(Namespace::EndpointServerCache, key)
            .and_then(|v| v.as_int())
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    pub fn set_index(&self, key: &str, value: usize) {
        self.set(Namespace::EndpointServerCache, key, CacheValue::Int(value as i64), None);
    }
}

impl Default for PolicyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_expiry_evicts_entries() {
        let cache = PolicyCache::new();
        cache.set_json(Namespace::UserCache, "bob", serde_json::json!({"x": 1}), Some(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(Namespace::UserCache, "bob").is_none());
    }

    #[test]
    fn incr_is_monotonic_within_window() {
        let cache = PolicyCache::new();
        let a = cache.incr(Namespace::UserCache, "rl:bob:60:0", Duration::from_secs(60));
        let b = cache.incr(Namespace::UserCache, "rl:bob:60:0", Duration::from_secs(60));
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn endpoint_server_cache_never_expires() {
        let cache = PolicyCache::new();
        cache.set_index("api-1", 3);
        assert_eq!(cache.get_index("api-1"), 3);
    }

    #[test]
    fn fetch_add_index_mod_cycles_and_never_repeats_consecutively() {
        let cache = PolicyCache::new();
        let seen: Vec<usize> = (0..5).map(|_| cache.fetch_add_index_mod("svc", 3)).collect();
        assert_eq!(seen, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn concurrent_fetch_add_index_mod_never_yields_duplicates_within_a_cycle() {
        use std::sync::Arc;
        let cache = Arc::new(PolicyCache::new());
        let mut handles = vec![];
        for _ in 0..4 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || cache.fetch_add_index_mod("svc", 4)));
        }
        let mut results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort();
        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[test]
    fn write_then_read_is_immediately_visible_after_delete() {
        let cache = PolicyCache::new();
        cache.set_json(Namespace::ApiCache, "demo/v1", serde_json::json!({"active": true}), None);
        cache.delete(Namespace::ApiCache, "demo/v1");
        assert!(cache.get(Namespace::ApiCache, "demo/v1").is_none());
    }
}
