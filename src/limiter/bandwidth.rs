//! Per-user sliding-window bandwidth bucket (§4.5 "Bandwidth").
//!
//! Modeled as a fixed window over the same `PolicyCache::incrby` primitive
//! used for rate limiting; the pre-request check is a read-then-compare
//! against `Content-Length`, the post-response hook accounts actual bytes.

use crate::cache::{Namespace, PolicyCache};
use crate::error::{GatewayError, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn bucket_key(username: &str, window_secs: u64) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let bucket_start = (now / window_secs) * window_secs;
    format!("bw:{username}:{window_secs}:{bucket_start}")
}

pub fn check_pre(cache: &PolicyCache, username: &str, window_secs: u64, limit: u64, content_length: u64) -> Result<()> {
    let key = bucket_key(username, window_secs);
    let used = cache.get(Namespace::UserCache, &key).and_then(|v| v.as_int()).unwrap_or(0) as u64;
    if used + content_length > limit {
        return Err(GatewayError::BandwidthExceeded);
    }
    Ok(())
}

pub fn account(cache: &PolicyCache, username: &str, window_secs: u64, bytes: u64) {
    let key = bucket_key(username, window_secs);
    cache.incrby(Namespace::UserCache, &key, bytes as i64, Duration::from_secs(window_secs));
}
