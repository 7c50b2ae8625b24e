//! Fixed-window rate counter (§4.5 "Rate limit" / "Tier rate limit").
//!
//! Bucket key is `(subject, window_secs, floor(now/window_secs))`; the
//! in-process backend realizes `INCR + EXPIRE(window_secs)` via
//! [`PolicyCache::incr`].

use crate::cache::{Namespace, PolicyCache};
use crate::error::{GatewayError, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn check_fixed_window(cache: &PolicyCache, subject: &str, window_secs: u64, allowance: u64) -> Result<()> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let bucket_start = (now / window_secs) * window_secs;
    let key = format!("{subject}:{window_secs}:{bucket_start}");
    let count = cache.incr(Namespace::UserCache, &key, Duration::from_secs(window_secs));
    if count as u64 > allowance {
        return Err(GatewayError::RateLimited);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance_of_zero_rejects_the_first_request() {
        let cache = PolicyCache::new();
        assert!(check_fixed_window(&cache, "bob", 60, 0).is_err());
    }

    #[test]
    fn separate_subjects_have_independent_buckets() {
        let cache = PolicyCache::new();
        assert!(check_fixed_window(&cache, "a", 60, 1).is_ok());
        assert!(check_fixed_window(&cache, "b", 60, 1).is_ok());
    }
}
