//! Rate/Throttle/Bandwidth/Credits Limiter (C5, §4.5).
//!
//! Four independent enforcers evaluated in a fixed order; the first failure
//! short-circuits the pipeline. Adapted from the gateway's `RateLimiter` —
//! the teacher's token-bucket/sliding-window algorithms are replaced with
//! the fixed-window-counter and bounded-FIFO algorithms the spec requires,
//! but the namespaced-map-behind-a-lock shape is kept.

pub mod bandwidth;
pub mod credits;
pub mod rate;
pub mod throttle;

use crate::cache::PolicyCache;
use crate::error::Result;
use crate::models::{Tier, User};
use crate::store::DocumentStore;
use std::sync::Arc;

pub struct Limiter {
    cache: Arc<PolicyCache>,
    throttle: throttle::ThrottleRegistry,
}

impl Limiter {
    pub fn new(cache: Arc<PolicyCache>) -> Self {
        Self { cache, throttle: throttle::ThrottleRegistry::new() }
    }

    /// Rate → tier → throttle → bandwidth(pre) → credits, in that order
    /// (§4.5: tier is evaluated before the user limit so its bound is never
    /// exceeded even when the user's own allowance is generous).
    pub async fn enforce_rate_and_tier(&self, user: &User, tier: Option<&Tier>) -> Result<()> {
        if let Some(tier) = tier {
            rate::check_fixed_window(&self.cache, &format!("tier:{}", user.tier_id.as_deref().unwrap_or("")), 60, tier.requests_per_minute)?;
        }
        if user.rate_limit_duration > 0 {
            rate::check_fixed_window(&self.cache, &format!("user:{}", user.username), user.rate_limit_window_secs.max(1), user.rate_limit_duration)?;
        }
        Ok(())
    }

    pub async fn enforce_throttle(&self, user: &User, tier: Option<&Tier>) -> Result<()> {
        let (limit, wait_ms) = match tier {
            Some(t) if t.throttle_queue_limit.is_some() => {
                (t.throttle_queue_limit.unwrap(), t.throttle_wait_duration_ms.unwrap_or(user.throttle_wait_duration_ms))
            }
            _ => (user.throttle_queue_limit, user.throttle_wait_duration_ms),
        };
        if limit == 0 {
            return Ok(());
        }
        self.throttle.acquire(&user.username, limit, wait_ms).await
    }

    pub fn enforce_bandwidth_pre(&self, user: &User, content_length: u64) -> Result<()> {
        if user.bandwidth_limit_bytes == 0 {
            return Ok(());
        }
        bandwidth::check_pre(&self.cache, &user.username, user.bandwidth_window_secs.max(1), user.bandwidth_limit_bytes, content_length)
    }

    pub fn account_bandwidth_post(&self, user: &User, bytes: u64) {
        if user.bandwidth_limit_bytes == 0 {
            return;
        }
        bandwidth::account(&self.cache, &user.username, user.bandwidth_window_secs.max(1), bytes);
    }

    pub async fn enforce_credits(&self, store: &Arc<dyn DocumentStore>, username: &str, credit_group: &str) -> Result<()> {
        credits::decrement(store, username, credit_group).await?;
        Ok(())
    }
}
