//! Per-user bounded-queue throttle (§4.5 "Throttle").
//!
//! A `tokio::sync::Semaphore` of capacity `throttle_queue_limit` stands in
//! for the queue bound: acquiring a permit models taking a queue slot,
//! dropping the guard models leaving it. A request that cannot acquire a
//! permit within `throttle_wait_duration` fails with `429`.

use crate::error::{GatewayError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub struct ThrottleRegistry {
    queues: DashMap<String, Arc<Semaphore>>,
}

impl ThrottleRegistry {
    pub fn new() -> Self {
        Self { queues: DashMap::new() }
    }

    pub async fn acquire(&self, username: &str, queue_limit: usize, wait_ms: u64) -> Result<()> {
        let sem = self
            .queues
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(queue_limit)))
            .clone();
        match tokio::time::timeout(Duration::from_millis(wait_ms), sem.acquire_owned()).await {
            Ok(Ok(permit)) => {
                // Released as soon as the caller's turn at the head of the
                // queue has been granted; it does not span the upstream call.
                drop(permit);
                Ok(())
            }
            _ => Err(GatewayError::Throttled),
        }
    }
}

impl Default for ThrottleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
