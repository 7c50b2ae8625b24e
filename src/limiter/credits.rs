//! Atomic credit decrement (§4.5 "Credits").
//!
//! Public APIs never call into this module; callers check
//! `api_credits_enabled` before invoking [`decrement`].

use crate::error::{GatewayError, Result};
use crate::store::{DocumentStore, Filter};
use crate::value::Value;
use std::sync::Arc;

pub async fn decrement(store: &Arc<dyn DocumentStore>, username: &str, credit_group: &str) -> Result<i64> {
    let mut filter = Filter::new();
    filter.insert("username".into(), Value::String(username.into()));
    filter.insert("api_credit_group".into(), Value::String(credit_group.into()));
    match store.decrement_if_positive("tier_assignments", &filter, "available_credits").await? {
        Some(remaining) => Ok(remaining),
        None => Err(GatewayError::CreditsExhausted),
    }
}
