//! Audit log (§4.10 step 17), adapted from the gateway's `AuditLogger`: a
//! bounded in-memory ring of events for modification-class platform paths.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::SystemTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditResult {
    Success,
    Failure,
    Denied,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp_unix: u64,
    pub user: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub request_id: String,
    pub resource: String,
    pub action: String,
    pub result: AuditResult,
}

pub struct AuditLog {
    events: Mutex<VecDeque<AuditEvent>>,
    max_events: usize,
}

impl AuditLog {
    pub fn new(max_events: usize) -> Self {
        Self { events: Mutex::new(VecDeque::with_capacity(max_events)), max_events }
    }

    pub fn record(
        &self,
        user: Option<&str>,
        client_ip: Option<IpAddr>,
        request_id: &str,
        resource: &str,
        action: &str,
        result: AuditResult,
    ) {
        let event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            timestamp_unix: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            user: user.map(str::to_string),
            client_ip,
            request_id: request_id.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            result,
        };
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Platform write verbs are audited; reads are not (§4.10 step 17:
    /// "modification-class platform paths").
    pub fn is_modification_method(method: &str) -> bool {
        matches!(method.to_uppercase().as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
    }

    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.lock();
        events.iter().rev().take(limit).cloned().collect()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_drops_oldest_once_full() {
        let log = AuditLog::new(2);
        log.record(Some("alice"), None, "r1", "/platform/apis", "POST", AuditResult::Success);
        log.record(Some("alice"), None, "r2", "/platform/apis", "POST", AuditResult::Success);
        log.record(Some("alice"), None, "r3", "/platform/apis", "POST", AuditResult::Success);
        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].request_id, "r3");
        assert_eq!(recent[1].request_id, "r2");
    }

    #[test]
    fn get_and_head_are_not_modification_methods() {
        assert!(!AuditLog::is_modification_method("GET"));
        assert!(!AuditLog::is_modification_method("HEAD"));
        assert!(AuditLog::is_modification_method("post"));
    }
}
