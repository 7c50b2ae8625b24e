//! Authorization & subscription checks (§4.10 steps 6-7), adapted from the
//! gateway's RBAC `AuthorizationEngine` down to the single rule the spec
//! actually needs: role or group membership against the API's allow-lists.

use crate::models::{Api, Subscription, GROUP_ALL};
use std::collections::HashSet;

/// `role ∈ api_allowed_roles` OR `group ∈ api_allowed_groups` OR
/// `ALL ∈ api_allowed_groups`.
pub fn is_authorized(api: &Api, role: &str, groups: &HashSet<String>) -> bool {
    if api.api_allowed_groups.iter().any(|g| g == GROUP_ALL) {
        return true;
    }
    if api.api_allowed_roles.iter().any(|r| r == role) {
        return true;
    }
    groups.iter().any(|g| api.api_allowed_groups.contains(g))
}

pub fn is_subscribed(api: &Api, subscription: &Subscription) -> bool {
    let key = format!("{}/{}", api.api_name, api.api_version);
    subscription.apis.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApiType;

    fn sample_api(roles: &[&str], groups: &[&str]) -> Api {
        Api {
            api_id: "id".into(),
            api_name: "demo".into(),
            api_version: "v1".into(),
            api_type: ApiType::Rest,
            api_servers: vec![],
            api_public: false,
            api_auth_required: true,
            api_allowed_roles: roles.iter().map(|s| s.to_string()).collect(),
            api_allowed_groups: groups.iter().map(|s| s.to_string()).collect(),
            api_allowed_retry_count: 0,
            timeouts: crate::models::ApiTimeouts { connect_secs: None, read_secs: None, write_secs: None, pool_secs: None },
            cors: Default::default(),
            api_ip_mode: crate::models::IpMode::AllowAll,
            api_ip_whitelist: vec![],
            api_ip_blacklist: vec![],
            api_trust_x_forwarded_for: None,
            api_authorization_field_swap: None,
            api_credits_enabled: false,
            api_credit_group: None,
            api_grpc_package: None,
            api_grpc_allowed_packages: vec![],
            api_grpc_allowed_services: vec![],
            api_grpc_allowed_methods: vec![],
            active: true,
        }
    }

    #[test]
    fn role_membership_grants_access() {
        let api = sample_api(&["editor"], &[]);
        assert!(is_authorized(&api, "editor", &HashSet::new()));
        assert!(!is_authorized(&api, "viewer", &HashSet::new()));
    }

    #[test]
    fn group_all_grants_access_regardless_of_role() {
        let api = sample_api(&["editor"], &[GROUP_ALL]);
        assert!(is_authorized(&api, "viewer", &HashSet::new()));
    }

    #[test]
    fn subscription_keyed_by_name_and_version() {
        let api = sample_api(&[], &[]);
        let mut subscription = Subscription::default();
        subscription.apis.insert("demo/v1".to_string());
        assert!(is_subscribed(&api, &subscription));
    }
}
