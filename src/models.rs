//! Data model entities (§3). Each has a semantic key distinct from its
//! storage primary key, matching the document-store contract in §6.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiType {
    Rest,
    Soap,
    Graphql,
    Grpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpMode {
    AllowAll,
    Whitelist,
}

impl Default for IpMode {
    fn default() -> Self {
        IpMode::AllowAll
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTimeouts {
    pub connect_secs: Option<f64>,
    pub read_secs: Option<f64>,
    pub write_secs: Option<f64>,
    pub pool_secs: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsPolicy {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    pub expose_headers: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".into()],
            allow_methods: vec!["GET".into(), "POST".into(), "PUT".into(), "DELETE".into(), "PATCH".into(), "OPTIONS".into()],
            allow_headers: vec!["*".into()],
            allow_credentials: false,
            expose_headers: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Api {
    pub api_id: String,
    pub api_name: String,
    pub api_version: String,
    pub api_type: ApiType,
    pub api_servers: Vec<String>,
    pub api_public: bool,
    pub api_auth_required: bool,
    pub api_allowed_roles: Vec<String>,
    pub api_allowed_groups: Vec<String>,
    pub api_allowed_retry_count: u32,
    pub timeouts: ApiTimeouts,
    pub cors: CorsPolicy,
    pub api_ip_mode: IpMode,
    pub api_ip_whitelist: Vec<String>,
    pub api_ip_blacklist: Vec<String>,
    pub api_trust_x_forwarded_for: Option<bool>,
    pub api_authorization_field_swap: Option<String>,
    pub api_credits_enabled: bool,
    pub api_credit_group: Option<String>,
    pub api_grpc_package: Option<String>,
    pub api_grpc_allowed_packages: Vec<String>,
    pub api_grpc_allowed_services: Vec<String>,
    pub api_grpc_allowed_methods: Vec<String>,
    pub active: bool,
}

impl Api {
    pub fn effective_trust_xff(&self, global_trust_xff: bool) -> bool {
        self.api_trust_x_forwarded_for.unwrap_or(global_trust_xff)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub endpoint_id: String,
    pub api_name: String,
    pub api_version: String,
    pub endpoint_method: String,
    pub endpoint_uri: String,
    pub endpoint_servers: Vec<String>,
    pub validation_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub groups: HashSet<String>,
    pub rate_limit_duration: u64,
    pub rate_limit_window_secs: u64,
    pub throttle_queue_limit: usize,
    pub throttle_wait_duration_ms: u64,
    pub bandwidth_limit_bytes: u64,
    pub bandwidth_window_secs: u64,
    pub tier_id: Option<String>,
    pub mfa_secret: Option<String>,
    pub mfa_enabled: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    pub role_name: String,
    pub manage_users: bool,
    pub manage_apis: bool,
    pub manage_endpoints: bool,
    pub manage_groups: bool,
    pub manage_roles: bool,
    pub manage_routings: bool,
    pub manage_gateway: bool,
    pub manage_subscriptions: bool,
    pub manage_security: bool,
    pub manage_credits: bool,
    pub manage_auth: bool,
    pub view_logs: bool,
    pub export_logs: bool,
    pub view_builder_tables: bool,
}

impl Role {
    pub fn accesses(&self) -> HashMap<String, bool> {
        let mut m = HashMap::new();
        m.insert("manage_users".into(), self.manage_users);
        m.insert("manage_apis".into(), self.manage_apis);
        m.insert("manage_endpoints".into(), self.manage_endpoints);
        m.insert("manage_groups".into(), self.manage_groups);
        m.insert("manage_roles".into(), self.manage_roles);
        m.insert("manage_routings".into(), self.manage_routings);
        m.insert("manage_gateway".into(), self.manage_gateway);
        m.insert("manage_subscriptions".into(), self.manage_subscriptions);
        m.insert("manage_security".into(), self.manage_security);
        m.insert("manage_credits".into(), self.manage_credits);
        m.insert("manage_auth".into(), self.manage_auth);
        m.insert("view_logs".into(), self.view_logs);
        m.insert("export_logs".into(), self.export_logs);
        m.insert("view_builder_tables".into(), self.view_builder_tables);
        m
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub group_name: String,
}

pub const GROUP_ALL: &str = "ALL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subscription {
    pub username: String,
    pub apis: HashSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routing {
    pub client_key: String,
    pub routing_servers: Vec<String>,
    pub server_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier {
    pub tier_id: String,
    pub requests_per_minute: u64,
    pub throttle_queue_limit: Option<usize>,
    pub throttle_wait_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditGroupDefinition {
    pub api_credit_group: String,
    pub upstream_api_key_encrypted: Vec<u8>,
    pub upstream_header_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredits {
    pub username: String,
    pub api_credit_group: String,
    pub available_credits: i64,
    pub user_api_key: Option<String>,
}

pub const SUPER_ADMIN_USERNAME: &str = "admin";
