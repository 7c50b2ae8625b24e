//! End-to-end pipeline scenarios (§8), driven through `pipeline::handle`
//! the same way the HTTP server would, exercising every early-exit step
//! that doesn't require a live upstream.

use gatewright::config::GatewayConfig;
use gatewright::pipeline::{GatewayState, IncomingRequest};
use gatewright::store::{Document, DocumentStore};
use gatewright::value::Value;
use http::{HeaderMap, HeaderValue, Method};
use std::net::IpAddr;

fn base_config() -> GatewayConfig {
    let mut cfg = GatewayConfig::from_env();
    cfg.allow_localhost_bypass = false;
    cfg.local_host_ip_bypass = Some(false);
    cfg
}

fn api_doc(
    name: &str,
    version: &str,
    public: bool,
    auth_required: bool,
    roles: &[&str],
    credits_enabled: bool,
    credit_group: Option<&str>,
) -> Document {
    let mut d = Document::new();
    d.insert("api_id".into(), Value::String(format!("{name}-{version}")));
    d.insert("api_name".into(), Value::String(name.into()));
    d.insert("api_version".into(), Value::String(version.into()));
    d.insert("api_type".into(), Value::String("Rest".into()));
    d.insert("api_servers".into(), Value::Array(vec![Value::String("http://127.0.0.1:1/".into())]));
    d.insert("api_public".into(), Value::Bool(public));
    d.insert("api_auth_required".into(), Value::Bool(auth_required));
    d.insert(
        "api_allowed_roles".into(),
        Value::Array(roles.iter().map(|r| Value::String(r.to_string())).collect()),
    );
    d.insert("api_allowed_groups".into(), Value::Array(vec![]));
    d.insert("api_allowed_retry_count".into(), Value::Number(0.0));
    d.insert(
        "timeouts".into(),
        Value::Object(BTreeMap::new()),
    );
    d.insert("cors".into(), cors_default());
    d.insert("api_ip_mode".into(), Value::String("AllowAll".into()));
    d.insert("api_ip_whitelist".into(), Value::Array(vec![]));
    d.insert("api_ip_blacklist".into(), Value::Array(vec![]));
    d.insert("api_trust_x_forwarded_for".into(), Value::Null);
    d.insert("api_authorization_field_swap".into(), Value::Null);
    d.insert("api_credits_enabled".into(), Value::Bool(credits_enabled));
    d.insert(
        "api_credit_group".into(),
        credit_group.map(|g| Value::String(g.into())).unwrap_or(Value::Null),
    );
    d.insert("api_grpc_package".into(), Value::Null);
    d.insert("api_grpc_allowed_packages".into(), Value::Array(vec![]));
    d.insert("api_grpc_allowed_services".into(), Value::Array(vec![]));
    d.insert("api_grpc_allowed_methods".into(), Value::Array(vec![]));
    d.insert("active".into(), Value::Bool(true));
    d
}

use std::collections::BTreeMap;

fn cors_default() -> Value {
    let mut m = BTreeMap::new();
    m.insert("allow_origins".into(), Value::Array(vec![Value::String("*".into())]));
    m.insert("allow_methods".into(), Value::Array(vec![Value::String("GET".into())]));
    m.insert("allow_headers".into(), Value::Array(vec![Value::String("*".into())]));
    m.insert("allow_credentials".into(), Value::Bool(false));
    m.insert("expose_headers".into(), Value::Array(vec![]));
    Value::Object(m)
}

fn user_doc(username: &str, role: &str) -> Document {
    let mut d = Document::new();
    d.insert("username".into(), Value::String(username.into()));
    d.insert("password_hash".into(), Value::String("x".into()));
    d.insert("role".into(), Value::String(role.into()));
    d.insert("groups".into(), Value::Array(vec![]));
    d.insert("rate_limit_duration".into(), Value::Number(100.0));
    d.insert("rate_limit_window_secs".into(), Value::Number(60.0));
    d.insert("throttle_queue_limit".into(), Value::Number(0.0));
    d.insert("throttle_wait_duration_ms".into(), Value::Number(0.0));
    d.insert("bandwidth_limit_bytes".into(), Value::Number(0.0));
    d.insert("bandwidth_window_secs".into(), Value::Number(60.0));
    d.insert("tier_id".into(), Value::Null);
    d.insert("mfa_secret".into(), Value::Null);
    d.insert("mfa_enabled".into(), Value::Bool(false));
    d.insert("active".into(), Value::Bool(true));
    d
}

fn role_doc(role_name: &str) -> Document {
    let mut d = Document::new();
    d.insert("role_name".into(), Value::String(role_name.into()));
    for field in [
        "manage_users", "manage_apis", "manage_endpoints", "manage_groups", "manage_roles",
        "manage_routings", "manage_gateway", "manage_subscriptions", "manage_security",
        "manage_credits", "manage_auth", "view_logs", "export_logs", "view_builder_tables",
    ] {
        d.insert(field.into(), Value::Bool(false));
    }
    d
}

fn subscription_doc(username: &str, apis: &[&str]) -> Document {
    let mut d = Document::new();
    d.insert("username".into(), Value::String(username.into()));
    d.insert("apis".into(), Value::Array(apis.iter().map(|a| Value::String(a.to_string())).collect()));
    d
}

fn incoming(method: Method, path: &str, headers: HeaderMap, peer: IpAddr) -> IncomingRequest {
    IncomingRequest { method, path: path.into(), query: String::new(), headers, body: vec![], peer_ip: peer }
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let state = GatewayState::new(base_config());
    let resp = gatewright::pipeline::handle(
        &state,
        incoming(Method::GET, "/nope", HeaderMap::new(), "198.51.100.1".parse().unwrap()),
    )
    .await;
    assert_eq!(resp.status, 404);
}

#[tokio::test]
async fn protected_api_without_bearer_token_is_rejected() {
    let state = GatewayState::new(base_config());
    state.store.insert_one("apis", api_doc("demo", "v1", false, true, &["viewer"], false, None)).await.unwrap();

    let resp = gatewright::pipeline::handle(
        &state,
        incoming(Method::GET, "/api/rest/demo/v1/items", HeaderMap::new(), "198.51.100.1".parse().unwrap()),
    )
    .await;
    assert_eq!(resp.status, 401);
}

#[tokio::test]
async fn ip_blacklist_denies_matching_client() {
    let state = GatewayState::new(base_config());
    let mut api = api_doc("demo", "v1", true, false, &[], false, None);
    api.insert("api_ip_mode".into(), Value::String("AllowAll".into()));
    api.insert("api_ip_blacklist".into(), Value::Array(vec![Value::String("198.51.100.0/24".into())]));
    state.store.insert_one("apis", api).await.unwrap();

    let resp = gatewright::pipeline::handle(
        &state,
        incoming(Method::GET, "/api/rest/demo/v1/items", HeaderMap::new(), "198.51.100.7".parse().unwrap()),
    )
    .await;
    assert_eq!(resp.status, 403);
}

#[tokio::test]
async fn credits_exhausted_returns_402() {
    let state = GatewayState::new(base_config());
    state.store.insert_one("apis", api_doc("billing", "v1", false, true, &["viewer"], true, Some("cg-1"))).await.unwrap();
    state.store.insert_one("users", user_doc("dana", "viewer")).await.unwrap();
    state.store.insert_one("roles", role_doc("viewer")).await.unwrap();
    state.store.insert_one("subscriptions", subscription_doc("dana", &["billing/v1"])).await.unwrap();
    let mut credits = Document::new();
    credits.insert("username".into(), Value::String("dana".into()));
    credits.insert("api_credit_group".into(), Value::String("cg-1".into()));
    credits.insert("available_credits".into(), Value::Number(0.0));
    state.store.insert_one("tier_assignments", credits).await.unwrap();

    let tokens = state.identity.mint(&state.resolver, "dana").await.unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", tokens.access_token)).unwrap(),
    );

    let resp = gatewright::pipeline::handle(
        &state,
        incoming(Method::GET, "/api/rest/billing/v1/usage", headers, "198.51.100.1".parse().unwrap()),
    )
    .await;
    assert_eq!(resp.status, 402);
}

#[tokio::test]
async fn not_subscribed_user_is_rejected() {
    let state = GatewayState::new(base_config());
    state.store.insert_one("apis", api_doc("billing", "v1", false, true, &["viewer"], false, None)).await.unwrap();
    state.store.insert_one("users", user_doc("erin", "viewer")).await.unwrap();
    state.store.insert_one("roles", role_doc("viewer")).await.unwrap();

    let tokens = state.identity.mint(&state.resolver, "erin").await.unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", tokens.access_token)).unwrap(),
    );

    let resp = gatewright::pipeline::handle(
        &state,
        incoming(Method::GET, "/api/rest/billing/v1/usage", headers, "198.51.100.1".parse().unwrap()),
    )
    .await;
    assert_eq!(resp.status, 403);
}
