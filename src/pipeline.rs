//! Request Pipeline (C10, §4.10): the 17 ordered steps, adapted from the
//! gateway's `process_request` — each step returns early on a typed
//! [`GatewayError`] which this module, and only this module, translates
//! into an HTTP status + wire error code (§7).

use crate::adapters::{graphql, grpc, hygiene, rest, soap, Ingress};
use crate::audit::{AuditLog, AuditResult};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::identity::IdentityManager;
use crate::invoker::{CallParams, Invoker};
use crate::ip_policy::{parse_all, IpPolicy};
use crate::limiter::Limiter;
use crate::metrics::GatewayMetrics;
use crate::models::SUPER_ADMIN_USERNAME;
use crate::resolver::ConfigResolver;
use crate::router::Router;
use crate::{authz, validation};
use http::{HeaderMap, HeaderValue, Method};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub cache: Arc<crate::cache::PolicyCache>,
    pub store: Arc<dyn crate::store::DocumentStore>,
    pub resolver: ConfigResolver,
    pub identity: IdentityManager,
    pub limiter: Limiter,
    pub invoker: Invoker,
    pub ip_policy: IpPolicy,
    pub metrics: GatewayMetrics,
    pub audit: AuditLog,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> Self {
        let config = Arc::new(config);
        let cache = Arc::new(crate::cache::PolicyCache::new());
        let store: Arc<dyn crate::store::DocumentStore> = Arc::new(crate::store::InMemoryStore::new());
        let resolver = ConfigResolver::new(cache.clone(), store.clone());
        let identity = IdentityManager::new(&config.jwt_secret_key, config.https_enabled, &config.cookie_samesite)
            .with_cache(cache.clone());
        let limiter = Limiter::new(cache.clone());
        let invoker = Invoker::new(&config);
        let ip_policy = IpPolicy {
            trust_xff: config.trust_x_forwarded_for,
            trusted_proxies: parse_all(&config.xff_trusted_proxies),
            allow_localhost_bypass: config.local_host_ip_bypass.unwrap_or(config.allow_localhost_bypass),
        };
        Self {
            config,
            cache,
            store,
            resolver,
            identity,
            limiter,
            invoker,
            ip_policy,
            metrics: GatewayMetrics::default(),
            audit: AuditLog::default(),
        }
    }
}

pub struct IncomingRequest {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub peer_ip: IpAddr,
}

pub struct OutgoingResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl OutgoingResponse {
    fn error(err: &GatewayError, request_id: &str) -> Self {
        let body = serde_json::json!({
            "error_code": err.error_code(),
            "message": err.to_string(),
            "request_id": request_id,
        });
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Ok(v) = HeaderValue::from_str(request_id) {
            headers.insert("x-request-id", v);
        }
        Self { status: err.status_code(), headers, body: serde_json::to_vec(&body).unwrap_or_default() }
    }
}

struct ParsedRoute {
    ingress: Ingress,
    api_name: String,
    api_version: String,
    tail: String,
}

/// Parse the inbound path into a protocol ingress plus the `(api_name,
/// api_version, tail)` triple each adapter needs (§4.9 path shapes).
fn parse_route(path: &str, headers: &HeaderMap) -> Result<ParsedRoute> {
    let segs: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    let api_version_header = headers.get("x-api-version").and_then(|v| v.to_str().ok()).unwrap_or("v1");

    match segs.as_slice() {
        ["api", "rest", name, version, rest_tail @ ..] => Ok(ParsedRoute {
            ingress: Ingress::Rest,
            api_name: name.to_string(),
            api_version: version.to_string(),
            tail: rest_tail.join("/"),
        }),
        ["api", "soap", name, version, rest_tail @ ..] => Ok(ParsedRoute {
            ingress: Ingress::Soap,
            api_name: name.to_string(),
            api_version: version.to_string(),
            tail: rest_tail.join("/"),
        }),
        ["api", "graphql", name] => Ok(ParsedRoute {
            ingress: Ingress::Graphql,
            api_name: name.to_string(),
            api_version: api_version_header.to_string(),
            tail: String::new(),
        }),
        ["api", "grpc", name] => Ok(ParsedRoute {
            ingress: Ingress::Grpc,
            api_name: name.to_string(),
            api_version: api_version_header.to_string(),
            tail: String::new(),
        }),
        ["grpc-web", name, service, method] => Ok(ParsedRoute {
            ingress: Ingress::GrpcWeb,
            api_name: name.to_string(),
            api_version: api_version_header.to_string(),
            tail: format!("{service}.{method}"),
        }),
        _ => Err(GatewayError::NotFound("API001")),
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Run the full pipeline. Every early exit still returns a well-formed
/// `OutgoingResponse` — callers (the HTTP server) never see a `Result`.
pub async fn handle(state: &GatewayState, req: IncomingRequest) -> OutgoingResponse {
    let start = Instant::now();
    let request_id = correlation_id(&req.headers);

    let response = run(state, &req, &request_id).await;

    let (status, headers, body) = match response {
        Ok(resp) => (resp.status, resp.headers, resp.body),
        Err(err) => {
            if matches!(err, GatewayError::Authentication(_)) {
                state.metrics.record_auth_failure();
            }
            if matches!(err, GatewayError::Authorization(_)) {
                state.metrics.record_authz_failure();
            }
            if matches!(err, GatewayError::RateLimited | GatewayError::Throttled) {
                state.metrics.record_rate_limit_hit();
            }
            let resp = OutgoingResponse::error(&err, &request_id);
            (resp.status, resp.headers, resp.body)
        }
    };

    state.metrics.record_request(status, start.elapsed());
    if AuditLog::is_modification_method(req.method.as_str()) {
        let result = if status < 400 { AuditResult::Success } else { AuditResult::Denied };
        state.audit.record(None, Some(req.peer_ip), &request_id, &req.path, req.method.as_str(), result);
    }

    let mut headers = headers;
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", v);
    }
    OutgoingResponse { status, headers, body }
}

async fn run(state: &GatewayState, req: &IncomingRequest, request_id: &str) -> Result<OutgoingResponse> {
    // Step 2: global IP check (localhost bypass short-circuits everything else).
    let client_ip = state.ip_policy.resolve_client_ip(req.peer_ip, |h| {
        req.headers.get(h).and_then(|v| v.to_str().ok())
    });
    let bypassed = state
        .ip_policy
        .localhost_bypass_applies(req.peer_ip, |h| req.headers.get(h).and_then(|v| v.to_str().ok()));

    // Step 3/4: route + API resolution (CORS preflight piggybacks on the
    // same parse so it can use the matched API's policy when available).
    let route = parse_route(&req.path, &req.headers)?;
    let api = state
        .resolver
        .get_api(&route.api_name, &route.api_version)
        .await?
        .ok_or(GatewayError::NotFound("API001"))?;
    if !api.active {
        return Err(GatewayError::NotFound("API001"));
    }
    if !route.ingress.matches_api_type(api.api_type) {
        return Err(GatewayError::Validation("GTW011: API type does not match the requested path".into()));
    }

    let origin = req.headers.get("origin").and_then(|v| v.to_str().ok());
    if req.method == Method::OPTIONS {
        if origin.is_some() {
            return Ok(build_cors_preflight(&api.cors, origin, state.config.cors_strict));
        } else if state.config.strict_options_405 {
            return Err(GatewayError::NotFound("API001"));
        }
    }

    if !bypassed {
        state.ip_policy.check(api.api_ip_mode, &parse_all(&api.api_ip_whitelist), &parse_all(&api.api_ip_blacklist), client_ip)?;
    }

    // Step 5/6/7: identity, authorization, subscription.
    let mut username: Option<String> = None;
    let mut authed_user: Option<crate::models::User> = None;
    if !api.api_public && api.api_auth_required {
        let token = bearer_token(&req.headers).ok_or(GatewayError::Authentication("AUTHN001"))?;
        let csrf = req.headers.get("x-csrf-token").and_then(|v| v.to_str().ok());
        let claims = state.identity.verify(token, csrf, true)?;
        username = Some(claims.sub.clone());

        let user = state
            .resolver
            .get_user(&claims.sub, Some(&claims.sub))
            .await?
            .ok_or(GatewayError::Authentication("AUTHN001"))?;

        if user.username != SUPER_ADMIN_USERNAME {
            let role = state.resolver.get_role(&user.role).await?.unwrap_or_default();
            if !authz::is_authorized(&api, &role.role_name, &user.groups) {
                return Err(GatewayError::Authorization("API007"));
            }
            let subscription = state.resolver.get_subscriptions(&user.username).await?;
            if !authz::is_subscribed(&api, &subscription) {
                return Err(GatewayError::NotSubscribed("SUB003"));
            }
        }

        // Step 11: limiters.
        let tier = match &user.tier_id {
            Some(id) => state.resolver.get_tier(id).await?,
            None => None,
        };
        state.limiter.enforce_rate_and_tier(&user, tier.as_ref()).await?;
        state.limiter.enforce_throttle(&user, tier.as_ref()).await?;
        let content_length = req.body.len() as u64;
        state.limiter.enforce_bandwidth_pre(&user, content_length)?;
        if api.api_credits_enabled {
            if let Some(group) = &api.api_credit_group {
                state.limiter.enforce_credits(&state.store, &user.username, group).await?;
            }
        }
        authed_user = Some(user);
    }

    // Step 9/10: endpoint resolution + validation (REST/SOAP carry a tail;
    // GraphQL validates `variables`, not the whole `{query, variables,
    // operationName}` envelope).
    let endpoint = state.resolver.get_endpoint(&api, req.method.as_str(), &route.tail).await?;
    let mut graphql_request: Option<graphql::GraphqlRequest> = None;
    if matches!(route.ingress, Ingress::Graphql) {
        graphql_request = Some(
            serde_json::from_slice(&req.body).map_err(|_| GatewayError::Validation("GTW011: malformed GraphQL request".into()))?,
        );
    }
    if let Some(schema) = endpoint.as_ref().and_then(|e| e.validation_schema.as_ref()) {
        match route.ingress {
            Ingress::Soap => {
                let body_str = std::str::from_utf8(&req.body).unwrap_or("");
                let required_paths: Vec<String> = schema
                    .get("required")
                    .and_then(serde_json::Value::as_array)
                    .map(|paths| paths.iter().filter_map(|p| p.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                soap::validate_body_children(body_str, &required_paths)?;
            }
            Ingress::Graphql => {
                validation::validate(schema, &graphql_request.as_ref().expect("parsed above").variables)?;
            }
            _ => {
                if let Ok(body_json) = serde_json::from_slice::<serde_json::Value>(&req.body) {
                    validation::validate(schema, &body_json)?;
                }
            }
        }
    }

    let mut forwarded_body = req.body.clone();
    let mut grpc_package: Option<String> = None;
    let mut grpc_web_text = false;
    let is_grpc_web = matches!(route.ingress, Ingress::GrpcWeb);

    match route.ingress {
        Ingress::Graphql => {
            let gql = graphql_request.as_ref().expect("parsed above");
            if graphql::is_subscription(&gql.query) {
                return Err(GatewayError::Validation("GTW011: subscriptions are not supported".into()));
            }
            graphql::check_depth(&gql.query, 10)?;
            graphql::check_complexity(&gql.query, 200)?;
        }
        Ingress::Grpc => {
            let grpc_req: grpc::GrpcRequest = serde_json::from_slice(&req.body)
                .map_err(|_| GatewayError::Validation("GTW011: malformed gRPC request".into()))?;
            let (service, method) = grpc::split_service_method(&grpc_req.method)?;
            grpc::check_allowed(&api, &service, &method)?;
            grpc_package = Some(grpc::resolve_package(&api, grpc_req.package.as_deref())?);
            forwarded_body = serde_json::to_vec(&grpc_req.message).unwrap_or_default();
        }
        Ingress::GrpcWeb => {
            let content_type = req.headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
            grpc_web_text = content_type.contains("grpc-web-text");
            let decoded = if grpc_web_text {
                grpc::decode_grpc_web_text(std::str::from_utf8(&req.body).unwrap_or_default())?
            } else {
                grpc::decode_grpc_web_frame(&req.body)?
            };
            let message: serde_json::Value = serde_json::from_slice(&decoded)
                .map_err(|_| GatewayError::Validation("GTW011: malformed gRPC-Web message".into()))?;
            let (service, method) = route
                .tail
                .split_once('.')
                .ok_or_else(|| GatewayError::Validation("GTW011: malformed gRPC-Web path".into()))?;
            grpc::check_allowed(&api, service, method)?;
            grpc_package = Some(grpc::resolve_package(&api, None)?);
            forwarded_body = serde_json::to_vec(&message).unwrap_or_default();
        }
        _ => {}
    }

    // Step 12: upstream selection.
    let client_key = req.headers.get("client-key").and_then(|v| v.to_str().ok());
    let endpoint_for_routing = endpoint.clone().unwrap_or_else(|| crate::models::Endpoint {
        endpoint_id: String::new(),
        api_name: api.api_name.clone(),
        api_version: api.api_version.clone(),
        endpoint_method: req.method.to_string(),
        endpoint_uri: route.tail.clone(),
        endpoint_servers: vec![],
        validation_schema: None,
    });
    let router = Router { resolver: &state.resolver, cache: &state.cache };
    let chosen = router.choose(&api, &endpoint_for_routing, client_key).await?;
    let chosen_base_url = if matches!(route.ingress, Ingress::Grpc | Ingress::GrpcWeb) {
        normalize_grpc_scheme(&chosen.base_url)
    } else {
        chosen.base_url.clone()
    };
    let base_url = crate::router::rewrite_for_docker(
        &strip_and_join(&chosen_base_url, &route.ingress, &api, &route.tail),
        &state.config,
    );

    // Step 13: header prep.
    let mut outbound_headers = hygiene::sanitize_outbound(&req.headers, &[]);
    if let Some(swap_header) = &api.api_authorization_field_swap {
        hygiene::apply_authorization_swap(&mut outbound_headers, &req.headers, swap_header);
    }
    if api.api_credits_enabled {
        if let Some(group) = &api.api_credit_group {
            if let Some(credit_group) = state.resolver.get_credit_group(group).await? {
                // §4.5/§4.9.1: a user-specific `user_api_key` overrides the
                // credit group's shared upstream key.
                let user_key = match &authed_user {
                    Some(user) => state
                        .resolver
                        .get_user_credits(&user.username, group)
                        .await?
                        .and_then(|c| c.user_api_key),
                    None => None,
                };
                let header_value = match &user_key {
                    Some(key) => HeaderValue::from_str(key).ok(),
                    None => HeaderValue::from_bytes(&credit_group.upstream_api_key_encrypted).ok(),
                };
                if let Some(v) = header_value {
                    outbound_headers.insert(
                        http::HeaderName::try_from(credit_group.upstream_header_name.as_str())
                            .unwrap_or(http::header::AUTHORIZATION),
                        v,
                    );
                }
            }
        }
    }
    if matches!(route.ingress, Ingress::Soap) {
        if let Some(ct) = req.headers.get("content-type").and_then(|v| v.to_str().ok()) {
            if let Ok(v) = HeaderValue::from_str(&soap::upstream_content_type(ct)) {
                outbound_headers.insert(http::header::CONTENT_TYPE, v);
            }
        }
        if !outbound_headers.contains_key("soapaction") {
            outbound_headers.insert("soapaction", HeaderValue::from_str(&soap::default_soap_action(None)).unwrap());
        }
    }
    if let Some(package) = &grpc_package {
        if let Ok(v) = HeaderValue::from_str(package) {
            outbound_headers.insert("x-grpc-package", v);
        }
    }

    // Step 14: invoke upstream.
    let api_key = format!("{:?}:{}/{}", api.api_type, api.api_name, api.api_version);
    let resp = state
        .invoker
        .call(CallParams {
            api_key: &api_key,
            method: req.method.clone(),
            url: base_url,
            headers: outbound_headers,
            body: forwarded_body,
            retries: api.api_allowed_retry_count,
            connect_timeout: api.timeouts.connect_secs.map(std::time::Duration::from_secs_f64).unwrap_or(state.config.http_connect_timeout),
            total_timeout: api.timeouts.read_secs.map(std::time::Duration::from_secs_f64).unwrap_or(state.config.http_timeout),
        }, &state.metrics)
        .await?;

    let status = resp.status().as_u16();
    let upstream_headers = resp.headers().clone();
    let upstream_body = resp.bytes().await.map_err(GatewayError::from)?.to_vec();

    // Step 16: post-request bandwidth accounting covers request + response
    // bytes, evaluated only now that the upstream body is known.
    if let Some(user) = &authed_user {
        let accounted_bytes = req.body.len() as u64 + upstream_body.len() as u64;
        state.limiter.account_bandwidth_post(user, accounted_bytes);
    }

    // Step 15: response envelope. gRPC upstreams may report a textual
    // status instead of a real HTTP status (§4.9.4 status mapping).
    let effective_status = if grpc_package.is_some() {
        upstream_headers
            .get("grpc-status")
            .and_then(|v| v.to_str().ok())
            .map(grpc::status_to_http)
            .unwrap_or(status)
    } else {
        status
    };

    let mut envelope = if is_grpc_web {
        let framed = grpc::encode_grpc_web_frame(&upstream_body);
        let body_out = if grpc_web_text {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD.encode(&framed).into_bytes()
        } else {
            framed
        };
        let mut headers = HeaderMap::new();
        let ct = if grpc_web_text { "application/grpc-web-text+proto" } else { "application/grpc-web+proto" };
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(ct));
        OutgoingResponse { status: effective_status, headers, body: body_out }
    } else {
        build_envelope(state.config.strict_response_envelope, effective_status, request_id, &upstream_headers, &upstream_body)
    };
    // Step 3 (otherwise branch): every non-preflight response carries CORS
    // headers too, not just the OPTIONS preflight.
    apply_cors_headers(&mut envelope.headers, &api.cors, origin, state.config.cors_strict);
    let _ = username;
    Ok(envelope)
}

/// `grpc(s)://` upstream server URLs translate to `http(s)://` for the
/// JSON-over-HTTP invoker (§4.9.4 transport).
fn normalize_grpc_scheme(url: &str) -> String {
    let Some((_, authority)) = url.split_once("://") else { return url.to_string() };
    let scheme = if grpc::is_secure_channel(url) { "https" } else { "http" };
    format!("{scheme}://{authority}")
}

fn strip_and_join(base: &str, ingress: &Ingress, api: &crate::models::Api, tail: &str) -> String {
    let path = match ingress {
        Ingress::Rest | Ingress::Soap => rest::upstream_path(&api.api_name, &api.api_version, tail),
        _ => format!("/{}", api.api_name),
    };
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(http::header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

/// Decide the `Access-Control-Allow-Origin` echo (§6, §8 boundary):
/// credentialed responses can never echo the bare wildcard, and
/// `cors_strict` additionally forbids wildcard-echoing an unlisted origin
/// even without credentials, requiring an exact match from `allow_origins`.
fn resolve_allowed_origin(cors: &crate::models::CorsPolicy, origin: Option<&str>, strict: bool) -> Option<String> {
    let wildcard = cors.allow_origins.iter().any(|o| o == "*");
    if let Some(origin) = origin {
        if cors.allow_origins.iter().any(|o| o == origin) {
            return Some(origin.to_string());
        }
        if wildcard && !cors.allow_credentials && !strict {
            return Some("*".to_string());
        }
        return None;
    }
    if wildcard && !cors.allow_credentials {
        return Some("*".to_string());
    }
    cors.allow_origins.first().cloned()
}

/// Attach the CORS response headers (§6) for a given request's `Origin` and
/// the matched API's policy; a no-op when no allowed origin resolves.
fn apply_cors_headers(headers: &mut HeaderMap, cors: &crate::models::CorsPolicy, origin: Option<&str>, strict: bool) {
    let Some(allowed) = resolve_allowed_origin(cors, origin, strict) else { return };
    if let Ok(v) = HeaderValue::from_str(&allowed) {
        headers.insert("access-control-allow-origin", v);
    }
    if let Ok(v) = HeaderValue::from_str(&cors.allow_methods.join(",")) {
        headers.insert("access-control-allow-methods", v);
    }
    if let Ok(v) = HeaderValue::from_str(&cors.allow_headers.join(",")) {
        headers.insert("access-control-allow-headers", v);
    }
    if cors.allow_credentials {
        headers.insert("access-control-allow-credentials", HeaderValue::from_static("true"));
    }
    if !cors.expose_headers.is_empty() {
        if let Ok(v) = HeaderValue::from_str(&cors.expose_headers.join(",")) {
            headers.insert("access-control-expose-headers", v);
        }
    }
    headers.insert(http::header::VARY, HeaderValue::from_static("Origin"));
}

fn build_cors_preflight(cors: &crate::models::CorsPolicy, origin: Option<&str>, strict: bool) -> OutgoingResponse {
    let mut headers = HeaderMap::new();
    apply_cors_headers(&mut headers, cors, origin, strict);
    OutgoingResponse { status: 204, headers, body: vec![] }
}

fn build_envelope(strict: bool, status: u16, request_id: &str, upstream_headers: &HeaderMap, body: &[u8]) -> OutgoingResponse {
    if !strict {
        let mut headers = HeaderMap::new();
        if let Some(ct) = upstream_headers.get(http::header::CONTENT_TYPE) {
            headers.insert(http::header::CONTENT_TYPE, ct.clone());
        }
        return OutgoingResponse { status, headers, body: body.to_vec() };
    }
    let response_body: serde_json::Value = serde_json::from_slice(body).unwrap_or(serde_json::Value::String(String::from_utf8_lossy(body).to_string()));
    let envelope = serde_json::json!({
        "status_code": status,
        "response_headers": {"request_id": request_id},
        "response": response_body,
    });
    let mut headers = HeaderMap::new();
    headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    OutgoingResponse { status, headers, body: serde_json::to_vec(&envelope).unwrap_or_default() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_path_parses_name_version_and_tail() {
        let headers = HeaderMap::new();
        let route = parse_route("/api/rest/demo/v1/users/42", &headers).unwrap();
        assert!(matches!(route.ingress, Ingress::Rest));
        assert_eq!(route.api_name, "demo");
        assert_eq!(route.api_version, "v1");
        assert_eq!(route.tail, "users/42");
    }

    #[test]
    fn graphql_path_reads_version_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-version", HeaderValue::from_static("v2"));
        let route = parse_route("/api/graphql/demo", &headers).unwrap();
        assert!(matches!(route.ingress, Ingress::Graphql));
        assert_eq!(route.api_version, "v2");
    }

    #[test]
    fn unrecognized_path_is_not_found() {
        let headers = HeaderMap::new();
        assert!(parse_route("/nope", &headers).is_err());
    }

    #[test]
    fn correlation_id_is_reused_when_present() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc-123"));
        assert_eq!(correlation_id(&headers), "abc-123");
    }

    #[test]
    fn grpc_web_path_combines_service_and_method_into_tail() {
        let headers = HeaderMap::new();
        let route = parse_route("/grpc-web/billing/Billing/Charge", &headers).unwrap();
        assert!(matches!(route.ingress, Ingress::GrpcWeb));
        assert_eq!(route.tail, "Billing.Charge");
    }

    #[test]
    fn grpc_scheme_normalizes_to_http_and_https() {
        assert_eq!(normalize_grpc_scheme("grpc://upstream:9090"), "http://upstream:9090");
        assert_eq!(normalize_grpc_scheme("grpcs://upstream:9090"), "https://upstream:9090");
    }
}
