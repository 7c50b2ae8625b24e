//! gRPC Protocol Adapter (§4.9.4).
//!
//! Dynamic protobuf descriptor reflection (loading generated `_pb2`-style
//! modules at runtime and mapping JSON through them) needs a descriptor-
//! reflection crate; none is available in the example pack's dependency
//! set, and fabricating one is out of scope (see DESIGN.md). This adapter
//! implements everything around that boundary — package/service/method
//! resolution and allow-listing, TLS-vs-plaintext channel selection, gRPC
//! status mapping, and gRPC-Web frame decoding — and forwards the JSON
//! message to the resolved upstream over the same resilient invoker REST
//! calls use, trusting the upstream to speak JSON-over-HTTP at that route.

use crate::error::{GatewayError, Result};
use crate::models::Api;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GrpcRequest {
    pub method: String,
    pub message: serde_json::Value,
    #[serde(default)]
    pub package: Option<String>,
}

/// Resolution order (§4.9.4): API-pinned package, then request-supplied
/// package (subject to allow-list), then a name derived from
/// `api_name_api_version_pb2`.
pub fn resolve_package(api: &Api, requested: Option<&str>) -> Result<String> {
    if let Some(pinned) = &api.api_grpc_package {
        return Ok(pinned.clone());
    }
    if let Some(requested) = requested {
        if !api.api_grpc_allowed_packages.is_empty() && !api.api_grpc_allowed_packages.iter().any(|p| p == requested) {
            return Err(GatewayError::Authorization("GRPC001"));
        }
        return Ok(requested.to_string());
    }
    let derived = format!("{}_{}", api.api_name, api.api_version).replace('-', "_");
    Ok(format!("{derived}_pb2"))
}

pub fn split_service_method(dotted: &str) -> Result<(String, String)> {
    dotted
        .split_once('.')
        .map(|(s, m)| (s.to_string(), m.to_string()))
        .ok_or_else(|| GatewayError::Validation("GTW011: method must be `Service.Method`".into()))
}

pub fn check_allowed(api: &Api, service: &str, method: &str) -> Result<()> {
    if !api.api_grpc_allowed_services.is_empty() && !api.api_grpc_allowed_services.iter().any(|s| s == service) {
        return Err(GatewayError::Authorization("GRPC001"));
    }
    let full = format!("{service}.{method}");
    if !api.api_grpc_allowed_methods.is_empty() && !api.api_grpc_allowed_methods.iter().any(|m| m == &full) {
        return Err(GatewayError::Authorization("GRPC001"));
    }
    Ok(())
}

pub fn is_secure_channel(server_url: &str) -> bool {
    server_url.starts_with("grpcs://")
}

/// gRPC status code -> HTTP status, per §4.9.4.
pub fn status_to_http(grpc_status: &str) -> u16 {
    match grpc_status {
        "OK" => 200,
        "PERMISSION_DENIED" => 403,
        "NOT_FOUND" => 404,
        "INVALID_ARGUMENT" => 400,
        "UNAVAILABLE" => 503,
        _ => 502,
    }
}

/// Decode a gRPC-Web framed payload: 1 compression-flag byte, 4 big-endian
/// length bytes, then the message bytes (repeated for trailers, which this
/// adapter ignores since it only needs the leading data frame).
pub fn decode_grpc_web_frame(frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < 5 {
        return Err(GatewayError::Validation("GTW011: truncated grpc-web frame".into()));
    }
    let len = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;
    let body = &frame[5..];
    if body.len() < len {
        return Err(GatewayError::Validation("GTW011: grpc-web frame length mismatch".into()));
    }
    Ok(body[..len].to_vec())
}

pub fn decode_grpc_web_text(base64_frame: &str) -> Result<Vec<u8>> {
    let raw = BASE64
        .decode(base64_frame.trim())
        .map_err(|_| GatewayError::Validation("GTW011: invalid grpc-web-text base64".into()))?;
    decode_grpc_web_frame(&raw)
}

/// Frame a reply payload for gRPC-Web: 1 zero compression-flag byte, 4
/// big-endian length bytes, then the payload (§4.9.4 decode/encode symmetry).
pub fn encode_grpc_web_frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(5 + payload.len());
    framed.push(0u8);
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_api() -> Api {
        Api {
            api_id: "id-1".into(),
            api_name: "billing".into(),
            api_version: "v1".into(),
            api_type: crate::models::ApiType::Grpc,
            api_servers: vec!["grpc://upstream:9090".into()],
            api_public: false,
            api_auth_required: true,
            api_allowed_roles: vec![],
            api_allowed_groups: vec![],
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
            api_grpc_allowed_packages: vec!["billing_pb".to_string()],
            api_grpc_allowed_services: vec!["Billing".to_string()],
            api_grpc_allowed_methods: vec!["Billing.Charge".to_string()],
            active: true,
        }
    }

    #[test]
    fn derived_package_name_matches_naming_convention() {
        let mut api = sample_api();
        api.api_grpc_allowed_packages.clear();
        let resolved = resolve_package(&api, None).unwrap();
        assert_eq!(resolved, "billing_v1_pb2");
    }

    #[test]
    fn requested_package_outside_allowlist_is_rejected() {
        let api = sample_api();
        assert!(resolve_package(&api, Some("evil_pkg")).is_err());
        assert!(resolve_package(&api, Some("billing_pb")).is_ok());
    }

    #[test]
    fn disallowed_method_is_rejected() {
        let api = sample_api();
        assert!(check_allowed(&api, "Billing", "Charge").is_ok());
        assert!(check_allowed(&api, "Billing", "Refund").is_err());
    }

    #[test]
    fn status_mapping_matches_spec_table() {
        assert_eq!(status_to_http("OK"), 200);
        assert_eq!(status_to_http("NOT_FOUND"), 404);
        assert_eq!(status_to_http("SOMETHING_ELSE"), 502);
    }

    #[test]
    fn grpc_web_frame_round_trips() {
        let payload = b"hello";
        let mut frame = vec![0u8];
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(payload);
        assert_eq!(decode_grpc_web_frame(&frame).unwrap(), payload);
    }

    #[test]
    fn secure_scheme_detection() {
        assert!(is_secure_channel("grpcs://host:443"));
        assert!(!is_secure_channel("grpc://host:9090"));
    }

    #[test]
    fn grpc_web_frame_encode_decode_round_trips() {
        let payload = br#"{"ok":true}"#;
        let framed = encode_grpc_web_frame(payload);
        assert_eq!(decode_grpc_web_frame(&framed).unwrap(), payload);
    }
}
