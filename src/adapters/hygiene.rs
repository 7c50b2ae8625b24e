//! Shared header hygiene for every protocol adapter (§4.9 preamble).

use http::{HeaderMap, HeaderName, HeaderValue};

const HOP_BY_HOP: &[&str] = &[
    "connection", "keep-alive", "proxy-authenticate", "proxy-authorization",
    "te", "trailer", "transfer-encoding", "upgrade", "host",
];

const SENSITIVE: &[&str] = &["authorization", "cookie", "set-cookie", "x-csrf-token", "x-internal-proxy"];

const MAX_HEADER_VALUE_LEN: usize = 8 * 1024;

/// Drop hop-by-hop and sensitive headers unless explicitly allow-listed;
/// sanitize the values that remain.
pub fn sanitize_outbound(headers: &HeaderMap, allow_sensitive: &[String]) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers.iter() {
        let lower = name.as_str().to_ascii_lowercase();
        if HOP_BY_HOP.contains(&lower.as_str()) {
            continue;
        }
        if SENSITIVE.contains(&lower.as_str()) && !allow_sensitive.iter().any(|h| h.eq_ignore_ascii_case(&lower)) {
            continue;
        }
        let Ok(text) = value.to_str() else { continue };
        let cleaned = sanitize_value(text);
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(&cleaned)) {
            out.append(name, value);
        }
    }
    out
}

/// Strip CR/LF/NUL, strip HTML tags, truncate to 8 KiB.
pub fn sanitize_value(raw: &str) -> String {
    let no_control: String = raw.chars().filter(|c| !matches!(c, '\r' | '\n' | '\0')).collect();
    let mut no_tags = String::with_capacity(no_control.len());
    let mut in_tag = false;
    for c in no_control.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => no_tags.push(c),
            _ => {}
        }
    }
    if no_tags.len() > MAX_HEADER_VALUE_LEN {
        no_tags.truncate(MAX_HEADER_VALUE_LEN);
    }
    no_tags
}

/// Move `swap_header`'s value into the upstream `Authorization` header when
/// the API configures `api_authorization_field_swap`.
pub fn apply_authorization_swap(headers: &mut HeaderMap, original: &HeaderMap, swap_header: &str) {
    if let Some(value) = original.get(swap_header) {
        if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
            headers.insert(http::header::AUTHORIZATION, value);
        }
    }
}
