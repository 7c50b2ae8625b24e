//! REST Protocol Adapter (§4.9.1).

use crate::models::Endpoint;
use crate::resolver::endpoint_uri_matches;

pub const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Build the upstream path: `/{api_name}/{api_version}/{tail}`, tail
/// forwarded verbatim (`{param}` wildcards are captured for matching only,
/// never substituted).
pub fn upstream_path(api_name: &str, api_version: &str, tail: &str) -> String {
    let tail = tail.trim_start_matches('/');
    if tail.is_empty() {
        format!("/{api_name}/{api_version}")
    } else {
        format!("/{api_name}/{api_version}/{tail}")
    }
}

pub fn find_matching_endpoint<'a>(endpoints: &'a [Endpoint], method: &str, tail: &str) -> Option<&'a Endpoint> {
    let method = method.to_uppercase();
    endpoints
        .iter()
        .find(|e| e.endpoint_method == method && endpoint_uri_matches(&e.endpoint_uri, tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_path_forwards_tail_verbatim() {
        assert_eq!(upstream_path("demo", "v1", "/users/42"), "/demo/v1/users/42");
        assert_eq!(upstream_path("demo", "v1", ""), "/demo/v1");
    }

    #[test]
    fn method_and_uri_both_must_match() {
        let endpoints = vec![Endpoint {
            endpoint_id: "e1".into(),
            api_name: "demo".into(),
            api_version: "v1".into(),
            endpoint_method: "GET".into(),
            endpoint_uri: "/users/{id}".into(),
            endpoint_servers: vec![],
            validation_schema: None,
        }];
        assert!(find_matching_endpoint(&endpoints, "GET", "/users/42").is_some());
        assert!(find_matching_endpoint(&endpoints, "POST", "/users/42").is_none());
    }
}
