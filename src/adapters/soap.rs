//! SOAP Protocol Adapter (§4.9.2).

use crate::error::{GatewayError, Result};

/// Normalize the incoming content-type for the upstream call:
/// `application/xml` is rewritten to `text/xml; charset=utf-8`; `text/xml`
/// and `application/soap+xml` pass through unchanged.
pub fn upstream_content_type(incoming: &str) -> String {
    let lower = incoming.to_ascii_lowercase();
    if lower.starts_with("application/xml") {
        "text/xml; charset=utf-8".to_string()
    } else {
        incoming.to_string()
    }
}

pub fn default_soap_action(existing: Option<&str>) -> String {
    existing.unwrap_or("").to_string()
}

/// Minimal structural validation: every configured child-element path must
/// be present somewhere under the SOAP Body. Schema format mirrors the
/// endpoint validation schema's `required` list of dotted element paths.
pub fn validate_body_children(body_xml: &str, required_paths: &[String]) -> Result<()> {
    for path in required_paths {
        let leaf = path.rsplit('.').next().unwrap_or(path);
        let opening = format!("<{leaf}");
        if !body_xml.contains(&opening) {
            return Err(GatewayError::Validation(format!("GTW011: missing required SOAP element `{path}`")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_xml_is_rewritten_to_text_xml() {
        assert_eq!(upstream_content_type("application/xml"), "text/xml; charset=utf-8");
        assert_eq!(upstream_content_type("text/xml"), "text/xml");
        assert_eq!(upstream_content_type("application/soap+xml"), "application/soap+xml");
    }

    #[test]
    fn missing_element_path_fails_validation() {
        let body = "<soap:Body><Request><Name>x</Name></Request></soap:Body>";
        assert!(validate_body_children(body, &["Request.Name".to_string()]).is_ok());
        assert!(validate_body_children(body, &["Request.Age".to_string()]).is_err());
    }
}
