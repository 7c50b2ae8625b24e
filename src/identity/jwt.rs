//! Manual JWT mint/verify with an explicit algorithm whitelist.
//!
//! Adapted from the gateway's JWT validator: base64url header/payload/signature
//! parsing, HMAC-SHA256 or RSA-SHA256 signature verification, with the
//! algorithm read from the decoded header and checked against the
//! configured whitelist before any signature check runs — this is what
//! rejects `alg: none` and alg-switching attacks, rather than trusting the
//! attacker-supplied header to pick the verification path.

use crate::error::{GatewayError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rsa::pkcs1v15::{SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Hs256,
    Rs256,
}

impl Algorithm {
    fn as_str(self) -> &'static str {
        match self {
            Algorithm::Hs256 => "HS256",
            Algorithm::Rs256 => "RS256",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "HS256" => Some(Algorithm::Hs256),
            "RS256" => Some(Algorithm::Rs256),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub accesses: HashMap<String, bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Signing keys, keyed by algorithm. At least one must be configured.
pub enum SigningKeyMaterial {
    Hmac(Vec<u8>),
    Rsa(Box<RsaPrivateKey>),
}

pub struct JwtCodec {
    algorithm: Algorithm,
    key: SigningKeyMaterial,
    allowed: Vec<Algorithm>,
}

impl JwtCodec {
    pub fn hmac(secret: &str) -> Self {
        Self {
            algorithm: Algorithm::Hs256,
            key: SigningKeyMaterial::Hmac(secret.as_bytes().to_vec()),
            allowed: vec![Algorithm::Hs256],
        }
    }

    pub fn rsa(pem: &str) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| GatewayError::Configuration(format!("invalid RSA key: {e}")))?;
        Ok(Self {
            algorithm: Algorithm::Rs256,
            key: SigningKeyMaterial::Rsa(Box::new(key)),
            allowed: vec![Algorithm::Rs256],
        })
    }

    pub fn mint(&self, claims: &Claims) -> Result<String> {
        let header = Header { alg: self.algorithm.as_str().to_string(), typ: "JWT".to_string() };
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signing_input = format!("{header_b64}.{payload_b64}");

        let sig = match &self.key {
            SigningKeyMaterial::Hmac(secret) => {
                let mut mac = HmacSha256::new_from_slice(secret)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;
                mac.update(signing_input.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
            SigningKeyMaterial::Rsa(key) => {
                let signing_key = SigningKey::<Sha256>::new(key.as_ref().clone());
                signing_key.sign(signing_input.as_bytes()).to_vec()
            }
        };
        let sig_b64 = URL_SAFE_NO_PAD.encode(sig);
        Ok(format!("{signing_input}.{sig_b64}"))
    }

    /// Verify signature and algorithm whitelist; caller checks `exp`/`jti`
    /// revocation separately (see `identity::IdentityManager::verify`).
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(GatewayError::Authentication("AUTHN001"));
        }
        let header_bytes = URL_SAFE_NO_PAD
            .decode(parts[0])
            .map_err(|_| GatewayError::Authentication("AUTHN001"))?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| GatewayError::Authentication("AUTHN001"))?;

        let alg = Algorithm::parse(&header.alg).ok_or(GatewayError::Authentication("AUTHN001"))?;
        if !self.allowed.contains(&alg) || alg != self.algorithm {
            // Rejects both `alg: none` (parse fails above) and alg-switching
            // (header names an algorithm this codec was not configured with).
            return Err(GatewayError::Authentication("AUTHN001"));
        }

        let signing_input = format!("{}.{}", parts[0], parts[1]);
        let sig = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| GatewayError::Authentication("AUTHN001"))?;

        let valid = match &self.key {
            SigningKeyMaterial::Hmac(secret) => {
                let mut mac = HmacSha256::new_from_slice(secret)
                    .map_err(|e| GatewayError::Internal(e.to_string()))?;
                mac.update(signing_input.as_bytes());
                mac.verify_slice(&sig).is_ok()
            }
            SigningKeyMaterial::Rsa(key) => {
                let verifying_key = VerifyingKey::<Sha256>::new(key.to_public_key());
                let signature = rsa::pkcs1v15::Signature::try_from(sig.as_slice())
                    .map_err(|_| GatewayError::Authentication("AUTHN001"))?;
                verifying_key.verify(signing_input.as_bytes(), &signature).is_ok()
            }
        };
        if !valid {
            return Err(GatewayError::Authentication("AUTHN001"));
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| GatewayError::Authentication("AUTHN001"))?;
        let claims: Claims =
            serde_json::from_slice(&payload_bytes).map_err(|_| GatewayError::Authentication("AUTHN001"))?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        Claims {
            sub: "admin".into(),
            exp: 9_999_999_999,
            iat: 0,
            jti: "jti-1".into(),
            accesses: HashMap::new(),
        }
    }

    #[test]
    fn mint_then_verify_round_trips_claims() {
        let codec = JwtCodec::hmac("a-secret-key-that-is-long-enough");
        let token = codec.mint(&sample_claims()).unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn rejects_alg_none_header() {
        let codec = JwtCodec::hmac("a-secret-key-that-is-long-enough");
        let header_b64 = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&sample_claims()).unwrap());
        let forged = format!("{header_b64}.{payload_b64}.");
        assert!(codec.verify(&forged).is_err());
    }

    #[test]
    fn rejects_tampered_signature() {
        let codec = JwtCodec::hmac("a-secret-key-that-is-long-enough");
        let mut token = codec.mint(&sample_claims()).unwrap();
        token.push('x');
        assert!(codec.verify(&token).is_err());
    }
}
