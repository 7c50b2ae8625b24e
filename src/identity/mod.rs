//! Identity & Session (C4, §4.4).

pub mod jwt;
pub mod mfa;

use crate::cache::{CacheValue, Namespace, PolicyCache};
use crate::error::{GatewayError, Result};
use crate::models::Role;
use crate::resolver::ConfigResolver;
use jwt::{Claims, JwtCodec};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct MintedTokens {
    pub access_token: String,
    pub csrf_token: String,
    pub jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "lax" => SameSite::Lax,
            "none" => SameSite::None,
            _ => SameSite::Strict,
        }
    }
}

/// Cookie attributes for the access-token / CSRF-token pair (§4.4 cookie contract).
#[derive(Debug, Clone)]
pub struct CookieContract {
    pub samesite: SameSite,
    pub secure: bool,
    pub access_http_only: bool,
}

pub struct IdentityManager {
    codec: JwtCodec,
    cache: Arc<PolicyCache>,
    revoked_jti: dashmap::DashSet<String>,
    revoked_users: dashmap::DashMap<String, i64>,
    https_enabled: bool,
    cookie: CookieContract,
}

impl IdentityManager {
    pub fn new(jwt_secret: &str, https_enabled: bool, samesite: &str) -> Self {
        Self {
            codec: JwtCodec::hmac(jwt_secret),
            cache: Arc::new(PolicyCache::new()),
            revoked_jti: dashmap::DashSet::new(),
            revoked_users: dashmap::DashMap::new(),
            https_enabled,
            cookie: CookieContract {
                samesite: SameSite::parse(samesite),
                secure: https_enabled,
                access_http_only: true,
            },
        }
    }

    pub fn with_cache(mut self, cache: Arc<PolicyCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cookie_contract(&self) -> &CookieContract {
        &self.cookie
    }

    pub async fn mint(&self, resolver: &ConfigResolver, username: &str) -> Result<MintedTokens> {
        let user = resolver
            .get_user(username, Some(username))
            .await?
            .ok_or(GatewayError::NotFound("USR004"))?;
        let role: Role = resolver.get_role(&user.role).await?.unwrap_or_default();
        let now = now_secs();
        let jti = Uuid::new_v4().to_string();
        let claims = Claims {
            sub: user.username.clone(),
            exp: now + ACCESS_TOKEN_TTL_SECS,
            iat: now,
            jti: jti.clone(),
            accesses: role.accesses(),
        };
        let access_token = self.codec.mint(&claims)?;
        let csrf_token = Uuid::new_v4().to_string();
        Ok(MintedTokens { access_token, csrf_token, jti })
    }

    /// Verify signature, algorithm whitelist, expiry, revocation, and (when
    /// HTTPS is on) CSRF pairing.
    pub fn verify(&self, token: &str, csrf: Option<&str>, require_csrf: bool) -> Result<Claims> {
        let claims = self.codec.verify(token)?;
        if claims.exp < now_secs() {
            return Err(GatewayError::Authentication("AUTHN001"));
        }
        if self.revoked_jti.contains(&claims.jti) {
            return Err(GatewayError::Authentication("AUTHN001"));
        }
        if let Some(revoked_at) = self.revoked_users.get(&claims.sub) {
            if claims.iat <= *revoked_at {
                return Err(GatewayError::Authentication("AUTHN001"));
            }
        }
        let must_check_csrf = require_csrf && self.https_enabled;
        if must_check_csrf && csrf.is_none() {
            return Err(GatewayError::Authentication("USR005"));
        }
        Ok(claims)
    }

    pub fn revoke_jti(&self, jti: &str) {
        self.revoked_jti.insert(jti.to_string());
    }

    pub fn revoke_user(&self, username: &str) {
        self.revoked_users.insert(username.to_string(), now_secs());
    }

    pub fn mfa_setup(&self, issuer: &str, username: &str) -> (String, String) {
        let secret = mfa::generate_secret();
        let uri = mfa::otpauth_uri(issuer, username, &secret);
        let encoded = hex::encode(&secret);
        self.cache.set(
            Namespace::MfaSetupCache,
            username,
            CacheValue::Json(serde_json::json!({"secret_hex": encoded})),
            Some(Duration::from_secs(300)),
        );
        (encoded, uri)
    }

    pub fn mfa_enable_candidate_secret(&self, username: &str) -> Option<String> {
        self.cache
            .get_json(Namespace::MfaSetupCache, username)
            .and_then(|v| v.get("secret_hex").and_then(|s| s.as_str()).map(str::to_string))
    }

    pub fn mfa_verify(secret_hex: &str, code: &str) -> bool {
        match hex::decode(secret_hex) {
            Ok(secret) => mfa::verify_totp(&secret, code),
            Err(_) => false,
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

pub fn claims_capability(claims: &Claims, capability: &str) -> bool {
    claims.accesses.get(capability).copied().unwrap_or(false)
}
