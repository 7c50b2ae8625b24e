//! Config Resolver (§4.3): cache-then-store reads for every configuration
//! entity, repopulating the cache on miss. Enforces the super-admin ghost
//! rule centrally so it is never duplicated per handler (§9).

use crate::cache::{Namespace, PolicyCache};
use crate::error::{GatewayError, Result};
use crate::models::*;
use crate::store::{DocumentStore, Document, Filter};
use crate::value::Value;
use std::sync::Arc;

pub struct ConfigResolver {
    cache: Arc<PolicyCache>,
    store: Arc<dyn DocumentStore>,
}

fn filter_eq(field: &str, value: &str) -> Filter {
    let mut f = Filter::new();
    f.insert(field.into(), Value::String(value.into()));
    f
}

fn doc_to_json(doc: &Document) -> serde_json::Value {
    Value::Object(doc.clone()).to_json()
}

impl ConfigResolver {
    pub fn new(cache: Arc<PolicyCache>, store: Arc<dyn DocumentStore>) -> Self {
        Self { cache, store }
    }

    pub async fn get_api(&self, name: &str, version: &str) -> Result<Option<Api>> {
        let key = format!("{name}/{version}");
        if let Some(json) = self.cache.get_json(Namespace::ApiCache, &key) {
            return Ok(serde_json::from_value(json).ok());
        }
        let filter = {
            let mut f = Filter::new();
            f.insert("api_name".into(), Value::String(name.into()));
            f.insert("api_version".into(), Value::String(version.into()));
            f
        };
        let doc = self.store.find_one("apis", &filter).await?;
        match doc {
            Some(d) => {
                let json = doc_to_json(&d);
                self.cache.set_json(Namespace::ApiCache, &key, json.clone(), None);
                Ok(serde_json::from_value(json).ok())
            }
            None => Ok(None),
        }
    }

    pub async fn get_api_by_id(&self, api_id: &str) -> Result<Option<Api>> {
        if let Some(json) = self.cache.get_json(Namespace::ApiIdCache, api_id) {
            return Ok(serde_json::from_value(json).ok());
        }
        let doc = self.store.find_one("apis", &filter_eq("api_id", api_id)).await?;
        match doc {
            Some(d) => {
                let json = doc_to_json(&d);
                self.cache.set_json(Namespace::ApiIdCache, api_id, json.clone(), None);
                Ok(serde_json::from_value(json).ok())
            }
            None => Ok(None),
        }
    }

    pub async fn get_endpoint(&self, api: &Api, method: &str, uri: &str) -> Result<Option<Endpoint>> {
        let key = format!("{}:{}:{method}:{uri}", api.api_name, api.api_version);
        if let Some(json) = self.cache.get_json(Namespace::EndpointCache, &key) {
            return Ok(serde_json::from_value(json).ok());
        }
        let endpoints = self.store.find("endpoints", &filter_eq("api_name", &api.api_name), None, None).await?;
        let matched = endpoints.into_iter().find(|d| {
            let v = Value::Object(d.clone());
            v.get_path("api_version") == Some(&Value::String(api.api_version.clone()))
                && v.get_path("endpoint_method") == Some(&Value::String(method.to_uppercase()))
                && endpoint_uri_matches(v.get_path("endpoint_uri").and_then(|x| x.as_str()).unwrap_or(""), uri)
        });
        match matched {
            Some(d) => {
                let json = doc_to_json(&d);
                self.cache.set_json(Namespace::EndpointCache, &key, json.clone(), None);
                Ok(serde_json::from_value(json).ok())
            }
            None => Ok(None),
        }
    }

    /// Super-admin ghost rule: `get_user("admin")` is invisible to anyone
    /// except the admin caller itself.
    pub async fn get_user(&self, username: &str, caller: Option<&str>) -> Result<Option<User>> {
        if username == SUPER_ADMIN_USERNAME && caller != Some(SUPER_ADMIN_USERNAME) {
            return Ok(None);
        }
        if let Some(json) = self.cache.get_json(Namespace::UserCache, username) {
            return Ok(serde_json::from_value(json).ok());
        }
        let doc = self.store.find_one("users", &filter_eq("username", username)).await?;
        match doc {
            Some(d) => {
                let json = doc_to_json(&d);
                self.cache.set_json(Namespace::UserCache, username, json.clone(), None);
                Ok(serde_json::from_value(json).ok())
            }
            None => Ok(None),
        }
    }

    /// Write paths targeting the super-admin reject outright.
    pub fn reject_if_super_admin_target(&self, username: &str) -> Result<()> {
        if username == SUPER_ADMIN_USERNAME {
            return Err(GatewayError::Authorization("USR006"));
        }
        Ok(())
    }

    pub async fn get_role(&self, name: &str) -> Result<Option<Role>> {
        if let Some(json) = self.cache.get_json(Namespace::RoleCache, name) {
            return Ok(serde_json::from_value(json).ok());
        }
        let doc = self.store.find_one("roles", &filter_eq("role_name", name)).await?;
        match doc {
            Some(d) => {
                let json = doc_to_json(&d);
                self.cache.set_json(Namespace::RoleCache, name, json.clone(), None);
                Ok(serde_json::from_value(json).ok())
            }
            None => Ok(None),
        }
    }

    pub async fn get_group(&self, name: &str) -> Result<Option<Group>> {
        if let Some(json) = self.cache.get_json(Namespace::GroupCache, name) {
            return Ok(serde_json::from_value(json).ok());
        }
        let doc = self.store.find_one("groups", &filter_eq("group_name", name)).await?;
        match doc {
            Some(d) => {
                let json = doc_to_json(&d);
                self.cache.set_json(Namespace::GroupCache, name, json.clone(), None);
                Ok(serde_json::from_value(json).ok())
            }
            None => Ok(None),
        }
    }

    pub async fn get_subscriptions(&self, username: &str) -> Result<Subscription> {
        if let Some(json) = self.cache.get_json(Namespace::UserSubscriptionCache, username) {
            if let Ok(sub) = serde_json::from_value(json) {
                return Ok(sub);
            }
        }
        let doc = self.store.find_one("subscriptions", &filter_eq("username", username)).await?;
        let sub = match doc {
            Some(d) => serde_json::from_value(doc_to_json(&d)).unwrap_or_default(),
            None => Subscription { username: username.to_string(), apis: Default::default() },
        };
        self.cache
            .set_json(Namespace::UserSubscriptionCache, username, serde_json::to_value(&sub)?, None);
        Ok(sub)
    }

    pub async fn get_routing(&self, client_key: &str) -> Result<Option<Routing>> {
        if let Some(json) = self.cache.get_json(Namespace::ClientRoutingCache, client_key) {
            return Ok(serde_json::from_value(json).ok());
        }
        let doc = self.store.find_one("routings", &filter_eq("client_key", client_key)).await?;
        match doc {
            Some(d) => {
                let json = doc_to_json(&d);
                self.cache.set_json(Namespace::ClientRoutingCache, client_key, json.clone(), None);
                Ok(serde_json::from_value(json).ok())
            }
            None => Ok(None),
        }
    }

    /// Persist an updated round-robin index back onto the Routing document
    /// and its cache mirror (§4.7 step 1).
    pub async fn save_routing_index(&self, client_key: &str, new_index: usize) -> Result<()> {
        let filter = filter_eq("client_key", client_key);
        let mut patch = Document::new();
        patch.insert("server_index".into(), Value::Number(new_index as f64));
        let wrote = self.store.update_one("routings", &filter, patch).await;
        self.cache.delete(Namespace::ClientRoutingCache, client_key);
        wrote?;
        if let Some(mut routing) = self.get_routing(client_key).await? {
            routing.server_index = new_index;
            self.cache
                .set_json(Namespace::ClientRoutingCache, client_key, serde_json::to_value(&routing)?, None);
        }
        Ok(())
    }

    pub async fn get_tier(&self, tier_id: &str) -> Result<Option<Tier>> {
        let doc = self.store.find_one("tiers", &filter_eq("tier_id", tier_id)).await?;
        Ok(doc.map(|d| serde_json::from_value(doc_to_json(&d)).unwrap()))
    }

    pub async fn get_credit_group(&self, group: &str) -> Result<Option<CreditGroupDefinition>> {
        let doc = self.store.find_one("tiers", &filter_eq("api_credit_group", group)).await?;
        Ok(doc.and_then(|d| serde_json::from_value(doc_to_json(&d)).ok()))
    }

    pub async fn get_user_credits(&self, username: &str, group: &str) -> Result<Option<UserCredits>> {
        let filter = {
            let mut f = Filter::new();
            f.insert("username".into(), Value::String(username.into()));
            f.insert("api_credit_group".into(), Value::String(group.into()));
            f
        };
        let doc = self.store.find_one("tier_assignments", &filter).await?;
        Ok(doc.and_then(|d| serde_json::from_value(doc_to_json(&d)).ok()))
    }

    pub fn invalidate_api(&self, name: &str, version: &str) {
        self.cache.delete(Namespace::ApiCache, &format!("{name}/{version}"));
    }
}

/// `{param}` segments in an endpoint URI match any single path segment of
/// the incoming tail; the tail itself is forwarded verbatim (§4.9.1).
pub fn endpoint_uri_matches(pattern: &str, actual: &str) -> bool {
    let pat_segs: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let act_segs: Vec<&str> = actual.trim_matches('/').split('/').collect();
    if pat_segs.len() != act_segs.len() {
        return false;
    }
    pat_segs.iter().zip(act_segs.iter()).all(|(p, a)| {
        (p.starts_with('{') && p.ends_with('}')) || p == a
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uri_wildcards_match_any_segment() {
        assert!(endpoint_uri_matches("/users/{id}/posts", "/users/42/posts"));
        assert!(!endpoint_uri_matches("/users/{id}/posts", "/users/42/comments"));
        assert!(!endpoint_uri_matches("/users/{id}", "/users/42/posts"));
    }
}
