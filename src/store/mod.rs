//! Document Store Adapter (§4.2).
//!
//! A uniform query/update surface over durable or in-memory storage.
//! Only the in-process backend is implemented; a persistent backend would
//! sit behind the same `DocumentStore` trait. Every mutation/read of the
//! in-process backend is guarded by a single mutex, matching the "reentrant
//! mutex guards every mutation/read" requirement — true lock reentrancy
//! has no idiomatic Rust equivalent (the borrow checker already forbids
//! the self-referential re-entry the original guards against), so a plain
//! `parking_lot::Mutex` around the whole collection set is the faithful
//! translation (see DESIGN.md).

pub mod snapshot;

use crate::error::{GatewayError, Result};
use crate::value::Value;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

pub type Document = BTreeMap<String, Value>;
pub type Filter = BTreeMap<String, Value>;

fn matches(doc: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(path, expected)| {
        let wrapped = Value::Object(doc.clone());
        wrapped.get_path(path) == Some(expected)
    })
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>>;
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()>;
    async fn update_one(&self, collection: &str, filter: &Filter, patch: Document) -> Result<bool>;
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool>;
    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize>;

    /// Atomically decrement a numeric field on the matching document and
    /// return the post-decrement value, but only when it is currently `> 0`
    /// (§4.5 "Credits": the check-then-decrement happens under the same
    /// lock so two concurrent requests never both succeed against a
    /// balance of 1). Returns `Ok(None)` if no document matches or the
    /// balance is already `<= 0`.
    async fn decrement_if_positive(&self, collection: &str, filter: &Filter, field: &str) -> Result<Option<i64>>;

    /// Synchronous full-collection-set snapshot/restore, used by
    /// [`snapshot::dump`]/[`snapshot::restore`] to persist and reload state
    /// across process restarts (§10.4 bootstrap).
    fn snapshot_all(&self) -> HashMap<String, Vec<Document>>;
    fn load_all(&self, data: HashMap<String, Vec<Document>>);
}

/// In-process document store: one `Vec<Document>` per named collection,
/// guarded by a single mutex. Supports a binary-safe encrypted snapshot
/// round-trip via [`snapshot`].
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { collections: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let guard = self.collections.lock();
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)).cloned()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let guard = self.collections.lock();
        let mut matched: Vec<Document> = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).cloned().collect())
            .unwrap_or_default();
        if let Some(skip) = skip {
            matched = matched.into_iter().skip(skip).collect();
        }
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()> {
        let mut guard = self.collections.lock();
        guard.entry(collection.to_string()).or_default().push(doc);
        Ok(())
    }

    async fn update_one(&self, collection: &str, filter: &Filter, patch: Document) -> Result<bool> {
        let mut guard = self.collections.lock();
        if let Some(docs) = guard.get_mut(collection) {
            if let Some(doc) = docs.iter_mut().find(|d| matches(d, filter)) {
                for (k, v) in patch {
                    doc.insert(k, v);
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool> {
        let mut guard = self.collections.lock();
        if let Some(docs) = guard.get_mut(collection) {
            let before = docs.len();
            let mut removed = false;
            if let Some(pos) = docs.iter().position(|d| matches(d, filter)) {
                docs.remove(pos);
                removed = true;
            }
            return Ok(removed && docs.len() < before);
        }
        Ok(false)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize> {
        let guard = self.collections.lock();
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count())
            .unwrap_or(0))
    }

    async fn decrement_if_positive(&self, collection: &str, filter: &Filter, field: &str) -> Result<Option<i64>> {
        let mut guard = self.collections.lock();
        let Some(docs) = guard.get_mut(collection) else { return Ok(None) };
        let Some(doc) = docs.iter_mut().find(|d| matches(d, filter)) else { return Ok(None) };
        let current = match doc.get(field) {
            Some(Value::Number(n)) => *n as i64,
            _ => return Ok(None),
        };
        if current <= 0 {
            return Ok(None);
        }
        let updated = current - 1;
        doc.insert(field.to_string(), Value::Number(updated as f64));
        Ok(Some(updated))
    }

    fn snapshot_all(&self) -> HashMap<String, Vec<Document>> {
        self.collections.lock().clone()
    }

    fn load_all(&self, data: HashMap<String, Vec<Document>>) {
        *self.collections.lock() = data;
    }
}

pub fn store_error(msg: impl Into<String>) -> GatewayError {
    GatewayError::Store(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(username: &str, role: &str) -> Document {
        let mut d = Document::new();
        d.insert("username".into(), Value::String(username.into()));
        d.insert("role".into(), Value::String(role.into()));
        d
    }

    #[tokio::test]
    async fn insert_then_find_one_round_trips() {
        let store = InMemoryStore::new();
        store.insert_one("users", doc("alice", "editor")).await.unwrap();
        let mut filter = Filter::new();
        filter.insert("username".into(), Value::String("alice".into()));
        let found = store.find_one("users", &filter).await.unwrap();
        assert_eq!(found.unwrap().get("role"), Some(&Value::String("editor".into())));
    }

    #[tokio::test]
    async fn update_one_patches_matching_document() {
        let store = InMemoryStore::new();
        store.insert_one("users", doc("bob", "viewer")).await.unwrap();
        let mut filter = Filter::new();
        filter.insert("username".into(), Value::String("bob".into()));
        let mut patch = Document::new();
        patch.insert("role".into(), Value::String("admin".into()));
        assert!(store.update_one("users", &filter, patch).await.unwrap());
        let found = store.find_one("users", &filter).await.unwrap().unwrap();
        assert_eq!(found.get("role"), Some(&Value::String("admin".into())));
    }

    #[tokio::test]
    async fn decrement_if_positive_stops_at_zero() {
        let store = InMemoryStore::new();
        let mut d = Document::new();
        d.insert("username".into(), Value::String("carol".into()));
        d.insert("available_credits".into(), Value::Number(1.0));
        store.insert_one("credits", d).await.unwrap();
        let mut filter = Filter::new();
        filter.insert("username".into(), Value::String("carol".into()));
        let first = store.decrement_if_positive("credits", &filter, "available_credits").await.unwrap();
        assert_eq!(first, Some(0));
        let second = store.decrement_if_positive("credits", &filter, "available_credits").await.unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn delete_one_removes_exactly_one_match() {
        let store = InMemoryStore::new();
        store.insert_one("users", doc("carl", "viewer")).await.unwrap();
        let mut filter = Filter::new();
        filter.insert("username".into(), Value::String("carl".into()));
        assert!(store.delete_one("users", &filter).await.unwrap());
        assert_eq!(store.count("users", &filter).await.unwrap(), 0);
    }
}
