//! Per-request diagnostic context.
//!
//! Handlers note what they are working on (address, tx hash, parameter
//! under validation) so the normalizer can fill error details without the
//! handler having to thread those values through every `?`.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Process-wide map from request id to its field map.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    inner: Arc<DashMap<Uuid, Map<String, Value>>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the fields stored for `id`.
    pub fn set(&self, id: Uuid, fields: Map<String, Value>) {
        self.inner.insert(id, fields);
    }

    /// Add or overwrite a single field. No-op if `id` has no entry.
    pub fn note(&self, id: Uuid, key: &str, value: Value) {
        if let Some(mut entry) = self.inner.get_mut(&id) {
            entry.insert(key.to_string(), value);
        }
    }

    /// Fields for `id`, or an empty map.
    pub fn get(&self, id: Uuid) -> Map<String, Value> {
        self.inner
            .get(&id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn clear(&self, id: Uuid) {
        self.inner.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Set the fields and return a guard that clears them when dropped.
    pub fn scope(&self, id: Uuid, fields: Map<String, Value>) -> ContextGuard {
        self.set(id, fields);
        ContextGuard {
            context: self.clone(),
            id,
        }
    }
}

/// Clears its request entry on drop, including during unwinding and when the
/// owning future is cancelled.
#[derive(Debug)]
pub struct ContextGuard {
    context: RequestContext,
    id: Uuid,
}

impl ContextGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.context.clear(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_get_absent_is_empty() {
        let ctx = RequestContext::new();
        assert!(ctx.get(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let ctx = RequestContext::new();
        let id = Uuid::new_v4();
        ctx.set(id, fields(&[("address", json!("0xabc"))]));
        ctx.set(id, fields(&[("tx_hash", json!("0x01"))]));
        let got = ctx.get(id);
        assert!(got.get("address").is_none());
        assert_eq!(got["tx_hash"], "0x01");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let ctx = RequestContext::new();
        let id = Uuid::new_v4();
        ctx.set(id, Map::new());
        ctx.clear(id);
        ctx.clear(id);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_note_requires_entry() {
        let ctx = RequestContext::new();
        let id = Uuid::new_v4();
        ctx.note(id, "tx_hash", json!("0x01"));
        assert!(ctx.is_empty());

        let _guard = ctx.scope(id, Map::new());
        ctx.note(id, "tx_hash", json!("0x01"));
        assert_eq!(ctx.get(id)["tx_hash"], "0x01");
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let ctx = RequestContext::new();
        let id = Uuid::new_v4();
        {
            let guard = ctx.scope(id, fields(&[("method", json!("eth_getBalance"))]));
            assert_eq!(guard.id(), id);
            assert_eq!(ctx.len(), 1);
        }
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_guard_clears_on_panic() {
        let ctx = RequestContext::new();
        let id = Uuid::new_v4();
        let inner = ctx.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = inner.scope(id, Map::new());
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_isolated() {
        let ctx = RequestContext::new();
        let mut handles = Vec::new();
        for i in 0..64u64 {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                let id = Uuid::new_v4();
                let _guard = ctx.scope(id, fields(&[("n", json!(i))]));
                tokio::task::yield_now().await;
                ctx.get(id)["n"].as_u64()
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(i as u64));
        }
        assert!(ctx.is_empty());
    }
}
