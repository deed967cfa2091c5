//! Debounce marker protocol.
//!
//! Every debounced submission writes a fresh marker `(key -> debounce id)`
//! to a shared store before the envelope is queued. The write happens at
//! submission time, not execution time, so an earlier still-pending job can
//! recognize it has been superseded. The store only needs single-key
//! `set`-with-expiry and `get`: markers are last-write-wins, never merged,
//! never deleted by the worker, and expire on their own.
//!
//! Key derivation is pure: actor name, effective event name, and the
//! configured key-field fragments of the first argument. Two submissions
//! debounce each other only when every configured field is equal.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::envelope::ArgValue;
use crate::scheduling::KeyField;
use crate::types::{Result, SubscriberId};

// =============================================================================
// Key derivation
// =============================================================================

/// Derive the debounce key for one submission.
///
/// Shape: `{actor}-{effective_event}` plus one `-{fragment}` per configured
/// key field, rendered from the first argument. With no arguments the
/// field-derived suffix is omitted entirely. A selector that misses (wrong
/// kind, absent field, out-of-range index) contributes an empty fragment,
/// so it still participates in equality.
pub fn derive_key(
    actor: &SubscriberId,
    effective_event: &str,
    key_fields: &[KeyField],
    arguments: &[ArgValue],
) -> String {
    let mut key = format!("{}-{}", actor.as_str(), effective_event);

    if let Some(first) = arguments.first() {
        for field in key_fields {
            let fragment = match field {
                KeyField::Name(name) => first.field(name),
                KeyField::Index(index) => first.element(*index),
            }
            .map(ArgValue::key_fragment)
            .unwrap_or_default();

            key.push('-');
            key.push_str(&fragment);
        }
    }

    key
}

// =============================================================================
// MarkerStore
// =============================================================================

/// Thin client contract over the shared key-value store.
///
/// Implementations are expected to provide last-write-wins semantics for
/// `set` and plain reads for `get`; no compare-and-swap or multi-key
/// transaction is assumed to exist.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value, expiring
    /// after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Read the current value under `key`, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

impl std::fmt::Debug for dyn MarkerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarkerStore")
    }
}

// =============================================================================
// InMemoryMarkerStore
// =============================================================================

#[derive(Debug, Clone)]
struct MarkerEntry {
    value: String,
    expires_at: Instant,
}

/// In-process marker store for tests and single-node development.
///
/// Expiry is checked lazily on read; expired entries are pruned when seen.
#[derive(Debug, Default)]
pub struct InMemoryMarkerStore {
    entries: RwLock<HashMap<String, MarkerEntry>>,
}

impl InMemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarkerStore for InMemoryMarkerStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = MarkerEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        tracing::debug!(key, ttl_secs = ttl.as_secs(), "wrote debounce marker");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }

        // Entry expired: prune under the write lock, re-checking in case a
        // concurrent set replaced it meanwhile.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key);
        }
        Ok(None)
    }
}

// =============================================================================
// Tests
// =============================================================================
