//! Type allow-list gating payload deserialization.
//!
//! A queued payload may come from another process or an older code revision,
//! so the codec only reconstructs non-primitive values whose type names are
//! registered here. The registry lives for the process and is shared as
//! `Arc<TypeAllowList>` between the broadcaster, the codec, and the
//! subscriber registry.
//!
//! Tests can [`snapshot`](TypeAllowList::snapshot) the state before mutating
//! it and [`restore`](TypeAllowList::restore) it afterwards.

use std::collections::BTreeSet;
use std::sync::RwLock;

use crate::envelope::value::{TYPE_CLASS, TYPE_SYMBOL, TYPE_TIMESTAMP};

/// Types every deployment accepts without registration: class references,
/// enumeration tokens, and timestamps.
pub const DEFAULT_SAFE_TYPES: [&str; 3] = [TYPE_CLASS, TYPE_SYMBOL, TYPE_TIMESTAMP];

/// Point-in-time copy of the registry, for test isolation.
#[derive(Debug, Clone)]
pub struct AllowListSnapshot {
    types: BTreeSet<String>,
    unsafe_mode: bool,
}

#[derive(Debug)]
struct Inner {
    types: BTreeSet<String>,
    unsafe_mode: bool,
}

/// Process-wide set of types permitted to survive deserialization.
#[derive(Debug)]
pub struct TypeAllowList {
    inner: RwLock<Inner>,
}

impl TypeAllowList {
    /// Create a registry seeded with [`DEFAULT_SAFE_TYPES`], enforcement on.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                types: DEFAULT_SAFE_TYPES.iter().map(|t| t.to_string()).collect(),
                unsafe_mode: false,
            }),
        }
    }

    /// Register additional type names. Idempotent and order-independent.
    pub fn register<I, S>(&self, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.write();
        for type_name in types {
            let type_name = type_name.into();
            if inner.types.insert(type_name.clone()) {
                tracing::debug!(%type_name, "registered safe type");
            }
        }
    }

    /// Trust a subscriber's type name because it was attached to a signal.
    ///
    /// This is the trust-on-subscribe policy: subscribing a type implies it
    /// must round-trip through the queue, so the subscription path calls
    /// this exactly once per registration.
    pub fn trust_subscriber(&self, name: &str) {
        tracing::debug!(subscriber = name, "trusting subscribed type");
        self.register([name]);
    }

    /// Whether a type name is currently accepted.
    pub fn is_allowed(&self, type_name: &str) -> bool {
        let inner = self.read();
        inner.unsafe_mode || inner.types.contains(type_name)
    }

    /// Snapshot of the currently registered type names.
    pub fn allowed_types(&self) -> BTreeSet<String> {
        self.read().types.clone()
    }

    /// Disable enforcement entirely: any type decodes.
    ///
    /// This is an explicit opt-out, not a default, and is logged loudly so
    /// it stands out in audit trails.
    pub fn use_unsafe_mode(&self) {
        self.write().unsafe_mode = true;
        tracing::warn!("type allow-list enforcement DISABLED: decoding accepts any type");
    }

    /// Whether enforcement is disabled.
    pub fn unsafe_mode(&self) -> bool {
        self.read().unsafe_mode
    }

    /// Capture the full registry state.
    pub fn snapshot(&self) -> AllowListSnapshot {
        let inner = self.read();
        AllowListSnapshot {
            types: inner.types.clone(),
            unsafe_mode: inner.unsafe_mode,
        }
    }

    /// Reset the registry to a previously captured state.
    pub fn restore(&self, snapshot: AllowListSnapshot) {
        let mut inner = self.write();
        inner.types = snapshot.types;
        inner.unsafe_mode = snapshot.unsafe_mode;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        // Lock poisoning only happens if a writer panicked; the set itself
        // is always structurally valid, so recover the guard.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TypeAllowList {
    fn default() -> Self {
        Self::new()
    }
}
