//! Subscriber contract and registry.
//!
//! An [`EventSubscriber`] is the target of deferred deliveries. Besides its
//! handler entry point it exposes two optional capability hooks — static job
//! options and static schedule options — with empty defaults, checked once
//! at resolution time.
//!
//! The [`SubscriberRegistry`] maps subscriber names to instances so the
//! worker can resolve an envelope's actor back to a handler. Registration
//! also trusts the subscriber's type name in the allow-list
//! (trust-on-subscribe): attaching a type to a signal implies it must
//! round-trip through the queue.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::allowlist::TypeAllowList;
use crate::envelope::ArgValue;
use crate::scheduling::{JobOptions, ScheduleOptions};
use crate::types::Result;

/// A subscriber that receives deferred event deliveries.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Stable name identifying this subscriber type. Used as the envelope's
    /// actor, for registry lookup, and as the debounce key prefix.
    fn name(&self) -> &str;

    /// Static job options (queue placement, debounce block).
    fn job_options(&self) -> JobOptions {
        JobOptions::empty()
    }

    /// Static schedule options (top-level and per-event delays).
    fn schedule_options(&self) -> ScheduleOptions {
        ScheduleOptions::empty()
    }

    /// Invoke the handler for `event_name` with positional `arguments`.
    ///
    /// Implementations should return
    /// [`Error::NoSuchHandler`](crate::types::Error::NoSuchHandler) for
    /// events they do not handle, and surface handler failures as
    /// [`Error::Handler`](crate::types::Error::Handler); both propagate
    /// unchanged to the job runtime.
    async fn handle_event(&self, event_name: &str, arguments: &[ArgValue]) -> Result<ArgValue>;
}

impl std::fmt::Debug for dyn EventSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventSubscriber({})", self.name())
    }
}

/// Registry of subscribers reachable at delivery time.
#[derive(Debug)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<String, Arc<dyn EventSubscriber>>>,
    allow_list: Arc<TypeAllowList>,
}

impl SubscriberRegistry {
    pub fn new(allow_list: Arc<TypeAllowList>) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            allow_list,
        }
    }

    /// Register a subscriber under its name and trust its type.
    ///
    /// Registering the same name again replaces the previous instance.
    pub async fn register(&self, subscriber: Arc<dyn EventSubscriber>) {
        let name = subscriber.name().to_string();
        self.allow_list.trust_subscriber(&name);

        let mut subscribers = self.subscribers.write().await;
        if subscribers.insert(name.clone(), subscriber).is_some() {
            tracing::debug!(subscriber = %name, "replaced existing subscriber registration");
        } else {
            tracing::debug!(subscriber = %name, "registered subscriber");
        }
    }

    /// Look up a subscriber by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn EventSubscriber>> {
        self.subscribers.read().await.get(name).cloned()
    }

    /// Number of registered subscribers.
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Whether no subscribers are registered.
    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }
}
