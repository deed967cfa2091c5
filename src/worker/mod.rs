//! Worker handler - execute-or-skip at delivery time.
//!
//! The external job runtime hands one raw payload per invocation to
//! [`WorkerHandler::handle`]. The handler decodes it (enforcing the type
//! allow-list), consults the debounce marker when the envelope carries a
//! key/id pair, and either dispatches to the subscriber's handler or skips
//! silently.
//!
//! Per-envelope state machine:
//!
//! ```text
//! Received -> Decoded -> Superseded (terminal skip)
//!                     -> Eligible  -> Delivered(result)
//!                                  -> Failed
//! ```
//!
//! The marker read and the comparison are not atomic with respect to
//! concurrent marker overwrites: a handler can read a value a moment before
//! another broadcaster replaces it. Debouncing is a best-effort throttle,
//! not a correctness guarantee, and this race is accepted rather than
//! papered over with locking the shared store does not provide. A retried
//! attempt re-reads the marker, so a job whose key has moved on since its
//! first attempt skips on retry.

use std::sync::Arc;

use crate::allowlist::TypeAllowList;
use crate::debounce::MarkerStore;
use crate::envelope::{ArgValue, EnvelopeCodec};
use crate::subscriber::SubscriberRegistry;
use crate::types::{Error, Result};

/// Outcome of one worker invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The subscriber's handler ran; carries its return value.
    Delivered(ArgValue),

    /// A fresher submission owns this debounce key; nothing was invoked.
    /// Expected steady-state behavior, not an error.
    Skipped,
}

/// Handles envelopes on behalf of the external worker pool.
///
/// Safe to invoke concurrently, including for envelopes sharing a debounce
/// key.
#[derive(Debug)]
pub struct WorkerHandler {
    registry: Arc<SubscriberRegistry>,
    store: Arc<dyn MarkerStore>,
    codec: EnvelopeCodec,
}

impl WorkerHandler {
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        store: Arc<dyn MarkerStore>,
        allow_list: Arc<TypeAllowList>,
    ) -> Self {
        Self {
            registry,
            store,
            codec: EnvelopeCodec::new(allow_list),
        }
    }

    /// Decode one payload and deliver it unless superseded.
    ///
    /// Failures — disallowed payload types, unknown actors, handler errors —
    /// propagate to the job runtime, which owns any retry policy.
    pub async fn handle(&self, payload: &[u8]) -> Result<Delivery> {
        let envelope = self.codec.decode(payload)?;

        if let Some((key, id)) = envelope.debounce_pair() {
            let current = self.store.get(key).await?;
            if current.as_deref() != Some(id.as_str()) {
                tracing::debug!(
                    actor = %envelope.actor,
                    event_name = %envelope.event_name,
                    debounce_key = key,
                    "envelope superseded, skipping delivery"
                );
                return Ok(Delivery::Skipped);
            }
        }

        let subscriber = self
            .registry
            .get(envelope.actor.as_str())
            .await
            .ok_or_else(|| {
                Error::no_such_handler(format!(
                    "no subscriber registered as '{}'",
                    envelope.actor
                ))
            })?;

        let result = subscriber
            .handle_event(&envelope.event_name, &envelope.arguments)
            .await?;

        tracing::debug!(
            actor = %envelope.actor,
            event_name = %envelope.event_name,
            "delivered envelope"
        );

        Ok(Delivery::Delivered(result))
    }
}
