//! Broadcaster - the public entry point.
//!
//! Invoked once per (subscriber, event) pair by the publish/subscribe core.
//! The broadcaster resolves the subscriber's scheduling options, runs the
//! submission side of the debounce protocol when configured, encodes the
//! envelope, and submits it to the job queue. It runs synchronously on the
//! caller's task: the marker write and the queue submission both complete
//! before `broadcast` returns, which is what makes the supersession
//! ordering hold.
//!
//! Failure policy: store and queue failures propagate to the caller
//! unchanged; malformed scheduling configuration never fails a broadcast
//! (it degrades to immediate/default scheduling); payloads with disallowed
//! argument types enqueue successfully and are rejected at decode time
//! instead — the check is deliberately deferred to the consuming side.

use std::sync::Arc;

use crate::allowlist::TypeAllowList;
use crate::debounce::{derive_key, MarkerStore};
use crate::envelope::{ArgValue, Envelope, EnvelopeCodec};
use crate::queue::JobQueue;
use crate::scheduling;
use crate::subscriber::EventSubscriber;
use crate::types::{Config, DebounceId, Error, Result, SubscriberId};

/// Turns one domain-event notification into one queued unit of work.
#[derive(Debug)]
pub struct Broadcaster {
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn MarkerStore>,
    codec: EnvelopeCodec,
    config: Config,
}

impl Broadcaster {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn MarkerStore>,
        allow_list: Arc<TypeAllowList>,
        config: Config,
    ) -> Self {
        Self {
            queue,
            store,
            codec: EnvelopeCodec::new(allow_list),
            config,
        }
    }

    /// Broadcast one event to one subscriber.
    ///
    /// `publisher` is accepted for contract parity with the pub/sub core
    /// and does not influence scheduling. Safe to call repeatedly and
    /// concurrently for different (subscriber, event) pairs.
    pub async fn broadcast(
        &self,
        subscriber: &dyn EventSubscriber,
        _publisher: Option<&str>,
        event_name: &str,
        arguments: Vec<ArgValue>,
    ) -> Result<()> {
        let decision = scheduling::resolve(
            &subscriber.job_options(),
            &subscriber.schedule_options(),
            event_name,
            &self.config.default_queue,
        );

        let actor = SubscriberId::from_string(subscriber.name().to_string())
            .map_err(Error::validation)?;
        let envelope = Envelope::new(actor, event_name, arguments);

        match decision.debounce {
            Some(debounce) => {
                let effective_event = debounce
                    .event_name_override
                    .as_deref()
                    .unwrap_or(event_name);
                let key = derive_key(
                    &envelope.actor,
                    effective_event,
                    &debounce.key_fields,
                    &envelope.arguments,
                );
                let id = DebounceId::new();
                let ttl = debounce.marker_ttl.unwrap_or(self.config.marker_ttl);

                // Mark this submission as the freshest for its key before
                // the envelope is queued: an earlier still-pending job must
                // be able to see it has been superseded.
                self.store.set(&key, id.as_str(), ttl).await?;

                let envelope = envelope.with_debounce(key.clone(), id);
                let payload = self.codec.encode(&envelope)?;
                self.queue
                    .enqueue_in(&decision.queue_placement, debounce.window, payload)
                    .await?;

                tracing::debug!(
                    subscriber = subscriber.name(),
                    event_name,
                    queue = %decision.queue_placement,
                    debounce_key = %key,
                    window_secs = debounce.window.as_secs(),
                    "submitted debounced envelope"
                );
            }
            None => {
                let payload = self.codec.encode(&envelope)?;
                if decision.delay.is_zero() {
                    self.queue.enqueue(&decision.queue_placement, payload).await?;
                } else {
                    self.queue
                        .enqueue_in(&decision.queue_placement, decision.delay, payload)
                        .await?;
                }

                tracing::debug!(
                    subscriber = subscriber.name(),
                    event_name,
                    queue = %decision.queue_placement,
                    delay_secs = decision.delay.as_secs(),
                    "submitted envelope"
                );
            }
        }

        Ok(())
    }
}
