//! Envelope - the unit of work shipped through the job queue.
//!
//! An [`Envelope`] packages one (subscriber, event, arguments) delivery,
//! optionally stamped with a debounce key/id pair. [`EnvelopeCodec`] owns the
//! wire form: JSON bytes whose decoded argument values are checked against
//! the type allow-list *after* structural parsing, so a rejected payload
//! never runs anything beyond the JSON parser.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::allowlist::TypeAllowList;
use crate::types::{DebounceId, Error, Result, SubscriberId};

pub mod value;

pub use value::ArgValue;

// =============================================================================
// Envelope
// =============================================================================

/// The unit of work submitted to the job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The subscriber the delivery targets, by registered name.
    pub actor: SubscriberId,

    /// Which event handler to invoke.
    pub event_name: String,

    /// Positional handler arguments.
    pub arguments: Vec<ArgValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_id: Option<DebounceId>,
}

impl Envelope {
    /// Create an envelope with no debounce stamp.
    pub fn new(actor: SubscriberId, event_name: impl Into<String>, arguments: Vec<ArgValue>) -> Self {
        Self {
            actor,
            event_name: event_name.into(),
            arguments,
            debounce_key: None,
            debounce_id: None,
        }
    }

    /// Stamp the envelope with a debounce key/id pair.
    pub fn with_debounce(mut self, key: impl Into<String>, id: DebounceId) -> Self {
        self.debounce_key = Some(key.into());
        self.debounce_id = Some(id);
        self
    }

    /// The debounce pair, if the envelope carries a complete one.
    ///
    /// A partially-set pair (key without id or id without key) reads as no
    /// debounce at all: the worker delivers such envelopes normally instead
    /// of failing them.
    pub fn debounce_pair(&self) -> Option<(&str, &DebounceId)> {
        match (&self.debounce_key, &self.debounce_id) {
            (Some(key), Some(id)) => Some((key.as_str(), id)),
            _ => None,
        }
    }
}

// =============================================================================
// EnvelopeCodec
// =============================================================================

/// Serializes envelopes for the queue and reconstructs them safely.
///
/// Decoding enforces the allow-list: every non-primitive argument value must
/// carry an allowed type name, otherwise decoding fails before any handler
/// sees the payload. Encoding trusts local data and fails only on values the
/// wire form cannot represent.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    allow_list: Arc<TypeAllowList>,
}

impl EnvelopeCodec {
    pub fn new(allow_list: Arc<TypeAllowList>) -> Self {
        Self { allow_list }
    }

    /// Serialize an envelope to queue-ready bytes.
    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>> {
        for argument in &envelope.arguments {
            argument.check_encodable()?;
        }
        Ok(serde_json::to_vec(envelope)?)
    }

    /// Reconstruct an envelope, rejecting disallowed types.
    ///
    /// The payload may have been queued by another process or an older code
    /// revision, so the decoded tree is walked value by value: the first
    /// non-primitive whose type name is not allow-listed fails the decode
    /// with [`Error::DisallowedType`]. Unsafe mode skips the walk entirely.
    pub fn decode(&self, payload: &[u8]) -> Result<Envelope> {
        let envelope: Envelope = serde_json::from_slice(payload)?;

        if !self.allow_list.unsafe_mode() {
            for argument in &envelope.arguments {
                self.check_allowed(argument)?;
            }
        }

        Ok(envelope)
    }

    fn check_allowed(&self, value: &ArgValue) -> Result<()> {
        if let Some(type_name) = value.type_name() {
            if !self.allow_list.is_allowed(type_name) {
                return Err(Error::disallowed_type(type_name));
            }
        }
        for child in value.children() {
            self.check_allowed(child)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn actor(name: &str) -> SubscriberId {
        SubscriberId::from_string(name.to_string()).unwrap()
    }

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::new(Arc::new(TypeAllowList::new()))
    }

    fn typed(type_name: &str) -> ArgValue {
        ArgValue::Typed {
            type_name: type_name.to_string(),
            fields: BTreeMap::from([("id".to_string(), ArgValue::Int(9))]),
        }
    }

    #[test]
    fn round_trip_preserves_actor_event_and_arguments() {
        let envelope = Envelope::new(
            actor("invoice_mailer"),
            "it_happened",
            vec![
                ArgValue::from("hello"),
                ArgValue::Sequence(vec![ArgValue::Int(1), ArgValue::Null]),
                ArgValue::Symbol("created".into()),
            ],
        );

        let codec = codec();
        let bytes = codec.encode(&envelope).unwrap();
        let decoded = codec.decode(&bytes).unwrap();

        assert_eq!(decoded, envelope);
    }

    #[test]
    fn decode_rejects_unregistered_type() {
        let envelope = Envelope::new(actor("mailer"), "it_happened", vec![typed("billing.Invoice")]);

        let codec = codec();
        let bytes = codec.encode(&envelope).unwrap();
        let err = codec.decode(&bytes).unwrap_err();

        match err {
            Error::DisallowedType(name) => assert_eq!(name, "billing.Invoice"),
            other => panic!("expected DisallowedType, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_nested_disallowed_type() {
        let nested = ArgValue::Mapping(BTreeMap::from([(
            "invoice".to_string(),
            ArgValue::Sequence(vec![typed("billing.Invoice")]),
        )]));
        let envelope = Envelope::new(actor("mailer"), "it_happened", vec![nested]);

        let codec = codec();
        let bytes = codec.encode(&envelope).unwrap();
        assert!(matches!(
            codec.decode(&bytes),
            Err(Error::DisallowedType(name)) if name == "billing.Invoice"
        ));
    }

    #[test]
    fn registration_makes_decode_succeed() {
        let allow_list = Arc::new(TypeAllowList::new());
        let codec = EnvelopeCodec::new(allow_list.clone());

        let envelope = Envelope::new(actor("mailer"), "it_happened", vec![typed("billing.Invoice")]);
        let bytes = codec.encode(&envelope).unwrap();
        assert!(codec.decode(&bytes).is_err());

        allow_list.register(["billing.Invoice"]);
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.arguments, envelope.arguments);
    }

    #[test]
    fn unsafe_mode_accepts_anything() {
        let allow_list = Arc::new(TypeAllowList::new());
        allow_list.use_unsafe_mode();
        let codec = EnvelopeCodec::new(allow_list);

        let envelope = Envelope::new(actor("mailer"), "it_happened", vec![typed("whatever.Type")]);
        let bytes = codec.encode(&envelope).unwrap();
        assert!(codec.decode(&bytes).is_ok());
    }

    #[test]
    fn builtin_safe_types_decode_by_default() {
        let envelope = Envelope::new(
            actor("mailer"),
            "it_happened",
            vec![
                ArgValue::Symbol("paid".into()),
                ArgValue::from(chrono::Utc::now()),
                ArgValue::ClassRef("InvoiceMailer".into()),
            ],
        );

        let codec = codec();
        let bytes = codec.encode(&envelope).unwrap();
        assert!(codec.decode(&bytes).is_ok());
    }

    #[test]
    fn encode_fails_on_non_finite_float() {
        let envelope = Envelope::new(actor("mailer"), "it_happened", vec![ArgValue::Float(f64::INFINITY)]);
        assert!(matches!(codec().encode(&envelope), Err(Error::Encoding(_))));
    }

    #[test]
    fn partial_debounce_pair_reads_as_no_debounce() {
        let mut envelope = Envelope::new(actor("mailer"), "it_happened", vec![]);
        assert!(envelope.debounce_pair().is_none());

        envelope.debounce_key = Some("mailer-it_happened".to_string());
        assert!(envelope.debounce_pair().is_none());

        envelope.debounce_id = Some(DebounceId::new());
        assert!(envelope.debounce_pair().is_some());
    }

    #[test]
    fn debounce_fields_absent_from_wire_form_when_unset() {
        let envelope = Envelope::new(actor("mailer"), "it_happened", vec![]);
        let bytes = codec().encode(&envelope).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("debounce_key"));
        assert!(!text.contains("debounce_id"));
    }
}
