//! Argument value tree carried inside an envelope.
//!
//! Handler arguments travel through the job queue as a tree of [`ArgValue`]s.
//! Primitive variants (null, bool, numbers, strings, sequences, mappings)
//! always survive decoding. Non-primitive variants carry a type name and are
//! gated by the [`TypeAllowList`](crate::allowlist::TypeAllowList): `Symbol`,
//! `Timestamp`, and `ClassRef` map to the built-in safe types, while `Typed`
//! represents an arbitrary domain value serialized field-wise.
//!
//! The wire form is explicitly tagged, so deserialization is a purely
//! structural parse: no variant is ever guessed from shape, and no
//! user-defined constructor runs while a payload is being read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type name reported for `Symbol` values.
pub const TYPE_SYMBOL: &str = "symbol";
/// Type name reported for `Timestamp` values.
pub const TYPE_TIMESTAMP: &str = "timestamp";
/// Type name reported for `ClassRef` values.
pub const TYPE_CLASS: &str = "class";

/// A single argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ArgValue>),
    Mapping(BTreeMap<String, ArgValue>),

    /// Enumeration token (an interned name, not free-form text).
    Symbol(String),

    /// Point in time (UTC).
    Timestamp(DateTime<Utc>),

    /// Reference to a class/type by name.
    ClassRef(String),

    /// Arbitrary domain value, serialized field-wise under its type name.
    Typed {
        type_name: String,
        fields: BTreeMap<String, ArgValue>,
    },
}

impl ArgValue {
    /// The type name this value presents to the allow-list, or `None` for
    /// primitives that are always accepted.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            ArgValue::Null
            | ArgValue::Bool(_)
            | ArgValue::Int(_)
            | ArgValue::Float(_)
            | ArgValue::String(_)
            | ArgValue::Sequence(_)
            | ArgValue::Mapping(_) => None,
            ArgValue::Symbol(_) => Some(TYPE_SYMBOL),
            ArgValue::Timestamp(_) => Some(TYPE_TIMESTAMP),
            ArgValue::ClassRef(_) => Some(TYPE_CLASS),
            ArgValue::Typed { type_name, .. } => Some(type_name),
        }
    }

    /// Child values, for tree walks.
    pub fn children(&self) -> Vec<&ArgValue> {
        match self {
            ArgValue::Sequence(items) => items.iter().collect(),
            ArgValue::Mapping(map) => map.values().collect(),
            ArgValue::Typed { fields, .. } => fields.values().collect(),
            _ => Vec::new(),
        }
    }

    /// Look up a named field, for mappings and typed values.
    pub fn field(&self, name: &str) -> Option<&ArgValue> {
        match self {
            ArgValue::Mapping(map) => map.get(name),
            ArgValue::Typed { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    /// Look up a positional element, for sequences.
    pub fn element(&self, index: usize) -> Option<&ArgValue> {
        match self {
            ArgValue::Sequence(items) => items.get(index),
            _ => None,
        }
    }

    /// Render this value as a debounce-key fragment.
    ///
    /// Scalars render directly; structured values render as their compact
    /// JSON form so equal values always produce equal fragments.
    pub fn key_fragment(&self) -> String {
        match self {
            ArgValue::Null => String::new(),
            ArgValue::Bool(b) => b.to_string(),
            ArgValue::Int(i) => i.to_string(),
            ArgValue::Float(f) => f.to_string(),
            ArgValue::String(s) | ArgValue::Symbol(s) | ArgValue::ClassRef(s) => s.clone(),
            ArgValue::Timestamp(ts) => ts.timestamp().to_string(),
            ArgValue::Sequence(_) | ArgValue::Mapping(_) | ArgValue::Typed { .. } => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Walk the tree and reject values JSON cannot represent.
    ///
    /// The only such primitive is a non-finite float; an owned tree cannot
    /// contain a cycle.
    pub fn check_encodable(&self) -> crate::types::Result<()> {
        if let ArgValue::Float(f) = self {
            if !f.is_finite() {
                return Err(crate::types::Error::encoding(format!(
                    "non-finite float {f} cannot be serialized"
                )));
            }
        }
        for child in self.children() {
            child.check_encodable()?;
        }
        Ok(())
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::String(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::String(value)
    }
}

impl From<DateTime<Utc>> for ArgValue {
    fn from(value: DateTime<Utc>) -> Self {
        ArgValue::Timestamp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, ArgValue)]) -> ArgValue {
        ArgValue::Mapping(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn primitives_present_no_type_name() {
        assert_eq!(ArgValue::Null.type_name(), None);
        assert_eq!(ArgValue::from(true).type_name(), None);
        assert_eq!(ArgValue::from(42i64).type_name(), None);
        assert_eq!(ArgValue::from("hello").type_name(), None);
        assert_eq!(ArgValue::Sequence(vec![]).type_name(), None);
    }

    #[test]
    fn builtin_complex_values_report_safe_type_names() {
        assert_eq!(ArgValue::Symbol("created".into()).type_name(), Some("symbol"));
        assert_eq!(ArgValue::from(Utc::now()).type_name(), Some("timestamp"));
        assert_eq!(
            ArgValue::ClassRef("InvoiceMailer".into()).type_name(),
            Some("class")
        );
    }

    #[test]
    fn typed_value_reports_its_own_name() {
        let value = ArgValue::Typed {
            type_name: "billing.Invoice".to_string(),
            fields: BTreeMap::new(),
        };
        assert_eq!(value.type_name(), Some("billing.Invoice"));
    }

    #[test]
    fn tagged_wire_form_distinguishes_symbol_from_string() {
        let symbol = serde_json::to_string(&ArgValue::Symbol("ok".into())).unwrap();
        let string = serde_json::to_string(&ArgValue::from("ok")).unwrap();
        assert_ne!(symbol, string);
        assert!(symbol.contains("\"symbol\""));
        assert!(string.contains("\"string\""));
    }

    #[test]
    fn field_and_element_lookups() {
        let map = mapping(&[("user_id", ArgValue::from(7i64))]);
        assert_eq!(map.field("user_id"), Some(&ArgValue::Int(7)));
        assert_eq!(map.field("missing"), None);
        assert_eq!(map.element(0), None);

        let seq = ArgValue::Sequence(vec![ArgValue::from(1i64), ArgValue::from(23i64)]);
        assert_eq!(seq.element(1), Some(&ArgValue::Int(23)));
        assert_eq!(seq.field("user_id"), None);
    }

    #[test]
    fn key_fragments_are_deterministic() {
        assert_eq!(ArgValue::from(7i64).key_fragment(), "7");
        assert_eq!(ArgValue::from("joe@doe.com").key_fragment(), "joe@doe.com");
        assert_eq!(ArgValue::Null.key_fragment(), "");

        let a = mapping(&[("a", ArgValue::from(1i64)), ("b", ArgValue::from(2i64))]);
        let b = mapping(&[("b", ArgValue::from(2i64)), ("a", ArgValue::from(1i64))]);
        assert_eq!(a.key_fragment(), b.key_fragment());
    }

    #[test]
    fn non_finite_floats_fail_encodable_check() {
        let nested = ArgValue::Sequence(vec![mapping(&[("rate", ArgValue::from(f64::NAN))])]);
        let err = nested.check_encodable().unwrap_err();
        assert!(err.to_string().contains("encoding error"));

        let fine = ArgValue::Sequence(vec![mapping(&[("rate", ArgValue::from(0.25))])]);
        assert!(fine.check_encodable().is_ok());
    }
}
