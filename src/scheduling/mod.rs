//! Scheduling resolution — subscriber options to a concrete decision.
//!
//! Subscribers declare their queue placement, delays, and debounce behavior
//! as plain key/value bags ([`JobOptions`] and [`ScheduleOptions`]), probed
//! through optional trait hooks with empty defaults. [`resolve`] reduces the
//! two bags plus the event name to a single [`SchedulingDecision`].
//!
//! Resolution is fail-open: a malformed delay or debounce value degrades to
//! the immediate/default behavior with a warning. Bad configuration never
//! blocks a broadcast.

use serde_json::Value;
use std::time::Duration;

// =============================================================================
// Option bags
// =============================================================================

/// Static per-subscriber job options (queue placement, debounce block).
///
/// A plain key/value bag, mirroring the free-form configuration subscribers
/// expose. Recognized keys: `queue` (string), `debounce` (map, see
/// [`DebounceOptions`]). Unknown keys are ignored.
#[derive(Debug, Clone, Default)]
pub struct JobOptions(serde_json::Map<String, Value>);

impl JobOptions {
    /// The empty bag: default queue, no debounce.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a JSON value. Anything but an object reads as empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                tracing::warn!(?other, "job options must be a map, ignoring");
                Self::default()
            }
        }
    }

    /// Declared queue placement, if any.
    pub fn queue(&self) -> Option<&str> {
        self.0.get("queue").and_then(|v| v.as_str())
    }

    /// Declared debounce block, if any.
    pub fn debounce(&self) -> Option<DebounceOptions> {
        self.0
            .get("debounce")
            .and_then(|v| v.as_object())
            .map(DebounceOptions::from_map)
    }
}

/// Static schedule options: top-level and per-event `perform_in`/`perform_at`.
///
/// A sub-map keyed by an event name overrides the top-level delay fields for
/// that event.
#[derive(Debug, Clone, Default)]
pub struct ScheduleOptions(serde_json::Map<String, Value>);

impl ScheduleOptions {
    /// The empty bag: everything runs as soon as possible.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a JSON value. Anything but an object reads as empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                tracing::warn!(?other, "schedule options must be a map, ignoring");
                Self::default()
            }
        }
    }

    fn per_event(&self, event_name: &str) -> Option<&serde_json::Map<String, Value>> {
        self.0.get(event_name).and_then(|v| v.as_object())
    }
}

// =============================================================================
// Debounce options
// =============================================================================

/// One field selector for debounce key derivation.
///
/// `Name` selects from a mapping (or typed value) first argument; `Index`
/// selects a position from a sequence first argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyField {
    Name(String),
    Index(usize),
}

/// Parsed debounce block.
#[derive(Debug, Clone, PartialEq)]
pub struct DebounceOptions {
    /// How long after submission the job runs; superseding submissions
    /// inside this window win.
    pub window: Duration,

    /// Which fields of the first argument participate in the key.
    pub key_fields: Vec<KeyField>,

    /// Effective event name for key derivation, grouping several events
    /// under one key when set.
    pub event_name_override: Option<String>,

    /// Marker lifetime override; the broadcaster falls back to the
    /// configured default when absent.
    pub marker_ttl: Option<Duration>,
}

impl DebounceOptions {
    /// Parse from the `debounce` sub-map of the job options.
    ///
    /// Keys: `in_seconds` (window), `keys` (field selectors: strings select
    /// by name, numbers by position), `overwrite_event_name`, `expires_in`
    /// (marker TTL seconds). Malformed entries degrade to their defaults.
    fn from_map(map: &serde_json::Map<String, Value>) -> Self {
        let window = match map.get("in_seconds") {
            Some(v) => seconds_from(v).unwrap_or_else(|| {
                tracing::warn!(value = ?v, "debounce in_seconds is not numeric, using 0");
                Duration::ZERO
            }),
            None => Duration::ZERO,
        };

        let key_fields = map
            .get("keys")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(key_field_from).collect())
            .unwrap_or_default();

        let event_name_override = map
            .get("overwrite_event_name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let marker_ttl = map.get("expires_in").and_then(seconds_from);

        Self {
            window,
            key_fields,
            event_name_override,
            marker_ttl,
        }
    }
}

fn key_field_from(value: &Value) -> Option<KeyField> {
    if let Some(name) = value.as_str() {
        return Some(KeyField::Name(name.to_string()));
    }
    if let Some(index) = value.as_u64() {
        return Some(KeyField::Index(index as usize));
    }
    tracing::warn!(?value, "debounce key selector must be a string or index, skipping");
    None
}

/// Read a non-negative second count from a JSON value.
fn seconds_from(value: &Value) -> Option<Duration> {
    value
        .as_f64()
        .and_then(|s| Duration::try_from_secs_f64(s.max(0.0)).ok())
}

// =============================================================================
// Resolution
// =============================================================================

/// Concrete scheduling decision for one broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingDecision {
    /// Queue the envelope routes to, forwarded verbatim.
    pub queue_placement: String,

    /// Submission delay; zero means as soon as possible.
    pub delay: Duration,

    /// Debounce block, when the subscriber opted in.
    pub debounce: Option<DebounceOptions>,
}

/// Reduce subscriber options and an event name to a scheduling decision.
///
/// Per-event schedule entries take precedence over top-level ones, and
/// `perform_in` (relative seconds) beats `perform_at` (absolute epoch
/// seconds) when both are present. Non-numeric values degrade to zero delay.
pub fn resolve(
    job_options: &JobOptions,
    schedule_options: &ScheduleOptions,
    event_name: &str,
    default_queue: &str,
) -> SchedulingDecision {
    let queue_placement = job_options.queue().unwrap_or(default_queue).to_string();

    let delay = schedule_options
        .per_event(event_name)
        .and_then(|entry| delay_from(entry, event_name))
        .or_else(|| delay_from(&schedule_options.0, event_name))
        .unwrap_or(Duration::ZERO);

    SchedulingDecision {
        queue_placement,
        delay,
        debounce: job_options.debounce(),
    }
}

/// Extract a delay from one level of schedule options.
///
/// Returns `None` only when neither `perform_in` nor `perform_at` is
/// present, so a malformed value at this level still takes precedence over
/// a lower level (and degrades to zero).
fn delay_from(map: &serde_json::Map<String, Value>, event_name: &str) -> Option<Duration> {
    if let Some(value) = map.get("perform_in") {
        return Some(seconds_from(value).unwrap_or_else(|| {
            tracing::warn!(event_name, value = ?value, "perform_in is not numeric, scheduling immediately");
            Duration::ZERO
        }));
    }

    if let Some(value) = map.get("perform_at") {
        let delay = value
            .as_f64()
            .and_then(|at| {
                let now = chrono::Utc::now().timestamp() as f64;
                Duration::try_from_secs_f64((at - now).max(0.0)).ok()
            })
            .unwrap_or_else(|| {
                tracing::warn!(event_name, value = ?value, "perform_at is not numeric, scheduling immediately");
                Duration::ZERO
            });
        return Some(delay);
    }

    None
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve_for(job: Value, schedule: Value, event: &str) -> SchedulingDecision {
        resolve(
            &JobOptions::from_value(job),
            &ScheduleOptions::from_value(schedule),
            event,
            "default",
        )
    }

    #[test]
    fn empty_options_schedule_immediately_on_default_queue() {
        let decision = resolve_for(json!({}), json!({}), "it_happened");
        assert_eq!(decision.queue_placement, "default");
        assert_eq!(decision.delay, Duration::ZERO);
        assert!(decision.debounce.is_none());
    }

    #[test]
    fn custom_queue_is_forwarded() {
        let decision = resolve_for(json!({"queue": "mailers"}), json!({}), "it_happened");
        assert_eq!(decision.queue_placement, "mailers");
    }

    #[test]
    fn perform_in_sets_the_delay() {
        let decision = resolve_for(json!({}), json!({"perform_in": 5}), "it_happened");
        assert_eq!(decision.delay, Duration::from_secs(5));
    }

    #[test]
    fn non_numeric_perform_in_degrades_to_immediate() {
        let decision = resolve_for(
            json!({}),
            json!({"perform_in": "not a number", "delay": 5}),
            "it_happened",
        );
        assert_eq!(decision.delay, Duration::ZERO);
    }

    #[test]
    fn per_event_entry_takes_precedence() {
        let schedule = json!({
            "perform_in": 5,
            "it_happened": {"perform_in": 10},
        });
        assert_eq!(
            resolve_for(json!({}), schedule.clone(), "it_happened").delay,
            Duration::from_secs(10)
        );
        assert_eq!(
            resolve_for(json!({}), schedule, "other_event").delay,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn per_event_entry_without_delay_fields_falls_back() {
        let schedule = json!({
            "perform_in": 5,
            "it_happened": {"unrelated": true},
        });
        assert_eq!(
            resolve_for(json!({}), schedule, "it_happened").delay,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn per_event_malformed_delay_still_takes_precedence() {
        let schedule = json!({
            "perform_in": 5,
            "it_happened": {"perform_in": []},
        });
        assert_eq!(
            resolve_for(json!({}), schedule, "it_happened").delay,
            Duration::ZERO
        );
    }

    #[test]
    fn perform_in_beats_perform_at() {
        let future = chrono::Utc::now().timestamp() + 3600;
        let decision = resolve_for(
            json!({}),
            json!({"perform_in": 5, "perform_at": future}),
            "it_happened",
        );
        assert_eq!(decision.delay, Duration::from_secs(5));
    }

    #[test]
    fn perform_at_converts_to_relative_offset() {
        let future = chrono::Utc::now().timestamp() + 3600;
        let decision = resolve_for(json!({}), json!({"perform_at": future}), "it_happened");
        assert!(decision.delay > Duration::from_secs(3590));
        assert!(decision.delay <= Duration::from_secs(3600));
    }

    #[test]
    fn perform_at_in_the_past_schedules_immediately() {
        let past = chrono::Utc::now().timestamp() - 3600;
        let decision = resolve_for(json!({}), json!({"perform_at": past}), "it_happened");
        assert_eq!(decision.delay, Duration::ZERO);
    }

    #[test]
    fn debounce_block_is_parsed() {
        let decision = resolve_for(
            json!({
                "queue": "debounce_queue",
                "debounce": {
                    "in_seconds": 15,
                    "keys": ["user_id", 1],
                    "overwrite_event_name": "my_custom_event",
                    "expires_in": 600,
                },
            }),
            json!({}),
            "it_happened",
        );

        let debounce = decision.debounce.unwrap();
        assert_eq!(debounce.window, Duration::from_secs(15));
        assert_eq!(
            debounce.key_fields,
            vec![KeyField::Name("user_id".into()), KeyField::Index(1)]
        );
        assert_eq!(debounce.event_name_override.as_deref(), Some("my_custom_event"));
        assert_eq!(debounce.marker_ttl, Some(Duration::from_secs(600)));
    }

    #[test]
    fn debounce_defaults_when_entries_missing_or_malformed() {
        let decision = resolve_for(
            json!({"debounce": {"in_seconds": "soon", "keys": "user_id"}}),
            json!({}),
            "it_happened",
        );

        let debounce = decision.debounce.unwrap();
        assert_eq!(debounce.window, Duration::ZERO);
        assert!(debounce.key_fields.is_empty());
        assert!(debounce.event_name_override.is_none());
        assert!(debounce.marker_ttl.is_none());
    }

    #[test]
    fn non_map_option_bags_read_as_empty() {
        let decision = resolve_for(json!("queue"), json!(42), "it_happened");
        assert_eq!(decision.queue_placement, "default");
        assert_eq!(decision.delay, Duration::ZERO);
        assert!(decision.debounce.is_none());
    }
}
