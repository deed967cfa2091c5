//! # Herald Core - Event-to-Job Broadcasting
//!
//! Bridges synchronous domain-event notifications to a background job
//! runner, providing:
//! - Envelope construction with a serialization-safety allow-list
//! - Scheduling resolution (immediate, delayed, per-event overrides)
//! - Best-effort debouncing through shared-store supersession markers
//! - Execute-or-skip delivery on the worker side
//!
//! ## Architecture
//!
//! The publish/subscribe core, the durable job queue, and the shared
//! key-value store are external collaborators reached through traits:
//! ```text
//!   broadcast(subscriber, event, args)
//!        │
//!        ▼
//!   ┌─────────────────────────────────┐
//!   │          Broadcaster            │
//!   │  ┌──────────┐  ┌─────────────┐  │      ┌─────────────┐
//!   │  │Scheduling│  │  Debounce   │──┼────▶ │ MarkerStore │
//!   │  │ Resolver │  │  key + id   │  │      └──────▲──────┘
//!   │  └──────────┘  └─────────────┘  │             │ get
//!   │        ┌───────────────┐        │             │
//!   │        │ EnvelopeCodec │◀───────┼── TypeAllowList
//!   │        └───────┬───────┘        │             │
//!   └────────────────┼────────────────┘             │
//!                    ▼                              │
//!             ┌────────────┐  later  ┌──────────────┴─┐
//!             │  JobQueue  │ ──────▶ │  WorkerHandler │──▶ subscriber
//!             └────────────┘         └────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod allowlist;
pub mod broadcaster;
pub mod debounce;
pub mod envelope;
pub mod queue;
pub mod scheduling;
pub mod subscriber;
pub mod types;
pub mod worker;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
