// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Pitwall - Spatial Awareness Engine for Racing Telemetry
//!
//! Maintains a live positional model of every car on a closed-loop track and
//! derives racing events from it:
//! - Wrap-aware longitudinal gap and overlap scoring
//! - Debounced per-pair engaged/disengaged tracking with hysteresis
//! - Three-wide detection over a 1-D spatial hash
//! - Bounded snapshot history for incident evidence
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Engine                           │
//! ├──────────────────────────────────────────────────────────┤
//! │  Telemetry ─→ ┌──────────────────────────────┐           │
//! │               │         World Model          │           │
//! │               │  car map → spatial hash      │           │
//! │               │  → neighbor scan → pair FSM  │           │
//! │               │  → three-wide → snapshots    │           │
//! │               └──────────────────────────────┘           │
//! │                      ↓                ↓                  │
//! │               ┌────────────┐   ┌────────────────┐        │
//! │               │ Event Bus  │   │ Snapshot Buffer│        │
//! │               └────────────┘   └────────────────┘        │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

/// Engine configuration
pub mod config;
/// Engine and event bus
pub mod core;
/// Error types
pub mod error;
/// Racing events
pub mod events;
/// Snapshot history
pub mod snapshot;
/// Telemetry input types
pub mod telemetry;
/// World model
pub mod world;

// Re-exports for convenience
pub use config::Config;
pub use crate::core::{Engine, EngineStats, EventBus};
pub use error::{ConfigError, TelemetryError};
pub use events::{OverlapStateChanged, RaceEvent, ThreeWideDetected};
pub use snapshot::{SnapshotBuffer, WorldSnapshot};
pub use telemetry::{CarId, CarTelemetry, TelemetrySnapshot, TimestampMs, Velocity};
pub use world::{CarState, OverlapState, Side, SpotterCall, TickReport, WorldModel};

/// Pitwall version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pitwall name
pub const NAME: &str = "Pitwall";
