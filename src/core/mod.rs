// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Core engine module - drives the world model and publishes its output

mod engine;
mod event_bus;

pub use engine::Engine;
pub use event_bus::{Event, EventBus, EventPayload, EventType};

use serde::{Deserialize, Serialize};

use crate::telemetry::TimestampMs;

/// Running counters for one engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Ticks fed through the engine
    pub ticks_processed: u64,
    /// Valid cars in the latest tick
    pub cars_tracked: usize,
    /// Car samples rejected, all ticks
    pub cars_rejected: u64,
    /// Overlap transitions published
    pub overlap_events: u64,
    /// Three-wide detections published
    pub three_wide_events: u64,
    /// Snapshots currently held
    pub snapshots_stored: usize,
    /// Session time of the latest tick
    pub last_tick_ms: Option<TimestampMs>,
}
