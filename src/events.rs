// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Racing events derived from the world model

use serde::{Deserialize, Serialize};

use crate::telemetry::{CarId, TimestampMs};
use crate::world::{OverlapState, Side};

/// Confirmed change in a pair's overlap state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapStateChanged {
    /// Lower id of the pair
    pub car_a: CarId,
    /// Higher id of the pair
    pub car_b: CarId,
    /// State the pair moved into
    pub state: OverlapState,
    /// Where car B sits relative to car A
    pub side: Side,
    /// Score that confirmed the transition
    pub overlap_score: f64,
    /// Session time of the tick
    pub timestamp: TimestampMs,
}

/// Three mutually overlapping cars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeWideDetected {
    /// Left to right by lane offset
    pub cars: [CarId; 3],
    /// Approximate lap position of the trio
    pub lap_dist_pct: f64,
    /// Mean of the three pairwise overlap scores
    pub confidence: f64,
    /// Session time of the tick
    pub timestamp: TimestampMs,
}

/// Event published by the spatial awareness engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceEvent {
    /// A pair engaged or disengaged
    OverlapStateChanged(OverlapStateChanged),
    /// Three cars side by side
    ThreeWideDetected(ThreeWideDetected),
}

impl RaceEvent {
    /// Session time the event was produced at
    pub fn timestamp(&self) -> TimestampMs {
        match self {
            Self::OverlapStateChanged(e) => e.timestamp,
            Self::ThreeWideDetected(e) => e.timestamp,
        }
    }

    /// Whether the event names `id`
    pub fn involves(&self, id: CarId) -> bool {
        match self {
            Self::OverlapStateChanged(e) => e.car_a == id || e.car_b == id,
            Self::ThreeWideDetected(e) => e.cars.contains(&id),
        }
    }

    /// Serialize to the JSON wire format
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
