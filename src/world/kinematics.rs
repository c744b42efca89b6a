// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Closed-loop track geometry
//!
//! Pure functions over normalized lap positions. Positions live on a circle
//! of circumference 1.0, so every distance here is the shorter arc.

use serde::{Deserialize, Serialize};

use super::CarState;

/// Lane offsets closer than this are treated as the same line
const LANE_EPSILON: f64 = 1e-6;

/// Lateral side of one car relative to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Lower lane offset
    Left,
    /// Higher lane offset
    Right,
    /// Offsets equal or not populated
    Unknown,
}

/// Shorter of the two arcs between two lap positions, in meters.
pub fn longitudinal_gap(pos_a: f64, pos_b: f64, track_length_meters: f64) -> f64 {
    let diff_pct = (pos_a - pos_b).abs();
    let wrap_pct = diff_pct.min(1.0 - diff_pct);
    wrap_pct * track_length_meters
}

/// Linear falloff from 1.0 at zero gap to 0.0 at `overlap_range_meters`.
pub fn overlap_score(gap_meters: f64, overlap_range_meters: f64) -> f64 {
    if overlap_range_meters <= 0.0 || !gap_meters.is_finite() {
        return 0.0;
    }
    (1.0 - gap_meters.abs() / overlap_range_meters).clamp(0.0, 1.0)
}

/// Overlap score between two cars on the same track
pub fn pair_overlap(a: &CarState, b: &CarState, overlap_range_meters: f64) -> f64 {
    let gap = longitudinal_gap(a.lap_dist_pct, b.lap_dist_pct, a.track_length_meters);
    overlap_score(gap, overlap_range_meters)
}

/// Side of `b` as seen from `a`. Lower lane offset is further left.
pub fn relative_side(a: &CarState, b: &CarState) -> Side {
    side_from_offsets(a.lane_offset, b.lane_offset)
}

/// Side of a car at `lane_b` seen from a car at `lane_a`
pub fn side_from_offsets(lane_a: f64, lane_b: f64) -> Side {
    if !lane_a.is_finite() || !lane_b.is_finite() {
        return Side::Unknown;
    }
    let delta = lane_b - lane_a;
    if delta.abs() < LANE_EPSILON {
        Side::Unknown
    } else if delta < 0.0 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Signed shortest delta from `from` to `to`, in `(-0.5, 0.5]`.
pub fn signed_pct_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(1.0);
    if delta > 0.5 {
        delta - 1.0
    } else {
        delta
    }
}

/// Wrap-aware mean lap position of a group of nearby cars.
///
/// Offsets are measured from the first position, so the group must span
/// less than half a lap for the result to be meaningful.
pub fn lap_centroid(positions: &[f64]) -> Option<f64> {
    let (&anchor, _) = positions.split_first()?;
    let mean_offset = positions
        .iter()
        .map(|&p| signed_pct_delta(anchor, p))
        .sum::<f64>()
        / positions.len() as f64;
    Some((anchor + mean_offset).rem_euclid(1.0))
}
