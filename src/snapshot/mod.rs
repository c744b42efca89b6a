// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Bounded history of world states for incident evidence and replay

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::events::RaceEvent;
use crate::telemetry::{CarId, TimestampMs};
use crate::world::CarState;

/// Immutable point-in-time copy of every tracked car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    /// Session time of the capture
    pub timestamp: TimestampMs,
    /// Session the snapshot belongs to
    pub session_id: String,
    /// Every tracked car at capture time
    pub cars: BTreeMap<CarId, CarState>,
    /// Events produced since the previous capture
    pub events: Vec<RaceEvent>,
}

impl WorldSnapshot {
    /// State of one car at capture time
    pub fn car(&self, id: CarId) -> Option<&CarState> {
        self.cars.get(&id)
    }
}

/// FIFO sliding window of snapshots, oldest first
#[derive(Debug, Clone)]
pub struct SnapshotBuffer {
    snapshots: VecDeque<WorldSnapshot>,
    capacity: usize,
}

impl SnapshotBuffer {
    /// Create a buffer holding at most `capacity` snapshots (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Deep-copy the live car map into a new snapshot, evicting the oldest
    /// entry when full.
    pub fn capture(
        &mut self,
        now: TimestampMs,
        session_id: &str,
        cars: &BTreeMap<CarId, CarState>,
        events: Vec<RaceEvent>,
    ) -> &WorldSnapshot {
        self.push(WorldSnapshot {
            timestamp: now,
            session_id: session_id.to_string(),
            cars: cars.clone(),
            events,
        })
    }

    /// Append a snapshot, evicting the oldest when full
    pub fn push(&mut self, snapshot: WorldSnapshot) -> &WorldSnapshot {
        while self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        trace!(
            "Captured snapshot at {}ms ({} cars)",
            snapshot.timestamp,
            snapshot.cars.len()
        );
        self.snapshots.push_back(snapshot);
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Most recent snapshot whose timestamp is strictly within
    /// `tolerance_ms` of `timestamp`.
    ///
    /// Scans newest to oldest and returns the first match, which is not
    /// necessarily the nearest one when several fall inside the tolerance.
    pub fn get(&self, timestamp: TimestampMs, tolerance_ms: u64) -> Option<&WorldSnapshot> {
        self.snapshots
            .iter()
            .rev()
            .find(|s| s.timestamp.abs_diff(timestamp) < tolerance_ms)
    }

    /// Every stored snapshot, oldest to newest
    pub fn recent(&self) -> impl DoubleEndedIterator<Item = &WorldSnapshot> + ExactSizeIterator + '_ {
        self.snapshots.iter()
    }

    /// Snapshots with `from <= timestamp <= to`, oldest first
    pub fn range(&self, from: TimestampMs, to: TimestampMs) -> Vec<&WorldSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp <= to)
            .collect()
    }

    /// Newest snapshot
    pub fn latest(&self) -> Option<&WorldSnapshot> {
        self.snapshots.back()
    }

    /// Oldest snapshot
    pub fn oldest(&self) -> Option<&WorldSnapshot> {
        self.snapshots.front()
    }

    /// Time spanned by the stored history
    pub fn span_ms(&self) -> u64 {
        match (self.oldest(), self.latest()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
            _ => 0,
        }
    }

    /// Maximum number of snapshots held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of snapshots held
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshot has been captured
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop every snapshot
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_map() -> BTreeMap<CarId, CarState> {
        let mut cars = BTreeMap::new();
        cars.insert(CarId(1), CarState::for_test(1, 0.5, 0.0, 4000.0));
        cars
    }

    fn buffer_with(timestamps: &[TimestampMs], capacity: usize) -> SnapshotBuffer {
        let mut buffer = SnapshotBuffer::new(capacity);
        let cars = live_map();
        for &t in timestamps {
            buffer.capture(t, "session", &cars, Vec::new());
        }
        buffer
    }

    #[test]
    fn test_most_recent_match_within_tolerance() {
        let buffer = buffer_with(&[1000, 1100], 10);

        // Both are 50ms away; the newer one wins
        assert_eq!(buffer.get(1050, 100).unwrap().timestamp, 1100);
        assert_eq!(buffer.get(1000, 1).unwrap().timestamp, 1000);
        // Tolerance is exclusive
        assert!(buffer.get(1050, 50).is_none());
        assert!(buffer.get(5000, 100).is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let capacity = 5;
        let k = 3;
        let timestamps: Vec<_> = (0..(capacity + k) as u64).map(|i| i * 100).collect();
        let buffer = buffer_with(&timestamps, capacity);

        assert_eq!(buffer.len(), capacity);
        let kept: Vec<_> = buffer.recent().map(|s| s.timestamp).collect();
        assert_eq!(kept, vec![300, 400, 500, 600, 700]);
        assert_eq!(buffer.span_ms(), 400);
    }

    #[test]
    fn test_snapshot_is_isolated_from_live_state() {
        let mut buffer = SnapshotBuffer::new(4);
        let mut cars = live_map();
        buffer.capture(100, "session", &cars, Vec::new());

        let live = cars.get_mut(&CarId(1)).unwrap();
        live.lap_dist_pct = 0.9;
        live.velocity.x = -1.0;

        let stored = buffer.latest().unwrap().car(CarId(1)).unwrap();
        assert_eq!(stored.lap_dist_pct, 0.5);
        assert_eq!(stored.velocity.x, 50.0);
    }

    #[test]
    fn test_range() {
        let buffer = buffer_with(&[100, 200, 300, 400], 10);
        let window: Vec<_> = buffer.range(150, 300).iter().map(|s| s.timestamp).collect();
        assert_eq!(window, vec![200, 300]);
        assert!(buffer.range(500, 600).is_empty());
    }

    #[test]
    fn test_snapshot_json_is_camel_case() {
        let buffer = buffer_with(&[100], 4);
        let json = serde_json::to_value(buffer.latest().unwrap()).unwrap();

        assert_eq!(json["sessionId"], "session");
        let car = &json["cars"]["1"];
        assert_eq!(car["lapDistPct"], 0.5);
        assert_eq!(car["trackLengthMeters"], 4000.0);
        assert!(car.get("laneOffset").is_some());
        assert!(car.get("inPit").is_some());
        assert!(car.get("lap_dist_pct").is_none());
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = SnapshotBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.is_empty());
        assert!(buffer.get(0, 1000).is_none());
        assert_eq!(buffer.span_ms(), 0);
    }
}
