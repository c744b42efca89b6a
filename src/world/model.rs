// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Spatial awareness service
//!
//! Owns the live car map for one session. Each telemetry tick replaces the
//! map, rebuilds the spatial hash, runs the pruned neighbor scan through the
//! pair state machine, looks for mutually overlapping neighbor trios, and
//! captures a throttled snapshot of the world.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{Config, OverlapConfig, WorldConfig};
use crate::error::TelemetryError;
use crate::events::{OverlapStateChanged, RaceEvent, ThreeWideDetected};
use crate::snapshot::{SnapshotBuffer, WorldSnapshot};
use crate::telemetry::{CarId, TelemetrySnapshot, TimestampMs};

use super::kinematics::{self, Side};
use super::{CarState, OverlapState, PairKey, PairStateMachine, SpatialHash};

/// What a spotter would tell the driver of one car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotterCall {
    /// Nobody alongside
    Clear,
    /// Car on the left
    CarLeft,
    /// Car on the right
    CarRight,
    /// Cars on both sides
    ThreeWide,
    /// Overlapped, but lane offsets do not say which side
    Unknown,
}

/// Result of one processed tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Session time of the tick
    pub timestamp: TimestampMs,
    /// Events produced by this tick
    pub events: Vec<RaceEvent>,
    /// Valid cars in the live map
    pub cars_tracked: usize,
    /// Cars skipped this tick
    pub rejected: Vec<TelemetryError>,
    /// Unique pairs fed to the state machine by the neighbor scan
    pub pairs_evaluated: usize,
    /// A snapshot was stored this tick
    pub snapshot_captured: bool,
    /// The tick started a new session
    pub session_changed: bool,
}

struct TrioHit {
    key: [CarId; 3],
    left_to_right: [CarId; 3],
    lap_dist_pct: f64,
    confidence: f64,
}

/// Authoritative per-session world model
pub struct WorldModel {
    world: WorldConfig,
    overlap: OverlapConfig,
    capture_interval_ms: u64,

    session_id: Option<String>,
    track_length_meters: f64,
    cars: BTreeMap<CarId, CarState>,
    hash: SpatialHash,
    pairs: PairStateMachine,
    three_wide_reported: HashMap<[CarId; 3], TimestampMs>,

    snapshots: SnapshotBuffer,
    last_capture_ms: Option<TimestampMs>,
    pending_events: Vec<RaceEvent>,
}

impl WorldModel {
    /// Empty model for the given configuration
    pub fn new(config: &Config) -> Self {
        Self {
            world: config.world.clone(),
            overlap: config.overlap.clone(),
            capture_interval_ms: config.snapshots.capture_interval_ms,
            session_id: None,
            track_length_meters: config.world.default_track_length_meters,
            cars: BTreeMap::new(),
            hash: SpatialHash::new(config.world.bucket_size_meters, config.world.wrap_buckets),
            pairs: PairStateMachine::new(&config.overlap),
            three_wide_reported: HashMap::new(),
            snapshots: SnapshotBuffer::new(config.snapshots.max_snapshots),
            last_capture_ms: None,
            pending_events: Vec::new(),
        }
    }

    /// Process one full telemetry tick. Ticks must arrive in
    /// non-decreasing session time.
    pub fn process_telemetry(&mut self, telemetry: &TelemetrySnapshot) -> TickReport {
        let now = telemetry.session_time_ms;
        let mut report = TickReport {
            timestamp: now,
            ..Default::default()
        };

        report.session_changed = self.enter_session(&telemetry.session_id);
        self.pairs.begin_tick(now);
        self.update_track_length(telemetry.track_length_meters);

        self.replace_cars(telemetry, &mut report.rejected);
        report.cars_tracked = self.cars.len();

        let exclude_pit = self.world.exclude_pit_road;
        self.hash.rebuild(
            self.cars.values().filter(|c| !(exclude_pit && c.in_pit)),
            self.track_length_meters,
        );

        let seen = self.scan_pairs(now, &mut report.events);
        report.pairs_evaluated = seen.len();
        self.release_stale_pairs(&seen, now, &mut report.events);

        let cars = &self.cars;
        self.pairs
            .evict_absent(|id| cars.contains_key(&id), now, self.overlap.pair_retention_ms);

        self.detect_three_wide(now, &mut report.events);

        self.pending_events.extend(report.events.iter().cloned());
        report.snapshot_captured = self.maybe_capture(now);

        trace!(
            "Tick {}ms: {} cars, {} pairs, {} events",
            now,
            report.cars_tracked,
            report.pairs_evaluated,
            report.events.len()
        );
        report
    }

    /// Live state of one car, if it was valid in the latest tick
    pub fn car_state(&self, id: CarId) -> Option<&CarState> {
        self.cars.get(&id)
    }

    /// Live car map
    pub fn cars(&self) -> &BTreeMap<CarId, CarState> {
        &self.cars
    }

    /// See [`SnapshotBuffer::get`] for the matching rule
    pub fn snapshot(&self, timestamp: TimestampMs, tolerance_ms: u64) -> Option<&WorldSnapshot> {
        self.snapshots.get(timestamp, tolerance_ms)
    }

    /// Stored snapshots, oldest to newest
    pub fn recent_snapshots(&self) -> impl Iterator<Item = &WorldSnapshot> + '_ {
        self.snapshots.recent()
    }

    /// Snapshot history
    pub fn snapshots(&self) -> &SnapshotBuffer {
        &self.snapshots
    }

    /// Current state of a pair, `Disengaged` if never seen
    pub fn pair_state(&self, a: CarId, b: CarId) -> OverlapState {
        self.pairs.state(a, b)
    }

    /// Per-pair state machine
    pub fn pairs(&self) -> &PairStateMachine {
        &self.pairs
    }

    /// Session being tracked
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Track length in effect
    pub fn track_length_meters(&self) -> f64 {
        self.track_length_meters
    }

    /// Spotter call for one car from its currently engaged pairs.
    /// `None` if the car is not tracked.
    pub fn spotter_status(&self, id: CarId) -> Option<SpotterCall> {
        let me = self.cars.get(&id)?;

        let (mut left, mut right, mut unresolved) = (false, false, false);
        for partner in self.pairs.engaged_with(id) {
            let Some(other) = self.cars.get(&partner) else {
                continue;
            };
            match kinematics::relative_side(me, other) {
                Side::Left => left = true,
                Side::Right => right = true,
                Side::Unknown => unresolved = true,
            }
        }

        Some(match (left, right) {
            (true, true) => SpotterCall::ThreeWide,
            (true, false) => SpotterCall::CarLeft,
            (false, true) => SpotterCall::CarRight,
            (false, false) if unresolved => SpotterCall::Unknown,
            (false, false) => SpotterCall::Clear,
        })
    }

    fn enter_session(&mut self, session_id: &str) -> bool {
        if self.session_id.as_deref() == Some(session_id) {
            return false;
        }

        let changed = self.session_id.is_some();
        if changed {
            info!(
                "Session changed from {:?} to {}, resetting world model",
                self.session_id, session_id
            );
            self.reset();
        } else {
            info!("Tracking session {}", session_id);
        }
        self.session_id = Some(session_id.to_string());
        changed
    }

    fn reset(&mut self) {
        self.cars.clear();
        self.pairs.clear();
        self.three_wide_reported.clear();
        self.snapshots.clear();
        self.last_capture_ms = None;
        self.pending_events.clear();
        self.track_length_meters = self.world.default_track_length_meters;
    }

    /// Unknown, zero, or garbage lengths keep the last good value
    fn update_track_length(&mut self, reported: Option<f64>) {
        let Some(length) = reported.filter(|l| l.is_finite() && *l > 0.0) else {
            return;
        };
        if (length - self.track_length_meters).abs() > f64::EPSILON {
            debug!(
                "Track length {:.1}m -> {:.1}m",
                self.track_length_meters, length
            );
            self.track_length_meters = length;
        }
    }

    fn replace_cars(&mut self, telemetry: &TelemetrySnapshot, rejected: &mut Vec<TelemetryError>) {
        let mut cars = BTreeMap::new();

        for sample in &telemetry.cars {
            match CarState::from_telemetry(
                sample,
                self.track_length_meters,
                self.world.track_width_meters,
            ) {
                Ok(state) => {
                    if cars.insert(state.id, state).is_some() {
                        debug!("Duplicate sample for car {}, keeping the last", sample.car_id);
                    }
                }
                Err(err) => {
                    debug!("Skipping car this tick: {}", err);
                    rejected.push(err);
                }
            }
        }

        self.cars = cars;
    }

    /// Feed every unordered neighbor pair to the state machine exactly once
    fn scan_pairs(&mut self, now: TimestampMs, events: &mut Vec<RaceEvent>) -> HashSet<PairKey> {
        let mut seen = HashSet::new();
        let hashed: Vec<CarId> = self
            .cars
            .keys()
            .copied()
            .filter(|id| self.hash.bucket_of(*id).is_some())
            .collect();

        for id in hashed {
            for other in self.hash.candidates(id) {
                let key = PairKey::new(id, other);
                if !seen.insert(key) {
                    continue;
                }
                if let Some(event) = self.evaluate_pair(key, now) {
                    events.push(event);
                }
            }
        }

        seen
    }

    /// Engaged pairs that drifted out of neighbor range would otherwise
    /// never see a low score. Both cars must still be in the live map.
    fn release_stale_pairs(
        &mut self,
        seen: &HashSet<PairKey>,
        now: TimestampMs,
        events: &mut Vec<RaceEvent>,
    ) {
        let stale: Vec<PairKey> = self
            .pairs
            .engaged_pairs()
            .filter(|key| !seen.contains(key))
            .collect();

        for key in stale {
            let (Some(a), Some(b)) = (self.cars.get(&key.first()), self.cars.get(&key.second()))
            else {
                continue;
            };

            let both_hashed =
                self.hash.bucket_of(a.id).is_some() && self.hash.bucket_of(b.id).is_some();
            let score = if both_hashed {
                kinematics::pair_overlap(a, b, self.overlap.overlap_range_meters)
            } else {
                0.0
            };
            let side = kinematics::relative_side(a, b);

            if let Some(event) = self.transition(key, score, side, now) {
                events.push(event);
            }
        }
    }

    fn evaluate_pair(&mut self, key: PairKey, now: TimestampMs) -> Option<RaceEvent> {
        let a = self.cars.get(&key.first())?;
        let b = self.cars.get(&key.second())?;
        let score = kinematics::pair_overlap(a, b, self.overlap.overlap_range_meters);
        let side = kinematics::relative_side(a, b);
        self.transition(key, score, side, now)
    }

    fn transition(
        &mut self,
        key: PairKey,
        score: f64,
        side: Side,
        now: TimestampMs,
    ) -> Option<RaceEvent> {
        if !self.pairs.update(key.first(), key.second(), score, now) {
            return None;
        }
        Some(RaceEvent::OverlapStateChanged(OverlapStateChanged {
            car_a: key.first(),
            car_b: key.second(),
            state: self.pairs.state(key.first(), key.second()),
            side,
            overlap_score: score,
            timestamp: now,
        }))
    }

    /// Every mutually overlapping trio of neighbors, reported at most once
    /// per cooldown.
    fn detect_three_wide(&mut self, now: TimestampMs, events: &mut Vec<RaceEvent>) {
        let cooldown = self.overlap.three_wide_cooldown_ms;
        self.three_wide_reported
            .retain(|_, last| now.saturating_sub(*last) < cooldown);

        let hits = self.find_trios();
        for hit in hits {
            if self.three_wide_reported.contains_key(&hit.key) {
                continue;
            }
            self.three_wide_reported.insert(hit.key, now);

            info!(
                "Three wide at {:.4}: {} | {} | {} (confidence {:.2})",
                hit.lap_dist_pct,
                hit.left_to_right[0],
                hit.left_to_right[1],
                hit.left_to_right[2],
                hit.confidence
            );
            events.push(RaceEvent::ThreeWideDetected(ThreeWideDetected {
                cars: hit.left_to_right,
                lap_dist_pct: hit.lap_dist_pct,
                confidence: hit.confidence,
                timestamp: now,
            }));
        }
    }

    /// Trios are built from each car's wrapped neighbor candidates, so a
    /// trio straddling a bucket edge or start/finish is still found. Each
    /// trio is enumerated once, from its lowest car id.
    fn find_trios(&self) -> Vec<TrioHit> {
        let mut hits = Vec::new();

        for (&id, a) in &self.cars {
            let mut near: Vec<CarId> = self
                .hash
                .candidates(id)
                .into_iter()
                .filter(|other| *other > id)
                .collect();
            if near.len() < 2 {
                continue;
            }
            near.sort_unstable();

            for (i, second) in near.iter().enumerate() {
                for third in &near[i + 1..] {
                    let (Some(b), Some(c)) = (self.cars.get(second), self.cars.get(third)) else {
                        continue;
                    };
                    if let Some(hit) = self.score_trio(a, b, c) {
                        hits.push(hit);
                    }
                }
            }
        }

        hits
    }

    /// All three pairwise scores must exceed the three-wide threshold
    fn score_trio(&self, a: &CarState, b: &CarState, c: &CarState) -> Option<TrioHit> {
        let range = self.overlap.overlap_range_meters;
        let scores = [
            kinematics::pair_overlap(a, b, range),
            kinematics::pair_overlap(a, c, range),
            kinematics::pair_overlap(b, c, range),
        ];
        if !scores.iter().all(|&s| s > self.overlap.three_wide_threshold) {
            return None;
        }

        let mut ordered = [a, b, c];
        ordered.sort_by(|x, y| {
            x.lane_offset
                .total_cmp(&y.lane_offset)
                .then(x.id.cmp(&y.id))
        });

        let mut key = [a.id, b.id, c.id];
        key.sort_unstable();

        let positions = [a.lap_dist_pct, b.lap_dist_pct, c.lap_dist_pct];
        Some(TrioHit {
            key,
            left_to_right: ordered.map(|car| car.id),
            lap_dist_pct: kinematics::lap_centroid(&positions).unwrap_or(a.lap_dist_pct),
            confidence: scores.iter().sum::<f64>() / 3.0,
        })
    }

    /// Capture at most once per capture interval of session time
    fn maybe_capture(&mut self, now: TimestampMs) -> bool {
        let due = match self.last_capture_ms {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.capture_interval_ms,
        };
        if !due {
            return false;
        }

        let events = std::mem::take(&mut self.pending_events);
        let session_id = self.session_id.as_deref().unwrap_or_default();
        self.snapshots.capture(now, session_id, &self.cars, events);
        self.last_capture_ms = Some(now);
        true
    }
}
