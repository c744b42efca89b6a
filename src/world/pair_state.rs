// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Debounced engaged/disengaged tracking per car pair
//!
//! Raw overlap scores jitter from tick to tick. Each pair keeps a discrete
//! state that only flips when the score crosses the entry threshold on the
//! way up or the lower exit threshold on the way down, optionally held for a
//! minimum dwell time before the flip is confirmed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::OverlapConfig;
use crate::telemetry::{CarId, TimestampMs};

/// Order-independent pair key; the lower id is always first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey(CarId, CarId);

impl PairKey {
    /// Canonical key for two cars
    pub fn new(a: CarId, b: CarId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Lower id
    pub fn first(&self) -> CarId {
        self.0
    }

    /// Higher id
    pub fn second(&self) -> CarId {
        self.1
    }

    /// Whether `id` is a member
    pub fn contains(&self, id: CarId) -> bool {
        self.0 == id || self.1 == id
    }

    /// The other member of the pair, if `id` is a member
    pub fn partner(&self, id: CarId) -> Option<CarId> {
        if self.0 == id {
            Some(self.1)
        } else if self.1 == id {
            Some(self.0)
        } else {
            None
        }
    }
}

/// Stable discrete state of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapState {
    /// Not alongside
    #[default]
    Disengaged,
    /// Alongside
    Engaged,
}

impl OverlapState {
    fn flipped(self) -> Self {
        match self {
            Self::Disengaged => Self::Engaged,
            Self::Engaged => Self::Disengaged,
        }
    }
}

/// Per-pair record, created on first observation
#[derive(Debug, Clone, PartialEq)]
pub struct PairOverlapState {
    /// Current discrete state
    pub state: OverlapState,
    /// When the state last flipped
    pub last_transition_ms: Option<TimestampMs>,
    /// Most recent overlap score
    pub last_score: f64,
    /// When the pair was last scored
    pub last_observed_ms: TimestampMs,
    /// When the score first crossed toward the opposite state
    pending_since: Option<TimestampMs>,
}

impl PairOverlapState {
    fn new(now: TimestampMs) -> Self {
        Self {
            state: OverlapState::Disengaged,
            last_transition_ms: None,
            last_score: 0.0,
            last_observed_ms: now,
            pending_since: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    entry: f64,
    exit: f64,
    min_dwell_ms: u64,
}

/// Hysteresis state machine over all observed pairs
#[derive(Debug, Clone)]
pub struct PairStateMachine {
    thresholds: Thresholds,
    pairs: HashMap<PairKey, PairOverlapState>,
    current_tick_ms: Option<TimestampMs>,
    previous_tick_ms: Option<TimestampMs>,
}

impl PairStateMachine {
    /// Empty machine using the configured thresholds
    pub fn new(config: &OverlapConfig) -> Self {
        Self {
            thresholds: Thresholds {
                entry: config.entry_threshold,
                exit: config.exit_threshold,
                min_dwell_ms: config.min_dwell_ms,
            },
            pairs: HashMap::new(),
            current_tick_ms: None,
            previous_tick_ms: None,
        }
    }

    /// Mark the start of a tick. A pair not observed on the previous tick
    /// loses any pending transition and must serve the dwell again.
    pub fn begin_tick(&mut self, now: TimestampMs) {
        if self.current_tick_ms != Some(now) {
            self.previous_tick_ms = self.current_tick_ms.replace(now);
        }
    }

    /// Feed one observation. Returns `true` only on the tick a transition
    /// is confirmed.
    pub fn update(&mut self, a: CarId, b: CarId, overlap_score: f64, now: TimestampMs) -> bool {
        let key = PairKey::new(a, b);
        let thresholds = self.thresholds;
        let previous_tick = self.previous_tick_ms;
        let pair = self
            .pairs
            .entry(key)
            .or_insert_with(|| PairOverlapState::new(now));

        if previous_tick.is_some_and(|prev| pair.last_observed_ms < prev) {
            pair.pending_since = None;
        }
        pair.last_score = overlap_score;
        pair.last_observed_ms = now;

        let crossing = match pair.state {
            OverlapState::Disengaged => overlap_score > thresholds.entry,
            OverlapState::Engaged => overlap_score < thresholds.exit,
        };
        if !crossing {
            pair.pending_since = None;
            return false;
        }

        let since = *pair.pending_since.get_or_insert(now);
        if now.saturating_sub(since) < thresholds.min_dwell_ms {
            trace!(
                "{} / {}: pending {:?} for {}ms",
                key.0,
                key.1,
                pair.state.flipped(),
                now.saturating_sub(since)
            );
            return false;
        }

        pair.state = pair.state.flipped();
        pair.pending_since = None;
        pair.last_transition_ms = Some(now);
        debug!(
            "{} / {} -> {:?} (score {:.3})",
            key.0, key.1, pair.state, overlap_score
        );
        true
    }

    /// Record for a pair, if observed
    pub fn get(&self, a: CarId, b: CarId) -> Option<&PairOverlapState> {
        self.pairs.get(&PairKey::new(a, b))
    }

    /// Current state of a pair, `Disengaged` if never seen
    pub fn state(&self, a: CarId, b: CarId) -> OverlapState {
        self.get(a, b).map(|p| p.state).unwrap_or_default()
    }

    /// Keys of every pair currently engaged
    pub fn engaged_pairs(&self) -> impl Iterator<Item = PairKey> + '_ {
        self.pairs
            .iter()
            .filter(|(_, p)| p.state == OverlapState::Engaged)
            .map(|(k, _)| *k)
    }

    /// Cars currently engaged with `id`
    pub fn engaged_with(&self, id: CarId) -> impl Iterator<Item = CarId> + '_ {
        self.engaged_pairs().filter_map(move |k| k.partner(id))
    }

    /// Drop pairs with a missing member once they have gone unobserved for
    /// longer than `retention_ms`. No transitions are reported for them.
    pub fn evict_absent<F>(&mut self, is_present: F, now: TimestampMs, retention_ms: u64) -> usize
    where
        F: Fn(CarId) -> bool,
    {
        let before = self.pairs.len();
        self.pairs.retain(|key, pair| {
            let both_present = is_present(key.0) && is_present(key.1);
            both_present || now.saturating_sub(pair.last_observed_ms) <= retention_ms
        });
        let evicted = before - self.pairs.len();
        if evicted > 0 {
            debug!("Evicted {} stale pair(s)", evicted);
        }
        evicted
    }

    /// Number of tracked pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pair is tracked
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Forget every pair
    pub fn clear(&mut self) {
        self.pairs.clear();
        self.current_tick_ms = None;
        self.previous_tick_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(min_dwell_ms: u64) -> PairStateMachine {
        PairStateMachine::new(&OverlapConfig {
            min_dwell_ms,
            ..OverlapConfig::default()
        })
    }

    const A: CarId = CarId(1);
    const B: CarId = CarId(2);

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(PairKey::new(A, B), PairKey::new(B, A));
        assert_eq!(PairKey::new(B, A).first(), A);
        assert_eq!(PairKey::new(A, B).partner(B), Some(A));
        assert_eq!(PairKey::new(A, B).partner(CarId(9)), None);
    }

    #[test]
    fn test_engage_then_disengage() {
        let mut sm = machine(0);

        assert!(!sm.update(A, B, 0.2, 0));
        assert_eq!(sm.state(A, B), OverlapState::Disengaged);

        assert!(sm.update(A, B, 0.833, 16));
        assert_eq!(sm.state(B, A), OverlapState::Engaged);
        assert_eq!(sm.get(A, B).unwrap().last_transition_ms, Some(16));

        // Sustained overlap produces no further notifications
        assert!(!sm.update(B, A, 0.9, 32));
        assert!(!sm.update(A, B, 0.8, 48));

        assert!(sm.update(A, B, 0.1, 64));
        assert_eq!(sm.state(A, B), OverlapState::Disengaged);
    }

    #[test]
    fn test_hysteresis_prevents_flapping() {
        let mut sm = machine(0);
        assert!(sm.update(A, B, 0.5, 0));

        // Oscillate around the entry threshold, never below exit
        let mut transitions = 0;
        for (i, score) in [0.39, 0.41, 0.3, 0.45, 0.26, 0.4, 0.35].iter().enumerate() {
            if sm.update(A, B, *score, (i as u64 + 1) * 16) {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 0);
        assert_eq!(sm.state(A, B), OverlapState::Engaged);
    }

    #[test]
    fn test_exact_threshold_does_not_engage() {
        let mut sm = machine(0);
        assert!(!sm.update(A, B, 0.4, 0));
        assert!(!sm.update(A, B, f64::NAN, 16));
        assert_eq!(sm.state(A, B), OverlapState::Disengaged);
    }

    #[test]
    fn test_min_dwell_debounce() {
        let mut sm = machine(100);

        assert!(!sm.update(A, B, 0.8, 0));
        assert!(!sm.update(A, B, 0.8, 50));
        // Dip resets the pending transition
        assert!(!sm.update(A, B, 0.1, 60));
        assert!(!sm.update(A, B, 0.8, 70));
        assert!(!sm.update(A, B, 0.8, 160));
        assert!(sm.update(A, B, 0.8, 170));
        assert_eq!(sm.state(A, B), OverlapState::Engaged);
    }

    #[test]
    fn test_missed_tick_restarts_dwell() {
        let mut sm = machine(100);

        sm.begin_tick(0);
        assert!(!sm.update(A, B, 0.8, 0));
        // One car drops out: the pair is not observed this tick
        sm.begin_tick(50);
        sm.begin_tick(100);
        assert!(!sm.update(A, B, 0.8, 100));
        sm.begin_tick(150);
        assert!(!sm.update(A, B, 0.8, 150));
        sm.begin_tick(200);
        assert!(sm.update(A, B, 0.8, 200));
    }

    #[test]
    fn test_consecutive_ticks_keep_dwell() {
        let mut sm = machine(100);

        for t in [0, 50] {
            sm.begin_tick(t);
            assert!(!sm.update(A, B, 0.8, t));
        }
        sm.begin_tick(100);
        assert!(sm.update(A, B, 0.8, 100));
    }

    #[test]
    fn test_engaged_with() {
        let mut sm = machine(0);
        sm.update(A, B, 0.9, 0);
        sm.update(A, CarId(3), 0.9, 0);
        sm.update(B, CarId(3), 0.1, 0);

        let mut partners: Vec<_> = sm.engaged_with(A).collect();
        partners.sort();
        assert_eq!(partners, vec![B, CarId(3)]);
        assert_eq!(sm.engaged_with(B).collect::<Vec<_>>(), vec![A]);
    }

    #[test]
    fn test_evict_absent_respects_retention() {
        let mut sm = machine(0);
        sm.update(A, B, 0.9, 0);
        sm.update(A, CarId(3), 0.9, 0);

        // Car 3 vanished but is still inside the retention window
        let present = |id: CarId| id != CarId(3);
        assert_eq!(sm.evict_absent(present, 1000, 5000), 0);
        assert_eq!(sm.state(A, CarId(3)), OverlapState::Engaged);

        assert_eq!(sm.evict_absent(present, 6000, 5000), 1);
        assert!(sm.get(A, CarId(3)).is_none());
        assert!(sm.get(A, B).is_some());
    }
}
