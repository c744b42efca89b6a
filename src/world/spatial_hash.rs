// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! 1-D spatial hash over lap distance

use std::collections::{BTreeMap, HashMap};

use crate::telemetry::CarId;

use super::CarState;

/// Fixed-length track segments holding the cars currently inside them.
/// Rebuilt from scratch every tick.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    bucket_size_meters: f64,
    wrap: bool,
    bucket_count: usize,
    buckets: BTreeMap<usize, Vec<CarId>>,
    index: HashMap<CarId, usize>,
}

impl SpatialHash {
    /// Empty hash with fixed bucket size
    pub fn new(bucket_size_meters: f64, wrap: bool) -> Self {
        Self {
            bucket_size_meters,
            wrap,
            bucket_count: 1,
            buckets: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Number of buckets covering one lap
    pub fn bucket_count_for(track_length_meters: f64, bucket_size_meters: f64) -> usize {
        if track_length_meters <= 0.0 || bucket_size_meters <= 0.0 {
            return 1;
        }
        ((track_length_meters / bucket_size_meters).ceil() as usize).max(1)
    }

    /// `floor(lapDistPct * trackLength / bucketSize)`, clamped to the last bucket
    pub fn bucket_index(&self, lap_dist_pct: f64, track_length_meters: f64) -> usize {
        let raw = (lap_dist_pct * track_length_meters / self.bucket_size_meters).floor();
        if raw.is_finite() && raw > 0.0 {
            (raw as usize).min(self.bucket_count - 1)
        } else {
            0
        }
    }

    /// Replace the contents with `cars`
    pub fn rebuild<'a, I>(&mut self, cars: I, track_length_meters: f64)
    where
        I: IntoIterator<Item = &'a CarState>,
    {
        self.buckets.clear();
        self.index.clear();
        self.bucket_count = Self::bucket_count_for(track_length_meters, self.bucket_size_meters);

        for car in cars {
            let bucket = self.bucket_index(car.lap_dist_pct, track_length_meters);
            self.buckets.entry(bucket).or_default().push(car.id);
            self.index.insert(car.id, bucket);
        }

        for ids in self.buckets.values_mut() {
            ids.sort_unstable();
        }
    }

    /// Bucket holding `id`, if hashed
    pub fn bucket_of(&self, id: CarId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// `{b-1, b, b+1}`, wrapped across start/finish when enabled
    pub fn neighbor_buckets(&self, bucket: usize) -> Vec<usize> {
        let n = self.bucket_count;
        let mut out = Vec::with_capacity(3);

        if bucket > 0 {
            out.push(bucket - 1);
        } else if self.wrap && n > 1 {
            out.push(n - 1);
        }
        out.push(bucket);
        if bucket + 1 < n {
            out.push(bucket + 1);
        } else if self.wrap && n > 1 {
            out.push(0);
        }

        out.sort_unstable();
        out.dedup();
        out
    }

    /// Every other car in the neighbor buckets of `id`
    pub fn candidates(&self, id: CarId) -> Vec<CarId> {
        let Some(bucket) = self.bucket_of(id) else {
            return Vec::new();
        };
        self.neighbor_buckets(bucket)
            .into_iter()
            .filter_map(|b| self.buckets.get(&b))
            .flatten()
            .copied()
            .filter(|&other| other != id)
            .collect()
    }

    /// Buckets in the current lap
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Number of hashed cars
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no car is hashed
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cars(positions: &[(u32, f64)]) -> Vec<CarState> {
        positions
            .iter()
            .map(|&(id, pct)| CarState::for_test(id, pct, 0.0, 4000.0))
            .collect()
    }

    #[test]
    fn test_bucket_assignment() {
        let mut hash = SpatialHash::new(500.0, true);
        let field = cars(&[(1, 0.0), (2, 0.124), (3, 0.125), (4, 0.9999)]);
        hash.rebuild(&field, 4000.0);

        assert_eq!(hash.bucket_count(), 8);
        assert_eq!(hash.bucket_of(CarId(1)), Some(0));
        assert_eq!(hash.bucket_of(CarId(2)), Some(0));
        assert_eq!(hash.bucket_of(CarId(3)), Some(1));
        assert_eq!(hash.bucket_of(CarId(4)), Some(7));
        assert_eq!(hash.len(), 4);
    }

    #[test]
    fn test_neighbors_wrap_at_start_finish() {
        let mut hash = SpatialHash::new(500.0, true);
        hash.rebuild(&cars(&[(1, 0.5)]), 4000.0);

        assert_eq!(hash.neighbor_buckets(0), vec![0, 1, 7]);
        assert_eq!(hash.neighbor_buckets(7), vec![0, 6, 7]);
        assert_eq!(hash.neighbor_buckets(3), vec![2, 3, 4]);
    }

    #[test]
    fn test_neighbors_without_wrap() {
        let mut hash = SpatialHash::new(500.0, false);
        hash.rebuild(&cars(&[(1, 0.5)]), 4000.0);

        assert_eq!(hash.neighbor_buckets(0), vec![0, 1]);
        assert_eq!(hash.neighbor_buckets(7), vec![6, 7]);
    }

    #[test]
    fn test_short_track_deduplicates_buckets() {
        let mut hash = SpatialHash::new(500.0, true);
        hash.rebuild(&cars(&[(1, 0.1), (2, 0.9)]), 800.0);

        assert_eq!(hash.bucket_count(), 2);
        assert_eq!(hash.neighbor_buckets(0), vec![0, 1]);
        assert_eq!(hash.candidates(CarId(1)), vec![CarId(2)]);
    }

    #[test]
    fn test_candidates_across_line() {
        let mut hash = SpatialHash::new(500.0, true);
        let field = cars(&[(1, 0.999), (2, 0.001), (3, 0.5)]);
        hash.rebuild(&field, 4000.0);

        assert_eq!(hash.candidates(CarId(1)), vec![CarId(2)]);
        assert_eq!(hash.candidates(CarId(2)), vec![CarId(1)]);
        assert!(hash.candidates(CarId(3)).is_empty());
        assert!(hash.candidates(CarId(42)).is_empty());
    }
}
