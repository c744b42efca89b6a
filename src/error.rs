// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Error types

use thiserror::Error;

use crate::telemetry::CarId;

/// Reasons a single car is dropped from a telemetry tick.
///
/// These never abort a tick; the car is skipped and tracked again on the
/// next valid sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    /// No lap position in the sample
    #[error("car {0}: missing track position")]
    MissingPosition(CarId),

    /// Lap position is NaN or infinite
    #[error("car {car}: track position {value} is not finite")]
    NonFinitePosition {
        /// Offending car
        car: CarId,
        /// Reported position
        value: f64,
    },

    /// Lap position outside `[0, 1]`, including the `-1` not-in-world marker
    #[error("car {car}: track position {value} outside [0, 1]")]
    PositionOutOfRange {
        /// Offending car
        car: CarId,
        /// Reported position
        value: f64,
    },

    /// No velocity in the sample
    #[error("car {0}: missing velocity")]
    MissingVelocity(CarId),

    /// A velocity component is NaN or infinite
    #[error("car {car}: velocity ({x}, {y}) is not finite")]
    NonFiniteVelocity {
        /// Offending car
        car: CarId,
        /// Reported longitudinal component
        x: f64,
        /// Reported lateral component
        y: f64,
    },

    /// Lane offset is NaN or infinite
    #[error("car {car}: lane offset {value} is not finite")]
    NonFiniteLaneOffset {
        /// Offending car
        car: CarId,
        /// Reported offset
        value: f64,
    },
}

impl TelemetryError {
    /// The car the error refers to
    pub fn car(&self) -> CarId {
        match self {
            Self::MissingPosition(car) | Self::MissingVelocity(car) => *car,
            Self::NonFinitePosition { car, .. }
            | Self::PositionOutOfRange { car, .. }
            | Self::NonFiniteVelocity { car, .. }
            | Self::NonFiniteLaneOffset { car, .. } => *car,
        }
    }
}

/// Configuration validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `world.bucket_size_meters` is not positive
    #[error("bucket size must be positive, got {0}")]
    InvalidBucketSize(f64),

    /// `world.default_track_length_meters` is not positive
    #[error("default track length must be positive, got {0}")]
    InvalidTrackLength(f64),

    /// `overlap.overlap_range_meters` is not positive
    #[error("overlap range must be positive, got {0}")]
    InvalidOverlapRange(f64),

    /// Overlapping cars could sit more than one bucket apart
    #[error("bucket size {bucket}m is smaller than overlap range {range}m")]
    BucketSmallerThanOverlapRange {
        /// Configured bucket size
        bucket: f64,
        /// Configured overlap range
        range: f64,
    },

    /// A score threshold outside `[0, 1]`
    #[error("{name} threshold must be within [0, 1], got {value}")]
    ThresholdOutOfRange {
        /// Which threshold
        name: &'static str,
        /// Configured value
        value: f64,
    },

    /// Exit threshold not below entry threshold
    #[error("exit threshold {exit} must be below entry threshold {entry}")]
    HysteresisInverted {
        /// Configured entry threshold
        entry: f64,
        /// Configured exit threshold
        exit: f64,
    },

    /// `snapshots.max_snapshots` is zero
    #[error("snapshot capacity must be non-zero")]
    ZeroSnapshotCapacity,

    /// `event_bus_capacity` is zero
    #[error("event bus capacity must be non-zero")]
    ZeroBusCapacity,
}
